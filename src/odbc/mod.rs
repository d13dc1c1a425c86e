// ODBC module - the bridge agent's ERP backend
//
// - connector: process-wide environment and per-query connections
// - params: binding of envelope scalars as ODBC input parameters
// - query: statement execution and text-buffer row extraction

pub mod connector;
pub mod params;
pub mod query;

pub use connector::{OdbcConnection, OdbcConnector};
