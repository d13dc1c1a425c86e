// MSSQL module - the OPENQUERY gateway variant of the relay
//
// - client: dedicated per-query SQL Server connections
// - query: result extraction from tiberius row streams
// - gateway: statement construction and the `QueryErp` implementation

pub mod client;
pub mod gateway;
pub mod query;

pub use client::{MssqlClient, create_mssql_client};
pub use gateway::GatewayRelay;
pub use query::build_rows;
