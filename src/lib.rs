//! Authenticated relay for read-only SQL against an on-premises ERP.
//!
//! Two halves share this crate:
//!
//! - the **bridge agent** ([`bridge`]) runs next to the ERP, accepts `POST /query-erp`
//!   envelopes guarded by a pre-shared secret, and runs each query on a fresh ODBC
//!   connection;
//! - the **relay client** ([`relay`]) is what the public service calls. It either forwards
//!   envelopes to the bridge over HTTP(S) or, with the `mssql` feature, inlines the
//!   parameters and runs the query through an `OPENQUERY` wrapper on a SQL Server gateway.
//!
//! ```rust,no_run
//! use erp_relay::prelude::*;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let relay = build_relay(RelaySettings::Http(RelayClientConfig::new(
//!     "https://bridge.internal:4000",
//!     Secret::new("abc123"),
//! )))?;
//! let rows = relay
//!     .query_erp(
//!         "SELECT DISTINCT EMAIL FROM CLIENTES_EMAIL WHERE CLI_CODIGO = ?",
//!         &[ScalarValue::Int(42)],
//!     )
//!     .await?;
//! for row in &rows {
//!     println!("{:?}", row.get("EMAIL"));
//! }
//! # Ok(()) }
//! ```

pub mod bridge;
pub mod config;
pub mod connector;
pub mod error;
#[cfg(feature = "mssql")]
pub mod mssql;
#[cfg(feature = "odbc")]
pub mod odbc;
pub mod prelude;
pub mod relay;
pub mod results;
pub mod substitution;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;

pub use error::{ErpCommunicationError, RelayError};
pub use relay::{QueryErp, QueryOptions, RelaySettings, build_relay};
pub use results::{ErpRow, RowSet};
pub use types::{QueryEnvelope, ScalarValue};
