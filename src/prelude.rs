//! Convenient imports for common functionality.
//!
//! This module re-exports the types a relay caller or a bridge host needs day to day.

pub use crate::bridge::{BridgeServer, BridgeState, ErrorBody, create_router};
pub use crate::config::{
    BridgeConfig, DirectConfig, GatewayConfig, RelayClientConfig, RelayStrategy, Secret,
    DEFAULT_QUERY_TIMEOUT,
};
pub use crate::connector::{ErpConnection, ErpConnector, run_on_fresh_connection};
pub use crate::error::{ErpCommunicationError, RelayError};
pub use crate::relay::{DirectRelay, HttpRelay, QueryErp, QueryOptions, RelaySettings, build_relay};
pub use crate::results::{ErpRow, RowSet};
pub use crate::substitution::{substitute_params, wrap_openquery};
pub use crate::types::{QueryEnvelope, ScalarValue};

#[cfg(feature = "mssql")]
pub use crate::mssql::GatewayRelay;

#[cfg(feature = "odbc")]
pub use crate::odbc::OdbcConnector;
