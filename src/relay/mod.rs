//! The caller-facing side of the relay.
//!
//! Business code holds an `Arc<dyn QueryErp>` and never learns whether rows came over HTTP
//! from the bridge agent or through an OPENQUERY gateway. Every failure reaches it as one
//! `ErpCommunicationError`.

mod direct;
mod http;
mod options;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{DirectConfig, GatewayConfig, RelayClientConfig, RelayStrategy};
use crate::error::{ErpCommunicationError, RelayError};
use crate::results::ErpRow;
use crate::types::ScalarValue;

pub use direct::DirectRelay;
pub use http::HttpRelay;
pub use options::QueryOptions;

/// Run a parameterized read-only query against the ERP.
#[async_trait]
pub trait QueryErp: Send + Sync {
    /// Run `sql` with positional `params` and the given per-call options.
    ///
    /// # Errors
    /// Returns `ErpCommunicationError` for any failure, whatever its cause.
    async fn query_erp_with(
        &self,
        sql: &str,
        params: &[ScalarValue],
        options: QueryOptions,
    ) -> Result<Vec<ErpRow>, ErpCommunicationError>;

    /// Run `sql` with positional `params` using the relay's defaults.
    ///
    /// # Errors
    /// Returns `ErpCommunicationError` for any failure, whatever its cause.
    async fn query_erp(
        &self,
        sql: &str,
        params: &[ScalarValue],
    ) -> Result<Vec<ErpRow>, ErpCommunicationError> {
        self.query_erp_with(sql, params, QueryOptions::default())
            .await
    }

    fn strategy(&self) -> RelayStrategy;
}

/// Settings for whichever strategy the deployment selects.
#[derive(Debug, Clone)]
pub enum RelaySettings {
    Http(RelayClientConfig),
    Gateway(GatewayConfig),
    Direct(DirectConfig),
}

impl RelaySettings {
    #[must_use]
    pub fn strategy(&self) -> RelayStrategy {
        match self {
            RelaySettings::Http(_) => RelayStrategy::Http,
            RelaySettings::Gateway(_) => RelayStrategy::Gateway,
            RelaySettings::Direct(_) => RelayStrategy::Direct,
        }
    }
}

/// Build the configured relay.
///
/// # Errors
/// Returns `RelayError::Config` for invalid settings, or `RelayError::Unimplemented` when
/// the gateway or direct strategy is selected in a build without the `mssql` or `odbc`
/// feature respectively.
pub fn build_relay(settings: RelaySettings) -> Result<Arc<dyn QueryErp>, RelayError> {
    match settings {
        RelaySettings::Http(config) => Ok(Arc::new(HttpRelay::new(config)?)),
        #[cfg(feature = "mssql")]
        RelaySettings::Gateway(config) => Ok(Arc::new(crate::mssql::GatewayRelay::new(config)?)),
        #[cfg(not(feature = "mssql"))]
        RelaySettings::Gateway(_) => Err(RelayError::Unimplemented(
            "the OPENQUERY gateway needs the `mssql` feature".to_string(),
        )),
        #[cfg(feature = "odbc")]
        RelaySettings::Direct(config) => {
            config.validate()?;
            let connector = crate::odbc::OdbcConnector::new(config.connection_string, config.timeout);
            Ok(Arc::new(DirectRelay::new(Arc::new(connector), config.timeout)))
        }
        #[cfg(not(feature = "odbc"))]
        RelaySettings::Direct(_) => Err(RelayError::Unimplemented(
            "the direct strategy needs the `odbc` feature".to_string(),
        )),
    }
}
