//! Per-query ERP connection lifecycle.
//!
//! ERP access never pools: every query opens its own connection through an [`ErpConnector`]
//! and [`run_on_fresh_connection`] closes it again on every exit path. Implementations must
//! also release the underlying handle when dropped, which covers panics and cancelled
//! futures.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::RelayError;
use crate::results::ErpRow;
use crate::types::ScalarValue;

/// Opens ERP connections.
#[async_trait]
pub trait ErpConnector: Send + Sync {
    /// Open a new connection. Never hands out a shared or reused handle.
    ///
    /// # Errors
    /// Returns `RelayError::Driver` if the ERP cannot be reached.
    async fn connect(&self) -> Result<Box<dyn ErpConnection>, RelayError>;

    /// Short backend name used in logs.
    fn backend(&self) -> &'static str;
}

/// A single open ERP connection.
#[async_trait]
pub trait ErpConnection: Send {
    /// Execute `sql` with `params` bound positionally and collect the full result set.
    ///
    /// # Errors
    /// Returns `RelayError::Driver` if the ERP rejects or fails the query.
    async fn query(&mut self, sql: &str, params: &[ScalarValue])
    -> Result<Vec<ErpRow>, RelayError>;

    /// Release the connection.
    ///
    /// # Errors
    /// Returns `RelayError::Driver` if the driver reports a failure while disconnecting; the
    /// handle is released regardless.
    async fn close(self: Box<Self>) -> Result<(), RelayError>;
}

/// Open a connection, run one query, and close the connection whatever the outcome.
///
/// A failure while closing is logged and never masks the query result.
///
/// # Errors
/// Returns the connect or query error.
pub async fn run_on_fresh_connection(
    connector: &dyn ErpConnector,
    sql: &str,
    params: &[ScalarValue],
) -> Result<Vec<ErpRow>, RelayError> {
    let mut conn = connector.connect().await?;
    debug!(backend = connector.backend(), "ERP connection opened");

    let outcome = conn.query(sql, params).await;

    match conn.close().await {
        Ok(()) => debug!(backend = connector.backend(), "ERP connection closed"),
        Err(err) => warn!(
            backend = connector.backend(),
            error = %err,
            "ERP connection reported an error while closing"
        ),
    }

    outcome
}
