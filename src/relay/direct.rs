use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{QueryErp, QueryOptions};
use crate::config::RelayStrategy;
use crate::connector::{ErpConnector, run_on_fresh_connection};
use crate::error::{ErpCommunicationError, RelayError};
use crate::results::ErpRow;
use crate::substitution::check_param_count;
use crate::types::ScalarValue;

/// `QueryErp` that talks to the ERP from the calling process, one fresh connection per
/// query.
///
/// The parameter count is checked before connecting, and connect plus query share one
/// timeout. Any connector works; the `odbc` feature supplies the real one.
pub struct DirectRelay {
    connector: Arc<dyn ErpConnector>,
    timeout: Duration,
}

impl DirectRelay {
    #[must_use]
    pub fn new(connector: Arc<dyn ErpConnector>, timeout: Duration) -> Self {
        Self { connector, timeout }
    }

    async fn run(
        &self,
        sql: &str,
        params: &[ScalarValue],
        timeout: Duration,
    ) -> Result<Vec<ErpRow>, RelayError> {
        if sql.trim().is_empty() {
            return Err(RelayError::Validation("sqlQuery is required.".to_string()));
        }
        check_param_count(sql, params.len())?;

        info!(sql = %sql, params = ?params, backend = self.connector.backend(), "running ERP query in process");
        let rows = tokio::time::timeout(
            timeout,
            run_on_fresh_connection(self.connector.as_ref(), sql, params),
        )
        .await
        .unwrap_or_else(|_| Err(RelayError::Timeout(timeout)))?;

        info!(rows = rows.len(), "ERP query returned");
        debug!(rows = %serde_json::to_string(&rows).unwrap_or_default(), "ERP query result");
        Ok(rows)
    }
}

#[async_trait]
impl QueryErp for DirectRelay {
    async fn query_erp_with(
        &self,
        sql: &str,
        params: &[ScalarValue],
        options: QueryOptions,
    ) -> Result<Vec<ErpRow>, ErpCommunicationError> {
        let timeout = options.resolve_timeout(self.timeout);
        self.run(sql, params, timeout).await.map_err(|cause| {
            warn!(backend = self.connector.backend(), error = %cause, "direct ERP query failed");
            ErpCommunicationError::new(cause)
        })
    }

    fn strategy(&self) -> RelayStrategy {
        RelayStrategy::Direct
    }
}
