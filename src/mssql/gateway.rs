use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::client::create_mssql_client;
use super::query::build_rows;
use crate::config::{GatewayConfig, RelayStrategy};
use crate::error::{ErpCommunicationError, RelayError};
use crate::relay::{QueryErp, QueryOptions};
use crate::results::ErpRow;
use crate::substitution::{substitute_params, wrap_openquery};
use crate::types::ScalarValue;

/// `QueryErp` over a SQL Server that has the ERP registered as a linked server.
///
/// OPENQUERY cannot carry bound parameters across the link, so values are inlined with the
/// escaping formatter and the whole statement is quoted a second time into the wrapper.
#[derive(Debug, Clone)]
pub struct GatewayRelay {
    config: GatewayConfig,
}

impl GatewayRelay {
    /// # Errors
    /// Returns `RelayError::Config` for a missing host or an unusable linked server name.
    pub fn new(config: GatewayConfig) -> Result<Self, RelayError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The exact T-SQL sent to the gateway for this template and parameters.
    ///
    /// # Errors
    /// Returns `RelayError::Validation` for a blank query or when placeholders outnumber
    /// parameters.
    pub fn build_statement(&self, sql: &str, params: &[ScalarValue]) -> Result<String, RelayError> {
        if sql.trim().is_empty() {
            return Err(RelayError::Validation("sqlQuery is required.".to_string()));
        }
        let inlined = substitute_params(sql, params)?;
        Ok(wrap_openquery(&self.config.linked_server, &inlined.sql))
    }

    async fn execute(&self, statement: &str, timeout: Duration) -> Result<Vec<ErpRow>, RelayError> {
        let work = async {
            let mut client = create_mssql_client(&self.config).await?;
            let outcome = build_rows(&mut client, statement).await;
            if let Err(err) = client.close().await {
                warn!(error = %err, "gateway connection reported an error while closing");
            }
            outcome
        };

        // dropping `work` on timeout drops the client and its socket
        tokio::time::timeout(timeout, work)
            .await
            .map_err(|_| RelayError::Timeout(timeout))?
    }
}

#[async_trait]
impl QueryErp for GatewayRelay {
    async fn query_erp_with(
        &self,
        sql: &str,
        params: &[ScalarValue],
        options: QueryOptions,
    ) -> Result<Vec<ErpRow>, ErpCommunicationError> {
        let timeout = options.resolve_timeout(self.config.timeout);
        let outcome = match self.build_statement(sql, params) {
            Ok(statement) => {
                info!(sql = %sql, params = ?params, "running ERP query through OPENQUERY gateway");
                debug!(statement = %statement, "gateway statement");
                self.execute(&statement, timeout).await
            }
            Err(err) => Err(err),
        };

        match outcome {
            Ok(rows) => {
                info!(rows = rows.len(), "gateway query returned");
                Ok(rows)
            }
            Err(cause) => {
                warn!(
                    linked_server = %self.config.linked_server,
                    error = %cause,
                    "OPENQUERY gateway call failed"
                );
                Err(ErpCommunicationError::new(cause))
            }
        }
    }

    fn strategy(&self) -> RelayStrategy {
        RelayStrategy::Gateway
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Secret;

    fn relay() -> GatewayRelay {
        GatewayRelay::new(GatewayConfig::new(
            "sql01".into(),
            "ponte".into(),
            "relay".into(),
            Secret::new("pw"),
        ))
        .unwrap()
    }

    #[test]
    fn builds_full_wrapper() {
        let statement = relay()
            .build_statement(
                "SELECT DISTINCT EMAIL FROM CLIENTES_EMAIL WHERE CLI_CODIGO = ?;",
                &[ScalarValue::Int(42)],
            )
            .unwrap();
        assert_eq!(
            statement,
            "SELECT * FROM OPENQUERY(CONSULTA, 'SELECT DISTINCT EMAIL FROM CLIENTES_EMAIL WHERE CLI_CODIGO = 42')"
        );
    }

    #[test]
    fn text_params_are_quoted_twice() {
        let statement = relay()
            .build_statement("SELECT * FROM T WHERE NOME = ?", &["O'Brien".into()])
            .unwrap();
        assert_eq!(
            statement,
            "SELECT * FROM OPENQUERY(CONSULTA, 'SELECT * FROM T WHERE NOME = ''O''''Brien''')"
        );
    }

    #[test]
    fn missing_params_fail_before_connecting() {
        let err = relay()
            .build_statement("WHERE NFS = ? AND EMPRESA = ?", &[ScalarValue::Int(1)])
            .unwrap_err();
        assert!(matches!(err, RelayError::Validation(_)));
    }

    #[test]
    fn blank_query_is_rejected() {
        assert!(relay().build_statement("  ", &[]).is_err());
    }

    #[tokio::test]
    async fn unreachable_gateway_is_a_communication_failure() {
        let config = GatewayConfig::new(
            "127.0.0.1".into(),
            "ponte".into(),
            "relay".into(),
            Secret::new("pw"),
        )
        // port 9 (discard) is closed on test hosts
        .with_port(Some(9))
        .with_timeout(Duration::from_secs(5));
        let relay = GatewayRelay::new(config).unwrap();
        let err = relay.query_erp("SELECT 1 FROM RDB$DATABASE", &[]).await.unwrap_err();
        assert!(matches!(
            err.cause(),
            RelayError::Driver(_) | RelayError::Timeout(_)
        ));
    }
}
