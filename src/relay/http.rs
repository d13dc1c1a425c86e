use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use tracing::{debug, warn};

use super::{QueryErp, QueryOptions};
use crate::bridge::ErrorBody;
use crate::config::{RelayClientConfig, RelayStrategy, SECRET_HEADER, Secret};
use crate::error::{ErpCommunicationError, RelayError};
use crate::results::ErpRow;
use crate::types::ScalarValue;

#[derive(Serialize)]
struct OutgoingEnvelope<'a> {
    #[serde(rename = "sqlQuery")]
    sql_query: &'a str,
    params: &'a [ScalarValue],
}

/// Forwards envelopes to a bridge agent over HTTP(S).
///
/// ```rust,no_run
/// use erp_relay::prelude::*;
///
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let relay = HttpRelay::new(RelayClientConfig::new(
///     "https://bridge.internal:4000",
///     Secret::new("abc123"),
/// ))?;
/// let rows = relay
///     .query_erp("SELECT CLI_NOME FROM CLIENTES WHERE CLI_CODIGO = ?", &[ScalarValue::Int(42)])
///     .await?;
/// # let _ = rows;
/// # Ok(()) }
/// ```
#[derive(Debug, Clone)]
pub struct HttpRelay {
    client: reqwest::Client,
    url: String,
    secret: Secret,
    timeout: Duration,
}

impl HttpRelay {
    /// # Errors
    /// Returns `RelayError::Config` for an invalid configuration or if the HTTP client cannot
    /// be initialised.
    pub fn new(config: RelayClientConfig) -> Result<Self, RelayError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .user_agent(concat!("erp-relay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RelayError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: config.query_url(),
            secret: config.secret,
            timeout: config.timeout,
        })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn forward(
        &self,
        sql: &str,
        params: &[ScalarValue],
        timeout: Duration,
    ) -> Result<Vec<ErpRow>, RelayError> {
        if sql.trim().is_empty() {
            return Err(RelayError::Validation("sqlQuery is required.".to_string()));
        }

        debug!(url = %self.url, sql = %sql, params = params.len(), "forwarding ERP query to bridge");
        let response = self
            .client
            .post(&self.url)
            .header(SECRET_HEADER, self.secret.expose())
            .timeout(timeout)
            .json(&OutgoingEnvelope {
                sql_query: sql,
                params,
            })
            .send()
            .await
            .map_err(|e| send_error(e, timeout))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<Vec<ErpRow>>()
                .await
                .map_err(|e| match send_error(e, timeout) {
                    RelayError::Timeout(t) => RelayError::Timeout(t),
                    other => RelayError::Transport(format!("undecodable bridge response: {other}")),
                });
        }

        let body = response.json::<ErrorBody>().await.ok();
        Err(status_error(status, body))
    }
}

fn send_error(err: reqwest::Error, timeout: Duration) -> RelayError {
    if err.is_timeout() {
        RelayError::Timeout(timeout)
    } else {
        RelayError::from(err)
    }
}

/// Translate a non-2xx bridge answer back into the bridge's own error taxonomy.
fn status_error(status: StatusCode, body: Option<ErrorBody>) -> RelayError {
    match (status, body) {
        (StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED, _) => RelayError::Unauthorized,
        (StatusCode::BAD_REQUEST, Some(body)) => RelayError::Validation(body.message),
        (StatusCode::INTERNAL_SERVER_ERROR, Some(ErrorBody {
            details: Some(details),
            ..
        })) => RelayError::Driver(details),
        (status, Some(body)) => RelayError::Transport(format!("bridge answered {status}: {}", body.message)),
        (status, None) => RelayError::Transport(format!("bridge answered {status}")),
    }
}

#[async_trait]
impl QueryErp for HttpRelay {
    async fn query_erp_with(
        &self,
        sql: &str,
        params: &[ScalarValue],
        options: QueryOptions,
    ) -> Result<Vec<ErpRow>, ErpCommunicationError> {
        let timeout = options.resolve_timeout(self.timeout);
        self.forward(sql, params, timeout).await.map_err(|cause| {
            warn!(url = %self.url, error = %cause, "ERP relay call failed");
            ErpCommunicationError::new(cause)
        })
    }

    fn strategy(&self) -> RelayStrategy {
        RelayStrategy::Http
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_maps_to_unauthorized() {
        let err = status_error(StatusCode::FORBIDDEN, Some(ErrorBody::new("Unauthorized access.")));
        assert!(matches!(err, RelayError::Unauthorized));
    }

    #[test]
    fn server_error_keeps_driver_details() {
        let body = ErrorBody::new("ERP bridge query failed.").with_details("table unknown");
        let err = status_error(StatusCode::INTERNAL_SERVER_ERROR, Some(body));
        assert!(matches!(err, RelayError::Driver(ref d) if d == "table unknown"));
    }

    #[test]
    fn unknown_bodies_are_transport_failures() {
        let err = status_error(StatusCode::BAD_GATEWAY, None);
        assert!(matches!(err, RelayError::Transport(ref m) if m.contains("502")));
    }

    #[test]
    fn envelope_wire_shape() {
        let params = [ScalarValue::Int(1), ScalarValue::Null];
        let json = serde_json::to_string(&OutgoingEnvelope {
            sql_query: "SELECT ?, ?",
            params: &params,
        })
        .unwrap();
        assert_eq!(json, r#"{"sqlQuery":"SELECT ?, ?","params":[1,null]}"#);
    }

    #[test]
    fn rejects_invalid_config() {
        let cfg = RelayClientConfig::new("not-a-url", Secret::new("abc123"));
        assert!(matches!(HttpRelay::new(cfg), Err(RelayError::Config(_))));
    }
}
