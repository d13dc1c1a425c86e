use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::{debug, error, info};

use super::BridgeState;
use crate::connector::run_on_fresh_connection;
use crate::error::RelayError;
use crate::results::ErpRow;
use crate::substitution::check_param_count;
use crate::types::QueryEnvelope;

/// `POST /query-erp`: run one envelope against a fresh ERP connection.
pub(crate) async fn handle_query(
    State(state): State<Arc<BridgeState>>,
    payload: Result<Json<QueryEnvelope>, JsonRejection>,
) -> Result<Json<Vec<ErpRow>>, RelayError> {
    let Json(envelope) =
        payload.map_err(|rejection| RelayError::Validation(rejection.body_text()))?;
    let sql = envelope
        .query_text()
        .ok_or_else(|| RelayError::Validation("sqlQuery is required.".to_string()))?;

    info!(sql = %sql, params = ?envelope.params, "bridge received ERP query");
    check_param_count(sql, envelope.params.len())?;

    // dropping the timed-out future releases the connection through its Drop
    let outcome = tokio::time::timeout(
        state.query_timeout,
        run_on_fresh_connection(state.connector.as_ref(), sql, &envelope.params),
    )
    .await
    .unwrap_or_else(|_| Err(RelayError::Timeout(state.query_timeout)));

    match outcome {
        Ok(rows) => {
            info!(rows = rows.len(), "ERP query returned");
            debug!(rows = %serde_json::to_string(&rows).unwrap_or_default(), "ERP query result");
            Ok(Json(rows))
        }
        Err(err) => {
            error!(error = %err, sql = %sql, "ERP query failed");
            Err(err)
        }
    }
}

/// `GET /health`: liveness only, never touches the ERP.
pub(crate) async fn handle_health(State(state): State<Arc<BridgeState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "erp-bridge",
        "backend": state.connector.backend(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}
