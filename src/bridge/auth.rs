use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use super::BridgeState;
use crate::config::SECRET_HEADER;
use crate::error::RelayError;

/// Route middleware guarding `/query-erp`.
///
/// Runs before the body is read, so a rejected caller never reaches validation, logging of
/// the query, or the ERP.
pub(crate) async fn require_secret(
    State(state): State<Arc<BridgeState>>,
    request: Request,
    next: Next,
) -> Response {
    let verdict = extract_secret(request.headers()).map(|candidate| state.secret.matches(candidate));
    match verdict {
        Some(true) => next.run(request).await,
        presented => {
            let peer = request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            warn!(
                peer = %peer,
                header_present = presented.is_some(),
                path = %request.uri().path(),
                "rejected bridge request with missing or invalid secret"
            );
            RelayError::Unauthorized.into_response()
        }
    }
}

fn extract_secret(headers: &HeaderMap) -> Option<&str> {
    headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok())
}
