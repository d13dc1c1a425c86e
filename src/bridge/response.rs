use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::error::RelayError;

/// JSON error body returned by the bridge agent.
///
/// `details` is only present on 500-class failures and carries a one-line driver diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: None,
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

pub(crate) fn status_for(err: &RelayError) -> StatusCode {
    match err {
        RelayError::Unauthorized => StatusCode::FORBIDDEN,
        RelayError::Validation(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        let body = match self {
            RelayError::Unauthorized => ErrorBody::new("Unauthorized access."),
            RelayError::Validation(message) => ErrorBody::new(message),
            RelayError::Driver(details) => ErrorBody::new("ERP bridge query failed.").with_details(details),
            other => ErrorBody::new("ERP bridge query failed.").with_details(other.to_string()),
        };
        (status, Json(body)).into_response()
    }
}
