use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Unauthorized: bridge secret missing or invalid")]
    Unauthorized,

    #[error("Invalid query envelope: {0}")]
    Validation(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("ERP driver error: {0}")]
    Driver(String),

    #[error("Timed out after {}", format_duration(.0))]
    Timeout(Duration),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unimplemented feature: {0}")]
    Unimplemented(String),
}

impl RelayError {
    /// Envelope and authorization failures are caller mistakes; everything else is the ERP path.
    #[must_use]
    pub fn is_client_fault(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::Validation(_))
    }
}

#[cfg(feature = "odbc")]
impl From<odbc_api::Error> for RelayError {
    fn from(err: odbc_api::Error) -> Self {
        RelayError::Driver(single_line(&err.to_string()))
    }
}

#[cfg(feature = "mssql")]
impl From<tiberius::error::Error> for RelayError {
    fn from(err: tiberius::error::Error) -> Self {
        RelayError::Driver(single_line(&err.to_string()))
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        // reqwest embeds the URL, never headers, so the secret stays out of the message
        RelayError::Transport(err.without_url().to_string())
    }
}

/// The single failure every `QueryErp` caller has to handle.
///
/// The underlying `RelayError` is kept as the error source so it can be logged server-side,
/// but callers only ever branch on this one type.
#[derive(Debug, Error)]
#[error("ERP communication failure")]
pub struct ErpCommunicationError {
    #[source]
    cause: RelayError,
}

impl ErpCommunicationError {
    #[must_use]
    pub fn new(cause: RelayError) -> Self {
        Self { cause }
    }

    #[must_use]
    pub fn cause(&self) -> &RelayError {
        &self.cause
    }

    #[must_use]
    pub fn into_cause(self) -> RelayError {
        self.cause
    }
}

impl From<RelayError> for ErpCommunicationError {
    fn from(cause: RelayError) -> Self {
        Self::new(cause)
    }
}

fn format_duration(duration: &Duration) -> String {
    humantime::format_duration(*duration).to_string()
}

/// Collapse driver diagnostics (ODBC records are often multi-line) into one log-friendly line.
pub(crate) fn single_line(message: &str) -> String {
    message.split_whitespace().collect::<Vec<_>>().join(" ")
}
