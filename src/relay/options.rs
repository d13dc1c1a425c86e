use std::time::Duration;

/// Per-call options for `QueryErp::query_erp_with`.
///
/// ```rust
/// use std::time::Duration;
/// use erp_relay::prelude::*;
///
/// let options = QueryOptions::default().with_timeout(Duration::from_secs(10));
/// assert_eq!(options.resolve_timeout(Duration::from_secs(120)), Duration::from_secs(10));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueryOptions {
    /// Overrides the relay's configured timeout for this call only.
    pub timeout: Option<Duration>,
}

impl QueryOptions {
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn resolve_timeout(self, relay_default: Duration) -> Duration {
        self.timeout.unwrap_or(relay_default)
    }
}
