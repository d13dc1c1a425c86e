//! In-memory ERP connector for tests and benchmarks.
//!
//! [`MockConnector`] never touches a driver. It records every query it receives and counts
//! how many connections were opened, closed, and dropped without being closed, so tests can
//! assert the per-query lifecycle.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::connector::{ErpConnection, ErpConnector};
use crate::error::RelayError;
use crate::results::{ErpRow, RowSet};
use crate::types::ScalarValue;

/// Build rows sharing one set of column names.
#[must_use]
pub fn make_rows(columns: &[&str], values: Vec<Vec<ScalarValue>>) -> Vec<ErpRow> {
    let mut set = RowSet::with_capacity(values.len());
    set.set_column_names(columns.iter().map(ToString::to_string).collect());
    for row in values {
        set.add_row_values(row);
    }
    set.into_rows()
}

/// What the mock ERP does when asked to run a query.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    Rows(Vec<ErpRow>),
    ConnectFails(String),
    QueryFails(String),
    /// Query succeeds but disconnecting reports an error.
    CloseFails(Vec<ErpRow>),
}

#[derive(Debug, Default)]
pub struct ConnectionCounters {
    opened: AtomicUsize,
    closed: AtomicUsize,
    dropped_unclosed: AtomicUsize,
    queries: AtomicUsize,
}

impl ConnectionCounters {
    #[must_use]
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn dropped_unclosed(&self) -> usize {
        self.dropped_unclosed.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct MockConnector {
    behavior: MockBehavior,
    delay: Option<Duration>,
    counters: Arc<ConnectionCounters>,
    seen: Arc<Mutex<Vec<(String, Vec<ScalarValue>)>>>,
}

impl MockConnector {
    #[must_use]
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            delay: None,
            counters: Arc::new(ConnectionCounters::default()),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    #[must_use]
    pub fn returning(rows: Vec<ErpRow>) -> Self {
        Self::new(MockBehavior::Rows(rows))
    }

    /// Sleep this long inside every query, to simulate a slow link.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    #[must_use]
    pub fn counters(&self) -> Arc<ConnectionCounters> {
        self.counters.clone()
    }

    /// Every `(sql, params)` pair that reached a connection, in arrival order.
    #[must_use]
    pub fn seen_queries(&self) -> Vec<(String, Vec<ScalarValue>)> {
        self.seen
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ErpConnector for MockConnector {
    async fn connect(&self) -> Result<Box<dyn ErpConnection>, RelayError> {
        if let MockBehavior::ConnectFails(message) = &self.behavior {
            return Err(RelayError::Driver(message.clone()));
        }
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockConnection {
            behavior: self.behavior.clone(),
            delay: self.delay,
            counters: self.counters.clone(),
            seen: self.seen.clone(),
            closed: false,
        }))
    }

    fn backend(&self) -> &'static str {
        "mock"
    }
}

struct MockConnection {
    behavior: MockBehavior,
    delay: Option<Duration>,
    counters: Arc<ConnectionCounters>,
    seen: Arc<Mutex<Vec<(String, Vec<ScalarValue>)>>>,
    closed: bool,
}

#[async_trait]
impl ErpConnection for MockConnection {
    async fn query(
        &mut self,
        sql: &str,
        params: &[ScalarValue],
    ) -> Result<Vec<ErpRow>, RelayError> {
        self.counters.queries.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((sql.to_string(), params.to_vec()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.behavior {
            MockBehavior::Rows(rows) | MockBehavior::CloseFails(rows) => Ok(rows.clone()),
            MockBehavior::QueryFails(message) => Err(RelayError::Driver(message.clone())),
            MockBehavior::ConnectFails(_) => unreachable!("connect already failed"),
        }
    }

    async fn close(mut self: Box<Self>) -> Result<(), RelayError> {
        self.closed = true;
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        if matches!(self.behavior, MockBehavior::CloseFails(_)) {
            return Err(RelayError::Driver("connection reset during disconnect".into()));
        }
        Ok(())
    }
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        if !self.closed {
            self.counters.dropped_unclosed.fetch_add(1, Ordering::SeqCst);
        }
    }
}
