use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use odbc_api::{Connection, ConnectionOptions, Environment};
use tokio::task::spawn_blocking;
use tracing::debug;

use super::params::bind_params;
use super::query::{execute_select, timeout_secs};
use crate::config::{BridgeConfig, Secret};
use crate::connector::{ErpConnection, ErpConnector};
use crate::error::RelayError;
use crate::results::ErpRow;
use crate::types::ScalarValue;

static ENVIRONMENT: OnceLock<Result<Environment, String>> = OnceLock::new();

/// The process-wide ODBC environment, created on first use. A failed allocation is kept
/// and reported to every later caller.
fn environment() -> Result<&'static Environment, RelayError> {
    ENVIRONMENT
        .get_or_init(|| Environment::new().map_err(|e| e.to_string()))
        .as_ref()
        .map_err(|e| RelayError::Driver(format!("ODBC environment unavailable: {e}")))
}

/// ODBC login timeouts are whole seconds; the connect gets the same budget as a statement.
fn connection_options(timeout: Duration) -> ConnectionOptions {
    ConnectionOptions {
        login_timeout_sec: Some(u32::try_from(timeout_secs(timeout)).unwrap_or(u32::MAX)),
        ..ConnectionOptions::default()
    }
}

async fn run_blocking<T, F>(func: F) -> Result<T, RelayError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, RelayError> + Send + 'static,
{
    spawn_blocking(func)
        .await
        .map_err(|e| RelayError::Driver(format!("odbc spawn_blocking join error: {e}")))?
}

/// Opens one ODBC connection per query from a DSN-less connection string.
#[derive(Debug, Clone)]
pub struct OdbcConnector {
    connection_string: Secret,
    query_timeout: Duration,
}

impl OdbcConnector {
    #[must_use]
    pub fn new(connection_string: Secret, query_timeout: Duration) -> Self {
        Self {
            connection_string,
            query_timeout,
        }
    }

    #[must_use]
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(config.erp_connection_string.clone(), config.query_timeout)
    }
}

#[async_trait]
impl ErpConnector for OdbcConnector {
    async fn connect(&self) -> Result<Box<dyn ErpConnection>, RelayError> {
        let connection_string = self.connection_string.clone();
        let options = connection_options(self.query_timeout);
        let conn = run_blocking(move || {
            let conn = environment()?
                .connect_with_connection_string(connection_string.expose(), options)?;
            Ok(conn)
        })
        .await?;
        Ok(Box::new(OdbcConnection {
            conn: Some(conn),
            query_timeout: self.query_timeout,
        }))
    }

    fn backend(&self) -> &'static str {
        "odbc"
    }
}

/// A live ODBC connection. Dropping it disconnects on the blocking pool.
pub struct OdbcConnection {
    conn: Option<Connection<'static>>,
    query_timeout: Duration,
}

impl OdbcConnection {
    fn take(&mut self) -> Result<Connection<'static>, RelayError> {
        self.conn
            .take()
            .ok_or_else(|| RelayError::Driver("ODBC connection already released".to_string()))
    }
}

#[async_trait]
impl ErpConnection for OdbcConnection {
    async fn query(
        &mut self,
        sql: &str,
        params: &[ScalarValue],
    ) -> Result<Vec<ErpRow>, RelayError> {
        let conn = self.take()?;
        let sql = sql.to_owned();
        let bound = bind_params(params);
        let timeout = self.query_timeout;

        // a cancelled caller leaves the connection inside the task, which drops it when done
        let (conn, outcome) = spawn_blocking(move || {
            let outcome = execute_select(&conn, &sql, &bound, timeout);
            (conn, outcome)
        })
        .await
        .map_err(|e| RelayError::Driver(format!("odbc spawn_blocking join error: {e}")))?;

        self.conn = Some(conn);
        outcome
    }

    async fn close(mut self: Box<Self>) -> Result<(), RelayError> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };
        run_blocking(move || {
            drop(conn);
            Ok(())
        })
        .await?;
        debug!("ODBC connection released");
        Ok(())
    }
}

impl Drop for OdbcConnection {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || drop(conn));
            }
            Err(_) => drop(conn),
        }
    }
}
