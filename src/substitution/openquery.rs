use std::sync::LazyLock;

use regex::Regex;

use crate::error::RelayError;

/// Linked server name the ERP is registered under on the gateway SQL Server.
pub const DEFAULT_LINKED_SERVER: &str = "CONSULTA";

static LINKED_SERVER_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static linked server pattern")
});

/// Linked server names are spliced into the wrapper unquoted, so only plain identifiers pass.
///
/// # Errors
/// Returns `RelayError::Config` for anything that is not a plain identifier.
pub fn validate_linked_server(name: &str) -> Result<(), RelayError> {
    if LINKED_SERVER_NAME.is_match(name) {
        Ok(())
    } else {
        Err(RelayError::Config(format!(
            "linked server name {name:?} must be a plain identifier"
        )))
    }
}

/// Embed an already-inlined ERP query in an `OPENQUERY` dispatch statement.
///
/// One trailing `;` is dropped (OPENQUERY rejects terminators), then every single quote is
/// doubled again because the whole inner query becomes a string literal of the outer
/// statement.
///
/// ```rust
/// use erp_relay::substitution::wrap_openquery;
///
/// let tsql = wrap_openquery("CONSULTA", "SELECT * FROM T WHERE NOME = 'O''Brien';");
/// assert_eq!(tsql, "SELECT * FROM OPENQUERY(CONSULTA, 'SELECT * FROM T WHERE NOME = ''O''''Brien''')");
/// ```
#[must_use]
pub fn wrap_openquery(linked_server: &str, inner_sql: &str) -> String {
    let trimmed = inner_sql.trim();
    let cleaned = trimmed.strip_suffix(';').unwrap_or(trimmed);
    let escaped = cleaned.replace('\'', "''");
    format!("SELECT * FROM OPENQUERY({linked_server}, '{escaped}')")
}
