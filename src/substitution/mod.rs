//! Placeholder handling for ERP query templates.
//!
//! The bridge agent binds parameters natively and only needs [`check_param_count`]. The
//! gateway variant cannot bind across a linked server, so it inlines every value with
//! [`substitute_params`] and then embeds the result in an `OPENQUERY` call with
//! [`wrap_openquery`]. Those two quoting passes are the only places where caller data
//! becomes SQL text.

mod openquery;
mod parsers;
mod scanner;

use tracing::warn;

use crate::error::RelayError;
use crate::types::ScalarValue;

pub use openquery::{DEFAULT_LINKED_SERVER, validate_linked_server, wrap_openquery};

/// Number of `?` placeholders in a template, ignoring literals and comments.
#[must_use]
pub fn count_placeholders(sql: &str) -> usize {
    scanner::placeholder_offsets(sql).len()
}

/// Placeholder list for an `IN (...)` clause with `count` values, e.g. `?,?,?`.
///
/// ```rust
/// use erp_relay::substitution::placeholder_list;
///
/// let sql = format!("SELECT PRO_DESCRICAO FROM PRODUTOS WHERE PRO_CODIGO IN ({})", placeholder_list(3));
/// assert!(sql.ends_with("IN (?,?,?)"));
/// ```
#[must_use]
pub fn placeholder_list(count: usize) -> String {
    vec!["?"; count].join(",")
}

/// Require the parameter count to match the placeholder count exactly.
///
/// # Errors
/// Returns `RelayError::Validation` on any mismatch.
pub fn check_param_count(sql: &str, param_count: usize) -> Result<usize, RelayError> {
    let placeholders = count_placeholders(sql);
    if placeholders != param_count {
        return Err(RelayError::Validation(format!(
            "query has {placeholders} placeholder(s) but {param_count} parameter(s) were supplied"
        )));
    }
    Ok(placeholders)
}

/// Quote text as a SQL string literal, doubling embedded single quotes.
#[must_use]
pub fn quote_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for ch in text.chars() {
        if ch == '\'' {
            out.push('\'');
        }
        out.push(ch);
    }
    out.push('\'');
    out
}

/// Render one parameter as inline SQL.
///
/// `NULL` for nulls and non-finite floats, bare decimal text for finite numbers, and a quoted
/// literal for everything else (booleans included, as `'true'`/`'false'`).
#[must_use]
pub fn format_param(value: &ScalarValue) -> String {
    match value {
        ScalarValue::Null => "NULL".to_string(),
        ScalarValue::Int(i) => i.to_string(),
        ScalarValue::Float(f) if f.is_finite() => f.to_string(),
        ScalarValue::Float(_) => "NULL".to_string(),
        ScalarValue::Bool(b) => quote_literal(&b.to_string()),
        ScalarValue::Text(s) => quote_literal(s),
    }
}

/// A template with every placeholder replaced by its inlined value.
#[derive(Debug, Clone, PartialEq)]
pub struct InlinedQuery {
    pub sql: String,
    /// Parameters left over after every placeholder was filled.
    pub unused: Vec<ScalarValue>,
}

/// Replace each placeholder, left to right, with the next parameter.
///
/// Substituted text is never rescanned, so a value containing `?` cannot consume another
/// parameter.
///
/// ```rust
/// use erp_relay::prelude::*;
/// use erp_relay::substitution::substitute_params;
///
/// let q = substitute_params("SELECT * FROM T WHERE NOME = ?", &["O'Brien".into()])?;
/// assert_eq!(q.sql, "SELECT * FROM T WHERE NOME = 'O''Brien'");
/// # Ok::<(), RelayError>(())
/// ```
///
/// # Errors
/// Returns `RelayError::Validation` when the template has more placeholders than `params`.
/// Extra parameters are not an error; they are returned in `unused` and logged.
pub fn substitute_params(sql: &str, params: &[ScalarValue]) -> Result<InlinedQuery, RelayError> {
    let offsets = scanner::placeholder_offsets(sql);
    if offsets.len() > params.len() {
        return Err(RelayError::Validation(format!(
            "query has {} placeholder(s) but only {} parameter(s) were supplied",
            offsets.len(),
            params.len()
        )));
    }

    let mut out = String::with_capacity(sql.len() + params.len() * 8);
    let mut last = 0;
    for (offset, value) in offsets.iter().zip(params) {
        out.push_str(&sql[last..*offset]);
        out.push_str(&format_param(value));
        last = offset + 1;
    }
    out.push_str(&sql[last..]);

    let unused = params[offsets.len()..].to_vec();
    if !unused.is_empty() {
        let listed = unused
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        warn!(
            unused = unused.len(),
            "query left parameters unconsumed: {listed}"
        );
    }

    Ok(InlinedQuery { sql: out, unused })
}
