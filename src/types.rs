use std::fmt;

use serde::{Deserialize, Serialize};

/// A scalar that can travel in a query envelope, either as a bound parameter or as a result
/// cell.
///
/// Serialized untagged, so the wire form is a plain JSON scalar:
/// ```rust
/// use erp_relay::prelude::*;
///
/// let params = vec![
///     ScalarValue::Int(42),
///     ScalarValue::Text("O'Brien".into()),
///     ScalarValue::Null,
/// ];
/// assert_eq!(serde_json::to_string(&params).unwrap(), r#"[42,"O'Brien",null]"#);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    /// NULL value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
}

impl ScalarValue {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        if let ScalarValue::Int(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ScalarValue::Float(value) => Some(*value),
            #[allow(clippy::cast_precision_loss)]
            ScalarValue::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let ScalarValue::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ScalarValue::Bool(value) => Some(*value),
            ScalarValue::Int(1) => Some(true),
            ScalarValue::Int(0) => Some(false),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Null => f.write_str("NULL"),
            ScalarValue::Bool(b) => write!(f, "{b}"),
            ScalarValue::Int(i) => write!(f, "{i}"),
            ScalarValue::Float(x) => write!(f, "{x}"),
            ScalarValue::Text(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        ScalarValue::Int(value)
    }
}

impl From<i32> for ScalarValue {
    fn from(value: i32) -> Self {
        ScalarValue::Int(i64::from(value))
    }
}

impl From<f64> for ScalarValue {
    fn from(value: f64) -> Self {
        ScalarValue::Float(value)
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        ScalarValue::Bool(value)
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::Text(value.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        ScalarValue::Text(value)
    }
}

impl<T: Into<ScalarValue>> From<Option<T>> for ScalarValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ScalarValue::Null, Into::into)
    }
}

/// The `(sqlQuery, params)` pair exchanged between relay client and bridge agent.
///
/// `sql_query` is optional on the wire so that a missing query is reported as a validation
/// failure by the agent instead of a generic body rejection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryEnvelope {
    #[serde(rename = "sqlQuery", default)]
    pub sql_query: Option<String>,
    #[serde(default)]
    pub params: Vec<ScalarValue>,
}

impl QueryEnvelope {
    pub fn new(sql_query: impl Into<String>, params: Vec<ScalarValue>) -> Self {
        Self {
            sql_query: Some(sql_query.into()),
            params,
        }
    }

    /// The query text, if present and not blank.
    #[must_use]
    pub fn query_text(&self) -> Option<&str> {
        self.sql_query.as_deref().filter(|sql| !sql.trim().is_empty())
    }
}
