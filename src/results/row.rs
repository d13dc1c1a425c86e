use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::types::ScalarValue;

/// One row returned by the ERP.
///
/// Column names are shared across all rows of a result set and keep the ERP's native casing
/// and order. On the wire a row is a flat JSON object, one key per column.
#[derive(Debug, Clone)]
pub struct ErpRow {
    /// The column names for this row (shared across all rows in a result set)
    pub column_names: Arc<Vec<String>>,
    /// The values for this row
    pub values: Vec<ScalarValue>,
    // Internal cache for faster column lookups
    #[doc(hidden)]
    pub(crate) column_index_cache: Arc<HashMap<String, usize>>,
}

impl ErpRow {
    /// Create a new row, building its own column lookup cache.
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, values: Vec<ScalarValue>) -> Self {
        let cache = Arc::new(index_columns(&column_names));
        Self {
            column_names,
            values,
            column_index_cache: cache,
        }
    }

    pub(crate) fn with_cache(
        column_names: Arc<Vec<String>>,
        values: Vec<ScalarValue>,
        column_index_cache: Arc<HashMap<String, usize>>,
    ) -> Self {
        Self {
            column_names,
            values,
            column_index_cache,
        }
    }

    /// Get the index of a column by name (exact, case-sensitive)
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        if let Some(&idx) = self.column_index_cache.get(column_name) {
            return Some(idx);
        }
        self.column_names.iter().position(|col| col == column_name)
    }

    /// Get a value from the row by column name
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&ScalarValue> {
        self.get_column_index(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Get a value from the row by column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&ScalarValue> {
        self.values.get(index)
    }

    /// Iterate `(column, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScalarValue)> {
        self.column_names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl PartialEq for ErpRow {
    fn eq(&self, other: &Self) -> bool {
        self.column_names == other.column_names && self.values == other.values
    }
}

pub(crate) fn index_columns(column_names: &[String]) -> HashMap<String, usize> {
    column_names
        .iter()
        .enumerate()
        // first occurrence wins for duplicated column names
        .rev()
        .map(|(i, name)| (name.clone(), i))
        .collect()
}

impl Serialize for ErpRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ErpRow {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(RowVisitor)
    }
}

struct RowVisitor;

impl<'de> Visitor<'de> for RowVisitor {
    type Value = ErpRow;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a flat object of column names to scalar values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<ErpRow, A::Error> {
        let capacity = access.size_hint().unwrap_or(8);
        let mut columns = Vec::with_capacity(capacity);
        let mut values = Vec::with_capacity(capacity);
        while let Some((column, value)) = access.next_entry::<String, ScalarValue>()? {
            columns.push(column);
            values.push(value);
        }
        Ok(ErpRow::new(Arc::new(columns), values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ErpRow {
        ErpRow::new(
            Arc::new(vec!["CLI_CODIGO".into(), "CLI_NOME".into()]),
            vec![ScalarValue::Int(42), ScalarValue::Text("ACME".into())],
        )
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let row = sample();
        assert_eq!(row.get("CLI_CODIGO"), Some(&ScalarValue::Int(42)));
        assert_eq!(row.get("cli_codigo"), None);
        assert_eq!(row.get_by_index(1).and_then(ScalarValue::as_text), Some("ACME"));
    }

    #[test]
    fn serializes_in_column_order() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert_eq!(json, r#"{"CLI_CODIGO":42,"CLI_NOME":"ACME"}"#);
    }

    #[test]
    fn deserializes_preserving_order_and_casing() {
        let row: ErpRow =
            serde_json::from_str(r#"{"Zeta":null,"alpha":1.25,"MiXeD":"x"}"#).unwrap();
        assert_eq!(row.column_names.as_slice(), ["Zeta", "alpha", "MiXeD"]);
        assert_eq!(row.get("alpha"), Some(&ScalarValue::Float(1.25)));
        assert!(row.get("Zeta").is_some_and(ScalarValue::is_null));
    }

    #[test]
    fn duplicated_columns_resolve_to_first() {
        let row = ErpRow::new(
            Arc::new(vec!["A".into(), "A".into()]),
            vec![ScalarValue::Int(1), ScalarValue::Int(2)],
        );
        assert_eq!(row.get("A"), Some(&ScalarValue::Int(1)));
    }

    #[test]
    fn nested_cells_are_rejected() {
        assert!(serde_json::from_str::<ErpRow>(r#"{"A":[1,2]}"#).is_err());
    }
}
