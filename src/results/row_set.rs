use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::row::{ErpRow, index_columns};
use crate::types::ScalarValue;

/// Accumulates the rows of one result set.
///
/// Column names (and their lookup cache) are stored once and shared by every row, so
/// backends only push raw values per row.
#[derive(Debug, Clone, Default)]
pub struct RowSet {
    rows: Vec<ErpRow>,
    column_names: Option<Arc<Vec<String>>>,
    column_index_cache: Option<Arc<HashMap<String, usize>>>,
}

impl RowSet {
    /// Create a new row set with a known capacity
    #[must_use]
    pub fn with_capacity(capacity: usize) -> RowSet {
        RowSet {
            rows: Vec::with_capacity(capacity),
            column_names: None,
            column_index_cache: None,
        }
    }

    /// Set the column names for this result set (to be shared by all rows).
    ///
    /// Repeated names, as in `SELECT a.X, b.X`, get a `_2`, `_3`, ... suffix so every row
    /// serializes to a JSON object with distinct keys.
    pub fn set_column_names(&mut self, column_names: Vec<String>) {
        let column_names = dedupe_column_names(column_names);
        self.column_index_cache = Some(Arc::new(index_columns(&column_names)));
        self.column_names = Some(Arc::new(column_names));
    }

    #[must_use]
    pub fn column_names(&self) -> Option<&Arc<Vec<String>>> {
        self.column_names.as_ref()
    }

    /// Add a row to the set. Rows pushed before column names are known are ignored.
    pub fn add_row_values(&mut self, values: Vec<ScalarValue>) {
        if let (Some(names), Some(cache)) = (&self.column_names, &self.column_index_cache) {
            self.rows
                .push(ErpRow::with_cache(names.clone(), values, cache.clone()));
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn into_rows(self) -> Vec<ErpRow> {
        self.rows
    }
}

fn dedupe_column_names(column_names: Vec<String>) -> Vec<String> {
    let mut taken: HashSet<String> = column_names.iter().cloned().collect();
    if taken.len() == column_names.len() {
        return column_names;
    }

    let mut seen = HashSet::with_capacity(column_names.len());
    let mut out = Vec::with_capacity(column_names.len());
    for name in column_names {
        if seen.insert(name.clone()) {
            out.push(name);
            continue;
        }
        let mut n = 2;
        let renamed = loop {
            let candidate = format!("{name}_{n}");
            if !taken.contains(&candidate) {
                break candidate;
            }
            n += 1;
        };
        taken.insert(renamed.clone());
        seen.insert(renamed.clone());
        out.push(renamed);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_share_column_names() {
        let mut set = RowSet::with_capacity(2);
        set.set_column_names(vec!["EMAIL".into()]);
        set.add_row_values(vec![ScalarValue::Text("a@x".into())]);
        set.add_row_values(vec![ScalarValue::Text("b@x".into())]);

        let rows = set.into_rows();
        assert_eq!(rows.len(), 2);
        assert!(Arc::ptr_eq(&rows[0].column_names, &rows[1].column_names));
        assert_eq!(rows[1].get("EMAIL").and_then(ScalarValue::as_text), Some("b@x"));
    }

    #[test]
    fn rows_without_columns_are_dropped() {
        let mut set = RowSet::default();
        set.add_row_values(vec![ScalarValue::Int(1)]);
        assert!(set.is_empty());
    }

    #[test]
    fn repeated_column_names_get_suffixes() {
        let mut set = RowSet::default();
        set.set_column_names(vec!["X".into(), "X".into(), "X_2".into(), "X".into()]);
        set.add_row_values(vec![
            ScalarValue::Int(1),
            ScalarValue::Int(2),
            ScalarValue::Int(3),
            ScalarValue::Int(4),
        ]);

        let rows = set.into_rows();
        assert_eq!(
            rows[0].column_names.as_slice(),
            ["X", "X_3", "X_2", "X_4"].map(String::from).as_slice()
        );
        assert_eq!(
            serde_json::to_string(&rows[0]).unwrap(),
            r#"{"X":1,"X_3":2,"X_2":3,"X_4":4}"#
        );
    }

    #[test]
    fn distinct_names_are_untouched() {
        let names = vec!["CLI_CODIGO".to_string(), "CLI_NOME".to_string()];
        assert_eq!(dedupe_column_names(names.clone()), names);
    }
}
