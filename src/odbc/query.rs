use std::time::Duration;

use odbc_api::buffers::TextRowSet;
use odbc_api::{Connection, Cursor, DataType, ResultSetMetadata};

use super::params::BoundParams;
use crate::error::RelayError;
use crate::results::{ErpRow, RowSet};
use crate::types::ScalarValue;

/// Rows fetched per round trip to the driver.
const BATCH_SIZE: usize = 256;

/// Upper bound for a single text cell; the ERP's widest VARCHAR columns fit comfortably.
const MAX_TEXT_LEN: usize = 8192;

/// How a column's text buffer is turned back into a scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Float,
    Boolean,
    Text,
}

impl From<DataType> for ColumnKind {
    fn from(data_type: DataType) -> Self {
        match data_type {
            DataType::TinyInt | DataType::SmallInt | DataType::Integer | DataType::BigInt => {
                ColumnKind::Integer
            }
            DataType::Float { .. } | DataType::Real | DataType::Double => ColumnKind::Float,
            DataType::Decimal { scale, .. } | DataType::Numeric { scale, .. } => {
                if scale == 0 {
                    ColumnKind::Integer
                } else {
                    ColumnKind::Float
                }
            }
            DataType::Bit => ColumnKind::Boolean,
            _ => ColumnKind::Text,
        }
    }
}

impl ColumnKind {
    /// Decode one cell. Unparseable numbers fall back to text rather than failing the query,
    /// but bytes that are not valid UTF-8 are an error: the text would no longer be what the
    /// ERP stored.
    ///
    /// # Errors
    /// Returns `RelayError::Driver` when the cell is not valid UTF-8.
    pub fn decode(self, cell: Option<&[u8]>) -> Result<ScalarValue, RelayError> {
        let Some(bytes) = cell else {
            return Ok(ScalarValue::Null);
        };
        let text = std::str::from_utf8(bytes).map_err(|e| {
            RelayError::Driver(format!("ERP returned a text cell that is not valid UTF-8: {e}"))
        })?;
        let trimmed = text.trim();
        let value = match self {
            ColumnKind::Integer => trimmed
                .parse::<i64>()
                .map(ScalarValue::Int)
                .or_else(|_| trimmed.parse::<f64>().map(ScalarValue::Float))
                .unwrap_or_else(|_| ScalarValue::Text(text.to_string())),
            ColumnKind::Float => trimmed
                .parse::<f64>()
                .map(ScalarValue::Float)
                .unwrap_or_else(|_| ScalarValue::Text(text.to_string())),
            ColumnKind::Boolean => match trimmed {
                "1" => ScalarValue::Bool(true),
                "0" => ScalarValue::Bool(false),
                _ => ScalarValue::Text(text.to_string()),
            },
            ColumnKind::Text => ScalarValue::Text(text.to_string()),
        };
        Ok(value)
    }
}

/// ODBC timeouts are whole seconds and 0 disables them, so round up and keep at least one.
#[must_use]
pub fn timeout_secs(timeout: Duration) -> usize {
    let mut secs = timeout.as_secs();
    if timeout.subsec_nanos() > 0 {
        secs += 1;
    }
    usize::try_from(secs.max(1)).unwrap_or(usize::MAX)
}

/// Execute `sql` on `conn` and materialize every row. Runs on the blocking pool.
///
/// # Errors
/// Returns `RelayError::Driver` for any driver diagnostic, including a hit query timeout.
pub fn execute_select(
    conn: &Connection<'static>,
    sql: &str,
    params: &BoundParams,
    timeout: Duration,
) -> Result<Vec<ErpRow>, RelayError> {
    let Some(cursor) = conn.execute(sql, params.as_slice(), Some(timeout_secs(timeout)))? else {
        // statements without a result set produce no rows
        return Ok(Vec::new());
    };
    collect_rows(cursor)
}

fn collect_rows(mut cursor: impl Cursor) -> Result<Vec<ErpRow>, RelayError> {
    let col_count = u16::try_from(cursor.num_result_cols()?).unwrap_or(0);
    if col_count == 0 {
        return Ok(Vec::new());
    }

    let mut names = Vec::with_capacity(usize::from(col_count));
    let mut kinds = Vec::with_capacity(usize::from(col_count));
    for col in 1..=col_count {
        names.push(cursor.col_name(col)?);
        kinds.push(ColumnKind::from(cursor.col_data_type(col)?));
    }

    let mut row_set = RowSet::with_capacity(BATCH_SIZE);
    row_set.set_column_names(names);

    let buffer = TextRowSet::for_cursor(BATCH_SIZE, &mut cursor, Some(MAX_TEXT_LEN))?;
    let mut block = cursor.bind_buffer(buffer)?;
    // a cell longer than MAX_TEXT_LEN fails the query instead of arriving cut short
    while let Some(batch) = block
        .fetch_with_truncation_check(true)
        .map_err(|e| RelayError::Driver(format!("ERP row fetch failed: {e}")))?
    {
        for row in 0..batch.num_rows() {
            let values = kinds
                .iter()
                .enumerate()
                .map(|(col, kind)| kind.decode(batch.at(col, row)))
                .collect::<Result<Vec<_>, _>>()?;
            row_set.add_row_values(values);
        }
    }

    Ok(row_set.into_rows())
}
