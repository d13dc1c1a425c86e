use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use futures_util::TryStreamExt;
use tiberius::Query;
use tiberius::numeric::Numeric;

use super::client::MssqlClient;
use crate::error::RelayError;
use crate::results::{ErpRow, RowSet};
use crate::types::ScalarValue;

/// Run a parameterless statement and collect the first result set.
///
/// A statement that produces no result set at all (or an empty one) yields no rows rather
/// than an error.
pub async fn build_rows(client: &mut MssqlClient, statement: &str) -> Result<Vec<ErpRow>, RelayError> {
    let mut stream = Query::new(statement)
        .query(client)
        .await
        .map_err(|e| RelayError::Driver(format!("SQL Server query error: {e}")))?;

    let column_names: Vec<String> = match stream
        .columns()
        .await
        .map_err(|e| RelayError::Driver(format!("SQL Server column fetch error: {e}")))?
    {
        Some(columns) => columns.iter().map(|col| col.name().to_string()).collect(),
        None => return Ok(Vec::new()),
    };

    let col_count = column_names.len();
    let mut row_set = RowSet::with_capacity(16);
    row_set.set_column_names(column_names);

    let mut rows_stream = stream.into_row_stream();
    while let Some(row) = rows_stream
        .try_next()
        .await
        .map_err(|e| RelayError::Driver(format!("SQL Server row fetch error: {e}")))?
    {
        let mut values = Vec::with_capacity(col_count);
        for idx in 0..col_count {
            values.push(extract_value(&row, idx));
        }
        row_set.add_row_values(values);
    }

    Ok(row_set.into_rows())
}

/// Extract one cell by probing the SQL Server types the ERP link can surface.
fn extract_value(row: &tiberius::Row, idx: usize) -> ScalarValue {
    if let Ok(Some(val)) = row.try_get::<i32, _>(idx) {
        return ScalarValue::Int(i64::from(val));
    }
    if let Ok(Some(val)) = row.try_get::<i64, _>(idx) {
        return ScalarValue::Int(val);
    }
    if let Ok(Some(val)) = row.try_get::<i16, _>(idx) {
        return ScalarValue::Int(i64::from(val));
    }
    if let Ok(Some(val)) = row.try_get::<u8, _>(idx) {
        return ScalarValue::Int(i64::from(val));
    }
    if let Ok(Some(val)) = row.try_get::<f64, _>(idx) {
        return ScalarValue::Float(val);
    }
    if let Ok(Some(val)) = row.try_get::<f32, _>(idx) {
        return ScalarValue::Float(f64::from(val));
    }
    if let Ok(Some(val)) = row.try_get::<Numeric, _>(idx) {
        return numeric_value(val.value(), val.scale());
    }
    if let Ok(Some(val)) = row.try_get::<bool, _>(idx) {
        return ScalarValue::Bool(val);
    }
    if let Ok(Some(val)) = row.try_get::<&str, _>(idx) {
        return ScalarValue::Text(val.to_string());
    }
    if let Ok(Some(val)) = row.try_get::<NaiveDateTime, _>(idx) {
        return ScalarValue::Text(val.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
    }
    if let Ok(Some(val)) = row.try_get::<NaiveDate, _>(idx) {
        return ScalarValue::Text(val.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(val)) = row.try_get::<NaiveTime, _>(idx) {
        return ScalarValue::Text(val.format("%H:%M:%S%.f").to_string());
    }
    if let Ok(Some(val)) = row.try_get::<DateTime<FixedOffset>, _>(idx) {
        return ScalarValue::Text(val.to_rfc3339());
    }
    if let Ok(Some(val)) = row.try_get::<DateTime<Utc>, _>(idx) {
        return ScalarValue::Text(val.to_rfc3339());
    }
    if let Ok(Some(val)) = row.try_get::<&[u8], _>(idx) {
        return ScalarValue::Text(hex(val));
    }
    ScalarValue::Null
}

/// Scale-0 numerics that fit stay integers; everything else becomes a float.
fn numeric_value(value: i128, scale: u8) -> ScalarValue {
    if scale == 0 {
        if let Ok(int) = i64::try_from(value) {
            return ScalarValue::Int(int);
        }
    }
    #[allow(clippy::cast_precision_loss)]
    let float = value as f64 / 10f64.powi(i32::from(scale));
    ScalarValue::Float(float)
}

fn hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}
