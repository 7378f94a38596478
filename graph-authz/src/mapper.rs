//! Mapping of raw executor rows into typed results.
//!
//! Values are never coerced: a column holding the wrong JSON type is a
//! mapping defect and fails the whole operation.

use crate::error::{AuthzError, Result};
use crate::executor::Row;
use crate::models::AccessResult;
use crate::query::{ID_COLUMN, TOTAL_COLUMN};
use serde_json::Value;
use tracing::warn;

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("boolean {}", b),
        Value::Number(n) => format!("number {}", n),
        Value::String(s) => format!("string {:?}", s),
        Value::Array(_) => "array".to_string(),
        Value::Object(_) => "object".to_string(),
    }
}

fn mismatch(column: &str, expected: &'static str, found: &Value) -> AuthzError {
    warn!("Column '{}' expected {}, got {}", column, expected, describe(found));
    AuthzError::ColumnTypeMismatch {
        column: column.to_string(),
        expected,
        found: describe(found),
    }
}

/// Map the single point-check row into one result per clause column
pub fn map_access(rows: &[Row]) -> Result<Vec<AccessResult>> {
    let row = rows.first().ok_or(AuthzError::NoResult)?;

    row.iter()
        .map(|(column, value)| match value {
            Value::Bool(ok) => Ok(AccessResult::new(column, *ok)),
            other => Err(mismatch(column, "boolean", other)),
        })
        .collect()
}

/// Collect object identifiers, failing on any row without one
pub fn map_identifiers(rows: &[Row]) -> Result<Vec<String>> {
    rows.iter()
        .map(|row| match row.get(ID_COLUMN) {
            None | Some(Value::Null) => Err(AuthzError::MissingIdentifier(ID_COLUMN.to_string())),
            Some(Value::String(id)) => Ok(id.clone()),
            Some(other) => Err(mismatch(ID_COLUMN, "string", other)),
        })
        .collect()
}

/// Read the distinct-object count of a count query
pub fn map_count(rows: &[Row]) -> Result<u64> {
    let row = rows.first().ok_or(AuthzError::NoResult)?;
    let value = row
        .get(TOTAL_COLUMN)
        .ok_or_else(|| AuthzError::MissingColumn(TOTAL_COLUMN.to_string()))?;

    value
        .as_u64()
        .ok_or_else(|| mismatch(TOTAL_COLUMN, "non-negative integer", value))
}
