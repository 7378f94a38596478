use crate::{error::AuthzError, query::GraphQuery};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One result record, columns kept in projection order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    /// Set a column, replacing an existing value in place
    pub fn insert(&mut self, column: &str, value: impl Into<Value>) {
        let value = value.into();
        match self.columns.iter_mut().find(|(name, _)| name == column) {
            Some(slot) => slot.1 = value,
            None => self.columns.push((column.to_string(), value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }
}

/// Runs compiled queries against a graph database.
///
/// Each call runs in its own transaction. Implementations report driver
/// failures as [`AuthzError::QueryExecution`] and never retry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GraphExecutor: Send + Sync {
    async fn run(&self, query: &GraphQuery) -> Result<Vec<Row>, AuthzError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_keeps_projection_order() {
        let row = Row::new()
            .with("zeta", true)
            .with("alpha", false)
            .with("mid", true);

        let names: Vec<_> = row.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
        assert_eq!(row.get("alpha"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_row_insert_replaces() {
        let mut row = Row::new().with("o.id", "a");
        row.insert("o.id", "b");

        assert_eq!(row.iter().count(), 1);
        assert_eq!(row.get("o.id"), Some(&Value::from("b")));
        assert!(row.get("total").is_none());
    }
}
