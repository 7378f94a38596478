use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthzError {
    #[error("Action '{action}' not found for type '{object_type}'")]
    ActionNotFound { object_type: String, action: String },

    #[error("Relation '{relation}' not found for type '{object_type}'")]
    RelationNotFound { object_type: String, relation: String },

    #[error("Invalid clause format: {0}")]
    MalformedClause(String),

    #[error("Page must be greater than 0, got {0}")]
    InvalidPage(i64),

    #[error("Page size must be greater than 0, got {0}")]
    InvalidLimit(i64),

    #[error("Page {page} out of range ({total_pages} pages available)")]
    PageOutOfRange { page: i64, total_pages: u64 },

    #[error("Cache value for key {0} is not a count")]
    CacheValueTypeMismatch(String),

    #[error("Query execution failed: {0}")]
    QueryExecution(String),

    #[error("Query returned no records")]
    NoResult,

    #[error("Row has no identifier in column '{0}'")]
    MissingIdentifier(String),

    #[error("Row has no column '{0}'")]
    MissingColumn(String),

    #[error("Column '{column}' holds {found}, expected {expected}")]
    ColumnTypeMismatch {
        column: String,
        expected: &'static str,
        found: String,
    },

    #[error("Failed to load policy: {0}")]
    PolicyLoad(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AuthzError>;
