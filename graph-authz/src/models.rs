use serde::{Deserialize, Serialize};
use std::fmt;

/// The node asking for access, bound by exact id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subject {
    pub subject_type: String,
    pub id: String,
}

impl Subject {
    pub fn new(subject_type: &str, id: &str) -> Self {
        Self {
            subject_type: subject_type.to_string(),
            id: id.to_string(),
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.subject_type, self.id)
    }
}

/// The node being accessed
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Object {
    pub object_type: String,
    pub id: String,
}

impl Object {
    pub fn new(object_type: &str, id: &str) -> Self {
        Self {
            object_type: object_type.to_string(),
            id: id.to_string(),
        }
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.object_type, self.id)
    }
}

/// Outcome of a single clause in a point check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessResult {
    pub clause: String,
    pub ok: bool,
}

impl AccessResult {
    pub fn new(clause: &str, ok: bool) -> Self {
        Self {
            clause: clause.to_string(),
            ok,
        }
    }
}

/// Identifiers of the objects a subject may act on
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterResult {
    pub identifiers: Vec<String>,
}

/// One page of a filter listing.
///
/// `total` is the number of pages, not the number of objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginatedFilterResult {
    pub total: u64,
    pub current_page: i64,
    pub data: Vec<FilterResult>,
}

/// Returns true when any clause of a point check granted access
pub fn is_allowed(results: &[AccessResult]) -> bool {
    results.iter().any(|r| r.ok)
}
