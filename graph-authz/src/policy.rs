use crate::error::{AuthzError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Authorization policy for a single namespace.
///
/// A policy is loaded once per request or session and never mutated by the
/// compiler. Lookups scan in declaration order and return the first match,
/// so duplicate names shadow later entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub namespace: String,
    #[serde(default)]
    pub types: Vec<ObjectType>,
}

/// A node label in the graph together with the relations pointing at it and
/// the actions that can be performed on it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectType {
    pub name: String,
    #[serde(default)]
    pub relations: Vec<Relation>,
    #[serde(default)]
    pub actions: Vec<Action>,
}

/// An edge kind from a node of `subject_type` to a node of the owning type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relation {
    pub name: String,
    #[serde(rename = "type")]
    pub subject_type: String,
}

/// A named permission whose rule is a list of clauses joined by `" or"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Action {
    pub name: String,
    pub rule: String,
}

impl Relation {
    pub fn new(name: &str, subject_type: &str) -> Self {
        Self {
            name: name.to_string(),
            subject_type: subject_type.to_string(),
        }
    }
}

impl Action {
    pub fn new(name: &str, rule: &str) -> Self {
        Self {
            name: name.to_string(),
            rule: rule.to_string(),
        }
    }
}

impl ObjectType {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            relations: Vec::new(),
            actions: Vec::new(),
        }
    }

    pub fn with_relation(mut self, name: &str, subject_type: &str) -> Self {
        self.relations.push(Relation::new(name, subject_type));
        self
    }

    pub fn with_action(mut self, name: &str, rule: &str) -> Self {
        self.actions.push(Action::new(name, rule));
        self
    }
}

impl Policy {
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            types: Vec::new(),
        }
    }

    pub fn with_type(mut self, object_type: ObjectType) -> Self {
        self.types.push(object_type);
        self
    }

    /// Parse a policy document of the form
    /// `{ namespace, types: [{ name, relations: [{name, type}], actions: [{name, rule}] }] }`.
    pub fn from_json(document: &str) -> Result<Self> {
        serde_json::from_str(document).map_err(|e| AuthzError::PolicyLoad(e.to_string()))
    }

    /// Read and parse a policy document from disk
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let document = std::fs::read_to_string(path)
            .map_err(|e| AuthzError::PolicyLoad(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&document)
    }

    fn object_type(&self, type_name: &str) -> Option<&ObjectType> {
        self.types.iter().find(|t| t.name == type_name)
    }

    /// Relations declared on a type, empty if the type is unknown
    pub fn relations_by_type(&self, type_name: &str) -> &[Relation] {
        self.object_type(type_name)
            .map(|t| t.relations.as_slice())
            .unwrap_or_default()
    }

    /// Actions declared on a type, empty if the type is unknown
    pub fn actions_by_type(&self, type_name: &str) -> &[Action] {
        self.object_type(type_name)
            .map(|t| t.actions.as_slice())
            .unwrap_or_default()
    }

    pub fn action(&self, type_name: &str, action_name: &str) -> Option<Action> {
        self.actions_by_type(type_name)
            .iter()
            .find(|a| a.name == action_name)
            .cloned()
    }

    pub fn relation(&self, type_name: &str, relation_name: &str) -> Option<Relation> {
        self.relations_by_type(type_name)
            .iter()
            .find(|r| r.name == relation_name)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document_policy() -> Policy {
        Policy::new("docs")
            .with_type(
                ObjectType::new("Document")
                    .with_relation("owner", "User")
                    .with_relation("Team", "User")
                    .with_action("read", "owner or member from Team")
                    .with_action("delete", "owner"),
            )
            .with_type(ObjectType::new("User"))
    }

    #[test]
    fn test_lookups_on_known_type() {
        let policy = document_policy();

        assert_eq!(policy.relations_by_type("Document").len(), 2);
        assert_eq!(policy.actions_by_type("Document").len(), 2);
        assert_eq!(
            policy.relation("Document", "Team"),
            Some(Relation::new("Team", "User"))
        );
        assert_eq!(
            policy.action("Document", "delete"),
            Some(Action::new("delete", "owner"))
        );
    }

    #[test]
    fn test_lookups_on_unknown_names_are_empty() {
        let policy = document_policy();

        assert!(policy.relations_by_type("Folder").is_empty());
        assert!(policy.actions_by_type("Folder").is_empty());
        assert!(policy.relation("Document", "editor").is_none());
        assert!(policy.action("Document", "write").is_none());
        assert!(policy.action("Folder", "read").is_none());
    }

    #[test]
    fn test_duplicate_names_return_first_declaration() {
        let policy = Policy::new("dup").with_type(
            ObjectType::new("Document")
                .with_relation("owner", "User")
                .with_relation("owner", "Service")
                .with_action("read", "owner")
                .with_action("read", "viewer"),
        );

        assert_eq!(policy.relation("Document", "owner").unwrap().subject_type, "User");
        assert_eq!(policy.action("Document", "read").unwrap().rule, "owner");
    }

    #[test]
    fn test_from_json_document() {
        let policy = Policy::from_json(
            r#"{
                "namespace": "acme",
                "types": [
                    {
                        "name": "Document",
                        "relations": [{"name": "owner", "type": "User"}],
                        "actions": [{"name": "read", "rule": "owner"}]
                    },
                    {"name": "User"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(policy.namespace, "acme");
        assert_eq!(policy.types.len(), 2);
        assert_eq!(policy.relation("Document", "owner").unwrap().subject_type, "User");
        assert!(policy.relations_by_type("User").is_empty());
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        let err = Policy::from_json("{ not json").unwrap_err();
        assert!(matches!(err, AuthzError::PolicyLoad(_)));
    }

    #[test]
    fn test_from_file_missing_path() {
        let err = Policy::from_file("/nonexistent/policy.json").unwrap_err();
        assert!(matches!(err, AuthzError::PolicyLoad(msg) if msg.contains("/nonexistent/policy.json")));
    }
}
