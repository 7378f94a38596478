//! Query text compatibility with the target graph engine
//!
//! The exact keyword casing and clause ordering are relied upon by
//! deployments, so these tests pin the full text.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use graph_authz::query::{access_query, count_query, filter_query, SUBJECT_ID_PARAM};
use graph_authz::*;
use proptest::prelude::*;
use serde_json::Value;

fn policy() -> Policy {
    Policy::new("acme").with_type(
        ObjectType::new("Document")
            .with_relation("owner", "User")
            .with_relation("editor", "User")
            .with_relation("Team", "User")
            .with_action("read", "owner or editor or member from Team")
            .with_action("edit", "owner or editor"),
    )
}

#[test]
fn test_access_query_has_one_column_per_clause() {
    let query = access_query(
        &Subject::new("User", "1"),
        "read",
        &Object::new("Document", "5"),
        &policy(),
    )
    .unwrap();

    let projection = query.text.split("RETURN\n").nth(1).unwrap();
    let columns: Vec<_> = projection.split(",\n").collect();

    assert_eq!(
        columns,
        vec![
            "\tEXISTS((s)-[:OWNER]->(o)) AS owner",
            "\tEXISTS((s)-[:EDITOR]->(o)) AS editor",
            "\tEXISTS((s)-[:MEMBER]-(:User)-[:TEAM*..1000]->(o)) AS member_from_Team",
        ]
    );
}

#[test]
fn test_clause_order_is_match_match_predicate_projection() {
    let text = filter_query(&Subject::new("User", "1"), "edit", "Document", &policy())
        .unwrap()
        .text;

    let positions: Vec<_> = ["MATCH (s:", "MATCH (o:", "WHERE ", "RETURN DISTINCT o.id"]
        .iter()
        .map(|needle| text.find(needle).unwrap())
        .collect();
    let mut sorted = positions.clone();
    sorted.sort_unstable();

    assert_eq!(positions, sorted);
}

#[test]
fn test_labels_are_quoted_not_injected() {
    let query = count_query(
        &Subject::new("User) DETACH DELETE (x", "1"),
        "edit",
        "Document",
        &policy(),
    )
    .unwrap();

    assert!(query
        .text
        .starts_with("MATCH (s:`User) DETACH DELETE (x` {id: $subject_id})\n"));
}

proptest! {
    #[test]
    fn prop_n_clauses_give_n_columns(n in 1usize..8) {
        let relations: Vec<String> = (0..n).map(|i| format!("rel{}", i)).collect();
        let mut object_type = ObjectType::new("Document")
            .with_action("read", &relations.join(" or "));
        for relation in &relations {
            object_type = object_type.with_relation(relation, "User");
        }
        let policy = Policy::new("gen").with_type(object_type);

        let query = access_query(
            &Subject::new("User", "1"),
            "read",
            &Object::new("Document", "5"),
            &policy,
        ).unwrap();

        prop_assert_eq!(query.plan.clauses.len(), n);
        prop_assert_eq!(query.text.matches(" AS rel").count(), n);
    }

    #[test]
    fn prop_subject_id_is_always_a_parameter(id in ".{0,32}") {
        let query = filter_query(&Subject::new("User", &id), "edit", "Document", &policy()).unwrap();

        prop_assert_eq!(query.params.get(SUBJECT_ID_PARAM), Some(&Value::String(id.clone())));
        let expected_prefix = "MATCH (s:User {id: $subject_id})\n";
        prop_assert!(query.text.starts_with(expected_prefix));
    }
}
