//! Rule compiler: turns an action rule into point-check, filter and count queries.

use crate::clause::{compile_clause, split_rule, CompiledClause};
use crate::cypher::{node_label, quote_identifier};
use crate::error::{AuthzError, Result};
use crate::models::{Object, Subject};
use crate::policy::Policy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

pub const SUBJECT_ID_PARAM: &str = "subject_id";
pub const OBJECT_ID_PARAM: &str = "object_id";
pub const SKIP_PARAM: &str = "skip";
pub const LIMIT_PARAM: &str = "limit";

/// Column holding object identifiers in filter results
pub const ID_COLUMN: &str = "o.id";
/// Column holding the distinct object count in count results
pub const TOTAL_COLUMN: &str = "total";

/// What a compiled query returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Projection {
    /// One boolean column per clause, named by the clause alias
    ClauseColumns,
    /// Distinct object identifiers under [`ID_COLUMN`]
    DistinctIds,
    /// Count of distinct object identifiers under [`TOTAL_COLUMN`]
    CountDistinct,
}

/// Structured description of a compiled query.
///
/// Carried next to the text so executors that do not speak Cypher (such as
/// [`crate::memory::InMemoryGraph`]) can evaluate the same query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPlan {
    pub subject_label: String,
    pub object_label: String,
    /// Whether the object node is bound by `$object_id`
    pub object_bound: bool,
    pub clauses: Vec<CompiledClause>,
    pub projection: Projection,
}

/// A parameterized graph query ready for execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQuery {
    pub text: String,
    pub params: BTreeMap<String, Value>,
    pub plan: QueryPlan,
}

impl GraphQuery {
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// Append a zero-based `SKIP`/`LIMIT` window
    pub fn with_window(mut self, skip: u64, limit: u64) -> Self {
        self.text
            .push_str(&format!(" SKIP ${} LIMIT ${}", SKIP_PARAM, LIMIT_PARAM));
        self.params.insert(SKIP_PARAM.to_string(), Value::from(skip));
        self.params.insert(LIMIT_PARAM.to_string(), Value::from(limit));
        self
    }
}

fn compile_rule(
    object_type: &str,
    action: &str,
    auditable: bool,
    policy: &Policy,
) -> Result<Vec<CompiledClause>> {
    let action_entity =
        policy
            .action(object_type, action)
            .ok_or_else(|| AuthzError::ActionNotFound {
                object_type: object_type.to_string(),
                action: action.to_string(),
            })?;

    split_rule(&action_entity.rule)
        .into_iter()
        .map(|clause| compile_clause(clause, object_type, auditable, policy))
        .collect()
}

fn match_subject(subject_type: &str) -> String {
    format!(
        "MATCH (s:{} {{id: ${}}})\n",
        quote_identifier(&node_label(subject_type)),
        SUBJECT_ID_PARAM
    )
}

fn join_fragments(clauses: &[CompiledClause], separator: &str) -> String {
    clauses
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join(separator)
}

fn subject_params(subject: &Subject) -> BTreeMap<String, Value> {
    let mut params = BTreeMap::new();
    params.insert(
        SUBJECT_ID_PARAM.to_string(),
        Value::String(subject.id.clone()),
    );
    params
}

/// Point check with one aliased boolean column per clause
pub fn access_query(
    subject: &Subject,
    action: &str,
    object: &Object,
    policy: &Policy,
) -> Result<GraphQuery> {
    let clauses = compile_rule(&object.object_type, action, true, policy)?;

    let mut text = match_subject(&subject.subject_type);
    text.push_str(&format!(
        "MATCH (o:{} {{id: ${}}})\n",
        quote_identifier(&node_label(&object.object_type)),
        OBJECT_ID_PARAM
    ));
    text.push_str("RETURN\n");
    text.push_str(&join_fragments(&clauses, ",\n"));

    let mut params = subject_params(subject);
    params.insert(OBJECT_ID_PARAM.to_string(), Value::String(object.id.clone()));

    debug!("Access query for {} {} {}:\n{}", subject, action, object, text);

    Ok(GraphQuery {
        text,
        params,
        plan: QueryPlan {
            subject_label: node_label(&subject.subject_type),
            object_label: node_label(&object.object_type),
            object_bound: true,
            clauses,
            projection: Projection::ClauseColumns,
        },
    })
}

fn predicate_query(
    subject: &Subject,
    action: &str,
    object_type: &str,
    policy: &Policy,
    separator: &str,
    projection: Projection,
) -> Result<GraphQuery> {
    let clauses = compile_rule(object_type, action, false, policy)?;

    let mut text = match_subject(&subject.subject_type);
    text.push_str(&format!(
        "MATCH (o:{})\n",
        quote_identifier(&node_label(object_type))
    ));
    text.push_str("WHERE ");
    text.push_str(&join_fragments(&clauses, separator));

    Ok(GraphQuery {
        text,
        params: subject_params(subject),
        plan: QueryPlan {
            subject_label: node_label(&subject.subject_type),
            object_label: node_label(object_type),
            object_bound: false,
            clauses,
            projection,
        },
    })
}

/// Distinct identifiers of every `object_type` node the subject may act on
pub fn filter_query(
    subject: &Subject,
    action: &str,
    object_type: &str,
    policy: &Policy,
) -> Result<GraphQuery> {
    let mut query = predicate_query(
        subject,
        action,
        object_type,
        policy,
        " OR\n",
        Projection::DistinctIds,
    )?;
    query
        .text
        .push_str(&format!("\nRETURN DISTINCT {}\n", ID_COLUMN));

    debug!("Filter query for {} {} {}:\n{}", subject, action, object_type, query.text);
    Ok(query)
}

/// Count of distinct objects matched by [`filter_query`]
pub fn count_query(
    subject: &Subject,
    action: &str,
    object_type: &str,
    policy: &Policy,
) -> Result<GraphQuery> {
    let mut query = predicate_query(
        subject,
        action,
        object_type,
        policy,
        " OR \n",
        Projection::CountDistinct,
    )?;
    query.text.push_str(&format!(
        "\nRETURN COUNT(DISTINCT {}) AS {}",
        ID_COLUMN, TOTAL_COLUMN
    ));

    debug!("Count query for {} {} {}:\n{}", subject, action, object_type, query.text);
    Ok(query)
}
