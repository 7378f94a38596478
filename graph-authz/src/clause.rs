//! Rule clause grammar and compilation into graph-pattern existence fragments.
//!
//! A rule is a list of clauses joined by `" or"`. Each clause is either a
//! direct relation (`owner`) or a chained relation (`member from Team`).
//! A chained clause reaches the object through an intermediate node whose
//! kind is the `subject_type` of the named relation, followed by a bounded
//! traversal of that relation.

use crate::cypher::{edge_label, node_label, quote_identifier};
use crate::error::{AuthzError, Result};
use crate::policy::Policy;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Maximum hop count of the chained part of a `from` clause
pub const MAX_TRAVERSAL_DEPTH: usize = 1000;

const RULE_SEPARATOR: &str = " or";
const CHAIN_SEPARATOR: &str = " from ";

/// Split a rule into its clauses.
///
/// The separator is the literal substring `" or"`, so a relation name that
/// starts with "or" after a space (e.g. `"owner ordinal"`) is split too.
/// Existing policies depend on this, do not tokenize on word boundaries.
pub fn split_rule(rule: &str) -> Vec<&str> {
    rule.split(RULE_SEPARATOR).collect()
}

/// A parsed rule clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    /// `relation`: an edge from the subject straight to the object
    Direct { relation: String },
    /// `relation from related_type`
    Chained {
        relation: String,
        related_type: String,
    },
}

impl Clause {
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();

        if !text.contains(CHAIN_SEPARATOR) {
            return Ok(Clause::Direct {
                relation: text.to_string(),
            });
        }

        let parts: Vec<&str> = text.split(CHAIN_SEPARATOR).map(str::trim).collect();
        match parts.as_slice() {
            [relation, related_type] if !relation.is_empty() && !related_type.is_empty() => {
                Ok(Clause::Chained {
                    relation: (*relation).to_string(),
                    related_type: (*related_type).to_string(),
                })
            }
            _ => Err(AuthzError::MalformedClause(text.to_string())),
        }
    }
}

/// Structured form of a compiled clause, labels already normalized
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pattern {
    /// `(s)-[:edge]->(o)`
    Direct { edge: String },
    /// `(s)-[:edge]-(:via)-[:chain*..max_depth]->(o)`
    Chained {
        edge: String,
        via: String,
        chain: String,
        max_depth: usize,
    },
}

/// Output of [`compile_clause`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledClause {
    /// Cypher existence fragment, aliased when auditable
    pub text: String,
    pub pattern: Pattern,
    pub alias: Option<String>,
}

/// Column alias of an auditable clause: the clause text with spaces as underscores
pub fn clause_alias(clause: &str) -> String {
    clause.trim().replace(' ', "_")
}

/// Compile one clause of an action rule defined on `object_type`
pub fn compile_clause(
    clause: &str,
    object_type: &str,
    auditable: bool,
    policy: &Policy,
) -> Result<CompiledClause> {
    let pattern = match Clause::parse(clause)? {
        Clause::Direct { relation } => {
            let relation = policy.relation(object_type, &relation).ok_or_else(|| {
                AuthzError::RelationNotFound {
                    object_type: object_type.to_string(),
                    relation,
                }
            })?;

            Pattern::Direct {
                edge: edge_label(&relation.name),
            }
        }
        Clause::Chained {
            relation,
            related_type,
        } => {
            let via = policy.relation(object_type, &related_type).ok_or_else(|| {
                AuthzError::RelationNotFound {
                    object_type: object_type.to_string(),
                    relation: related_type.clone(),
                }
            })?;

            Pattern::Chained {
                edge: edge_label(&relation),
                via: node_label(&via.subject_type),
                chain: edge_label(&related_type),
                max_depth: MAX_TRAVERSAL_DEPTH,
            }
        }
    };

    let mut text = match &pattern {
        Pattern::Direct { edge } => {
            format!("\tEXISTS((s)-[:{}]->(o))", quote_identifier(edge))
        }
        Pattern::Chained {
            edge,
            via,
            chain,
            max_depth,
        } => format!(
            "\tEXISTS((s)-[:{}]-(:{})-[:{}*..{}]->(o))",
            quote_identifier(edge),
            quote_identifier(via),
            quote_identifier(chain),
            max_depth
        ),
    };

    let alias = auditable.then(|| clause_alias(clause));
    if let Some(ref alias) = alias {
        text = format!("{} AS {}", text, quote_identifier(alias));
    }

    debug!("Compiled clause '{}' on {}: {}", clause.trim(), object_type, text.trim());

    Ok(CompiledClause {
        text,
        pattern,
        alias,
    })
}
