//! In-memory property graph for testing and development.
//!
//! Evaluates the [`QueryPlan`] attached to every compiled query instead of
//! parsing Cypher. Semantics follow the graph engine: an unmatched `MATCH`
//! yields no rows, while a count over no rows yields a single zero.

use crate::clause::Pattern;
use crate::error::AuthzError;
use crate::executor::{GraphExecutor, Row};
use crate::query::{
    GraphQuery, Projection, QueryPlan, ID_COLUMN, LIMIT_PARAM, OBJECT_ID_PARAM, SKIP_PARAM,
    SUBJECT_ID_PARAM, TOTAL_COLUMN,
};
use ahash::{AHashMap, AHashSet};
use async_trait::async_trait;
use parking_lot::RwLock;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::VecDeque;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Node {
    label: String,
    id: String,
}

#[derive(Default)]
struct GraphState {
    graph: DiGraph<Node, String>,
    index: AHashMap<(String, String), NodeIndex>,
}

impl GraphState {
    fn node(&self, label: &str, id: &str) -> Option<NodeIndex> {
        self.index.get(&(label.to_string(), id.to_string())).copied()
    }

    fn ensure_node(&mut self, label: &str, id: &str) -> NodeIndex {
        if let Some(idx) = self.node(label, id) {
            return idx;
        }
        let idx = self.graph.add_node(Node {
            label: label.to_string(),
            id: id.to_string(),
        });
        self.index.insert((label.to_string(), id.to_string()), idx);
        idx
    }

    fn has_edge(&self, from: NodeIndex, edge: &str, to: NodeIndex) -> bool {
        self.graph
            .edges_connecting(from, to)
            .any(|e| e.weight() == edge)
    }

    /// Nodes reachable from `subject` through `(s)-[:edge]-(:via)-[:chain*..max_depth]->`
    fn chained_targets(
        &self,
        subject: NodeIndex,
        edge: &str,
        via: &str,
        chain: &str,
        max_depth: usize,
    ) -> AHashSet<NodeIndex> {
        let mut seen = AHashSet::new();
        let mut queue = VecDeque::new();

        for direction in [Direction::Outgoing, Direction::Incoming] {
            for e in self.graph.edges_directed(subject, direction) {
                if e.weight() != edge {
                    continue;
                }
                let mid = match direction {
                    Direction::Outgoing => e.target(),
                    Direction::Incoming => e.source(),
                };
                let via_matches = self.graph.node_weight(mid).is_some_and(|n| n.label == via);
                if via_matches && seen.insert(mid) {
                    queue.push_back((mid, 0usize));
                }
            }
        }

        let mut reached = AHashSet::new();
        while let Some((node, depth)) = queue.pop_front() {
            for e in self.graph.edges_directed(node, Direction::Outgoing) {
                if e.weight() != chain {
                    continue;
                }
                let next = e.target();
                reached.insert(next);
                if seen.insert(next) && depth + 1 < max_depth {
                    queue.push_back((next, depth + 1));
                }
            }
        }
        reached
    }
}

/// Per-query evaluator that resolves each chained clause once
struct Evaluation<'a> {
    state: &'a GraphState,
    subject: NodeIndex,
    chained: Vec<Option<AHashSet<NodeIndex>>>,
}

impl<'a> Evaluation<'a> {
    fn new(state: &'a GraphState, subject: NodeIndex, plan: &QueryPlan) -> Self {
        let chained = plan
            .clauses
            .iter()
            .map(|clause| match &clause.pattern {
                Pattern::Direct { .. } => None,
                Pattern::Chained {
                    edge,
                    via,
                    chain,
                    max_depth,
                } => Some(state.chained_targets(subject, edge, via, chain, *max_depth)),
            })
            .collect();

        Self {
            state,
            subject,
            chained,
        }
    }

    fn clause_holds(&self, plan: &QueryPlan, position: usize, object: NodeIndex) -> bool {
        let Some(clause) = plan.clauses.get(position) else {
            return false;
        };
        match &clause.pattern {
            Pattern::Direct { edge } => self.state.has_edge(self.subject, edge, object),
            Pattern::Chained { .. } => self
                .chained
                .get(position)
                .and_then(Option::as_ref)
                .is_some_and(|targets| targets.contains(&object)),
        }
    }

    fn any_clause_holds(&self, plan: &QueryPlan, object: NodeIndex) -> bool {
        (0..plan.clauses.len()).any(|position| self.clause_holds(plan, position, object))
    }
}

/// Thread-safe in-memory graph implementing [`GraphExecutor`]
///
/// Nodes are keyed by `(label, id)`. Labels must already follow the query
/// conventions: capitalized node labels, upper-cased edge labels.
#[derive(Default)]
pub struct InMemoryGraph {
    state: RwLock<GraphState>,
}

impl InMemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, returns false if it already existed
    pub fn add_node(&self, label: &str, id: &str) -> bool {
        let mut state = self.state.write();
        if state.node(label, id).is_some() {
            return false;
        }
        state.ensure_node(label, id);
        true
    }

    /// Add a directed edge, creating missing endpoints
    pub fn add_edge(&self, from: (&str, &str), edge: &str, to: (&str, &str)) {
        let mut state = self.state.write();
        let source = state.ensure_node(from.0, from.1);
        let target = state.ensure_node(to.0, to.1);
        if !state.has_edge(source, edge, target) {
            state.graph.add_edge(source, target, edge.to_string());
        }
    }

    /// Remove a directed edge, returns false if it did not exist
    pub fn remove_edge(&self, from: (&str, &str), edge: &str, to: (&str, &str)) -> bool {
        let mut state = self.state.write();
        let (Some(source), Some(target)) = (state.node(from.0, from.1), state.node(to.0, to.1))
        else {
            return false;
        };
        let found = state
            .graph
            .edges_connecting(source, target)
            .find(|e| e.weight() == edge)
            .map(|e| e.id());
        match found {
            Some(edge_id) => state.graph.remove_edge(edge_id).is_some(),
            None => false,
        }
    }

    pub fn node_count(&self) -> usize {
        self.state.read().graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.state.read().graph.edge_count()
    }

    fn evaluate(&self, query: &GraphQuery) -> Result<Vec<Row>, AuthzError> {
        let plan = &query.plan;
        let state = self.state.read();

        let subject_id = string_param(query, SUBJECT_ID_PARAM)?;
        let subject = state.node(&plan.subject_label, subject_id);

        let objects: Vec<NodeIndex> = if plan.object_bound {
            let object_id = string_param(query, OBJECT_ID_PARAM)?;
            state
                .node(&plan.object_label, object_id)
                .into_iter()
                .collect()
        } else {
            state
                .graph
                .node_indices()
                .filter(|idx| {
                    state
                        .graph
                        .node_weight(*idx)
                        .is_some_and(|n| n.label == plan.object_label)
                })
                .collect()
        };

        let Some(subject) = subject else {
            return Ok(match plan.projection {
                Projection::CountDistinct => vec![Row::new().with(TOTAL_COLUMN, 0u64)],
                _ => Vec::new(),
            });
        };
        let evaluation = Evaluation::new(&state, subject, plan);

        let rows = match plan.projection {
            Projection::ClauseColumns => objects
                .iter()
                .map(|object| {
                    let mut row = Row::new();
                    for (position, clause) in plan.clauses.iter().enumerate() {
                        let alias = clause.alias.clone().unwrap_or_else(|| clause.text.clone());
                        row.insert(&alias, evaluation.clause_holds(plan, position, *object));
                    }
                    row
                })
                .collect(),
            Projection::DistinctIds => {
                let mut ids = AHashSet::new();
                let matching = objects
                    .iter()
                    .filter(|object| evaluation.any_clause_holds(plan, **object))
                    .filter_map(|object| state.graph.node_weight(*object).map(|n| n.id.clone()))
                    .filter(|id| ids.insert(id.clone()));

                let skip = usize_param(query, SKIP_PARAM)?.unwrap_or(0);
                let limit = usize_param(query, LIMIT_PARAM)?.unwrap_or(usize::MAX);
                matching
                    .skip(skip)
                    .take(limit)
                    .map(|id| Row::new().with(ID_COLUMN, id))
                    .collect()
            }
            Projection::CountDistinct => {
                let total = objects
                    .iter()
                    .filter(|object| evaluation.any_clause_holds(plan, **object))
                    .count();
                vec![Row::new().with(TOTAL_COLUMN, total as u64)]
            }
        };

        Ok(rows)
    }
}

fn string_param<'q>(query: &'q GraphQuery, name: &str) -> Result<&'q str, AuthzError> {
    query
        .param(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| AuthzError::QueryExecution(format!("missing string parameter ${}", name)))
}

fn usize_param(query: &GraphQuery, name: &str) -> Result<Option<usize>, AuthzError> {
    match query.param(name) {
        None => Ok(None),
        Some(value) => value
            .as_u64()
            .and_then(|v| usize::try_from(v).ok())
            .map(Some)
            .ok_or_else(|| {
                AuthzError::QueryExecution(format!("parameter ${} is not a row count", name))
            }),
    }
}

#[async_trait]
impl GraphExecutor for InMemoryGraph {
    async fn run(&self, query: &GraphQuery) -> Result<Vec<Row>, AuthzError> {
        let rows = self.evaluate(query)?;
        debug!("In-memory graph returned {} rows", rows.len());
        Ok(rows)
    }
}
