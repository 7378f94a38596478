//! Relationship-based access control over a property graph
//!
//! This crate compiles a declarative authorization policy into parameterized
//! graph queries and maps their results back into typed answers:
//! - Point checks with a per-clause audit trail
//! - Filtering of every object a subject may act on
//! - Paginated filtering with a cached total count
//!
//! # Core Concepts
//!
//! - **Policy**: the types of a namespace with their relations and actions
//! - **Relation**: an edge kind from a subject type to an object type
//! - **Action**: a rule made of clauses joined by `or`
//! - **Clause**: either a direct relation (`owner`) or a chained one
//!   (`member from Team`) followed through a bounded traversal
//!
//! # Example
//!
//! ```rust
//! use graph_authz::{AccessEngine, InMemoryGraph, MokaCountCache, Object, ObjectType, Policy, Subject};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let policy = Policy::new("docs").with_type(
//!         ObjectType::new("Document")
//!             .with_relation("owner", "User")
//!             .with_action("read", "owner"),
//!     );
//!
//!     let graph = Arc::new(InMemoryGraph::new());
//!     graph.add_edge(("User", "1"), "OWNER", ("Document", "5"));
//!
//!     let cache = Arc::new(MokaCountCache::new(Duration::from_secs(300), 1_000));
//!     let engine = AccessEngine::new(graph, cache, Arc::new(policy));
//!
//!     let audits = engine
//!         .check_access(&Subject::new("User", "1"), "read", &Object::new("Document", "5"))
//!         .await?;
//!     assert!(audits[0].ok);
//!
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod clause;
pub mod config;
pub mod cypher;
pub mod engine;
pub mod error;
pub mod executor;
pub mod logging;
pub mod mapper;
pub mod memory;
pub mod models;
pub mod pagination;
pub mod policy;
pub mod query;

pub use cache::{CountCache, MokaCountCache};
pub use clause::{Clause, MAX_TRAVERSAL_DEPTH};
pub use config::*;
pub use engine::*;
pub use error::*;
pub use executor::{GraphExecutor, Row};
pub use memory::InMemoryGraph;
pub use models::*;
pub use pagination::{PaginatedQuery, Paginator};
pub use policy::*;
pub use query::GraphQuery;
