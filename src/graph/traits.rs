//! Core trait for graph database access.

use async_trait::async_trait;

use crate::error::AppError;
use crate::graph::row::{Params, Row};
use crate::render::PlanNode;

/// Whether a query may modify the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    Write,
}

/// Executes Cypher queries against a graph database.
///
/// Implemented by the Neo4j client and by test doubles.
#[async_trait]
pub trait CypherExecutor: Send + Sync {
    /// Executes a Cypher query and collects its result rows.
    ///
    /// # Arguments
    ///
    /// * `cypher` - The Cypher query string
    /// * `params` - Parameters to bind to the query
    /// * `mode` - Routing hint; write queries go to a writer session
    async fn execute_cypher(
        &self,
        cypher: &str,
        params: Params,
        mode: AccessMode,
    ) -> Result<Vec<Row>, AppError>;

    /// Compiles a query without running it and returns the root of its plan.
    async fn explain_cypher(&self, cypher: &str) -> Result<PlanNode, AppError>;
}
