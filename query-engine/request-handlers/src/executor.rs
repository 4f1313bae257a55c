use async_trait::async_trait;
use cypher_query_builder::CypherStatement;

/// One result row, keyed by column name.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Runs statements against the graph database. Implementations own the driver, session
/// and transaction handling.
#[async_trait]
pub trait QueryExecutor {
    async fn execute(&self, statement: &CypherStatement) -> crate::Result<Vec<Row>>;
}
