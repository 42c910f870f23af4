use async_trait::async_trait;
use pg_sql::Row;

/// The seam the Schema Projector resolves every generated field through. The
/// Query Compiler is the concrete implementation; keeping the trait here
/// lets this crate build and describe a schema without depending on the
/// compiler, and lets tests substitute a fake.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn list(&self, table: &str, args: serde_json::Value) -> Result<Vec<Row>, ExecutorError>;

    async fn connection(&self, table: &str, args: serde_json::Value) -> Result<ConnectionPage, ExecutorError>;

    async fn relationship_one(&self, table: &str, parent: &Row, fk_field: &str) -> Result<Option<Row>, ExecutorError>;

    async fn relationship_many(&self, table: &str, parent: &Row, fk_field: &str) -> Result<Vec<Row>, ExecutorError>;

    async fn create(&self, table: &str, input: serde_json::Value) -> Result<Row, ExecutorError>;

    async fn bulk_create(&self, table: &str, inputs: Vec<serde_json::Value>) -> Result<Vec<Row>, ExecutorError>;

    async fn update(&self, table: &str, input: serde_json::Value) -> Result<Row, ExecutorError>;

    async fn delete(&self, table: &str, input: serde_json::Value) -> Result<bool, ExecutorError>;

    async fn create_with_relationships(&self, table: &str, input: serde_json::Value) -> Result<Row, ExecutorError>;
}

#[derive(Debug, Clone)]
pub struct ConnectionPage {
    pub edges: Vec<(Row, String)>,
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub total_count: i64,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct ExecutorError(pub String);
