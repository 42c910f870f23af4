use async_trait::async_trait;
use futures::stream::BoxStream;
use pg_sql::Row;

/// The row-level change a [`CdcSource`] publishes for a subscribed table
/// (§4.8). This mirrors `pg_cdc::EventKind` without this crate depending on
/// `pg-cdc`; the engine facade is the only place both sides meet.
#[derive(Debug, Clone)]
pub enum ChangeEvent {
    Insert(Row),
    Update { before: Row, after: Row },
    Delete(Row),
    /// A subscriber fell far enough behind the table's change buffer that
    /// some events were dropped; the stream ends after this is delivered.
    Overflow,
}

/// The seam the Schema Projector streams subscription fields through. The
/// engine facade bridges this to the CDC fan-out registry; kept as a trait
/// here so this crate never depends on `pg-cdc` directly.
#[async_trait]
pub trait CdcSource: Send + Sync {
    async fn subscribe(&self, table: &str) -> Result<BoxStream<'static, ChangeEvent>, CdcSourceError>;
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct CdcSourceError(pub String);
