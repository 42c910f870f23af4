use crate::error::EngineError;
use crate::mutations;
use crate::query;
use crate::relationships::RelationshipResolver;
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use pg_catalog::{CatalogReflector, CatalogSnapshot, Table};
use pg_cdc::{CdcMessage, CdcRegistry};
use pg_schema::{CdcSource, CdcSourceError, ChangeEvent, ConnectionPage, ExecutorError, QueryExecutor};
use pg_sql::Row;
use sqlx::PgPool;
use std::sync::Arc;

/// The Query Compiler of §4.7: the single object every GraphQL field is
/// resolved through. It owns nothing the catalog or CDC registry doesn't
/// already own — just the pool handle and the per-schema reflector — and
/// delegates every operation to the free functions in [`query`]/[`mutations`]
/// once it has resolved `table` against the current snapshot.
pub struct Engine {
    pool: PgPool,
    reflector: Arc<CatalogReflector>,
    schema: String,
    relationships: RelationshipResolver,
}

impl Engine {
    pub fn new(pool: PgPool, reflector: Arc<CatalogReflector>, schema: impl Into<String>, supports_row_value_in: bool) -> Self {
        Self {
            relationships: RelationshipResolver::new(pool.clone(), supports_row_value_in),
            pool,
            reflector,
            schema: schema.into(),
        }
    }

    async fn snapshot(&self) -> Result<Arc<CatalogSnapshot>, EngineError> {
        self.reflector.reflect(&self.schema).await.map_err(EngineError::from)
    }

    fn resolve<'s>(snapshot: &'s CatalogSnapshot, table: &str) -> Result<&'s Table, EngineError> {
        snapshot.table(table).ok_or_else(|| EngineError::TableNotFound(table.to_string()))
    }
}

#[async_trait]
impl QueryExecutor for Engine {
    async fn list(&self, table: &str, args: serde_json::Value) -> Result<Vec<Row>, ExecutorError> {
        let snapshot = self.snapshot().await?;
        let t = Self::resolve(&snapshot, table)?;
        Ok(query::list(&self.pool, &snapshot, t, args).await?)
    }

    async fn connection(&self, table: &str, args: serde_json::Value) -> Result<ConnectionPage, ExecutorError> {
        let snapshot = self.snapshot().await?;
        let t = Self::resolve(&snapshot, table)?;
        Ok(query::connection(&self.pool, &snapshot, t, args).await?)
    }

    async fn relationship_one(&self, table: &str, parent: &Row, fk_field: &str) -> Result<Option<Row>, ExecutorError> {
        let snapshot = self.snapshot().await?;
        Ok(self.relationships.one(&snapshot, table, parent, fk_field).await?)
    }

    async fn relationship_many(&self, table: &str, parent: &Row, fk_field: &str) -> Result<Vec<Row>, ExecutorError> {
        let snapshot = self.snapshot().await?;
        Ok(self.relationships.many(&snapshot, table, parent, fk_field).await?)
    }

    async fn create(&self, table: &str, input: serde_json::Value) -> Result<Row, ExecutorError> {
        let snapshot = self.snapshot().await?;
        let t = Self::resolve(&snapshot, table)?;
        Ok(mutations::create(&self.pool, &snapshot, t, input).await?)
    }

    async fn bulk_create(&self, table: &str, inputs: Vec<serde_json::Value>) -> Result<Vec<Row>, ExecutorError> {
        let snapshot = self.snapshot().await?;
        let t = Self::resolve(&snapshot, table)?;
        Ok(mutations::bulk_create(&self.pool, &snapshot, t, inputs).await?)
    }

    async fn update(&self, table: &str, input: serde_json::Value) -> Result<Row, ExecutorError> {
        let snapshot = self.snapshot().await?;
        let t = Self::resolve(&snapshot, table)?;
        Ok(mutations::update(&self.pool, &snapshot, t, input).await?)
    }

    async fn delete(&self, table: &str, input: serde_json::Value) -> Result<bool, ExecutorError> {
        let snapshot = self.snapshot().await?;
        let t = Self::resolve(&snapshot, table)?;
        Ok(mutations::delete(&self.pool, &snapshot, t, input).await?)
    }

    async fn create_with_relationships(&self, table: &str, input: serde_json::Value) -> Result<Row, ExecutorError> {
        let snapshot = self.snapshot().await?;
        let t = Self::resolve(&snapshot, table)?;
        Ok(mutations::create_with_relationships(&self.pool, &snapshot, t, input).await?)
    }
}

/// Bridges the CDC fan-out registry (`pg-cdc`) to the seam `pg-schema`
/// streams subscription fields through, so neither crate depends on the
/// other. Translating `Begin`/`Commit` boundary events is unnecessary here —
/// they carry no row payload a GraphQL subscriber could use, so they're
/// filtered out rather than forwarded.
pub struct EngineCdcSource {
    registry: Arc<CdcRegistry>,
}

impl EngineCdcSource {
    pub fn new(registry: Arc<CdcRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl CdcSource for EngineCdcSource {
    async fn subscribe(&self, table: &str) -> Result<BoxStream<'static, ChangeEvent>, CdcSourceError> {
        let stream = self.registry.subscribe(table);
        Ok(stream.filter_map(|message| async move { translate(message) }).boxed())
    }
}

fn translate(message: CdcMessage) -> Option<ChangeEvent> {
    match message {
        CdcMessage::Event(event) => match event.kind {
            pg_cdc::EventKind::Begin | pg_cdc::EventKind::Commit => None,
            pg_cdc::EventKind::Insert { new } => Some(ChangeEvent::Insert(new)),
            pg_cdc::EventKind::Update { old, new } => Some(ChangeEvent::Update { before: old.unwrap_or_default(), after: new }),
            pg_cdc::EventKind::Delete { old } => Some(ChangeEvent::Delete(old)),
        },
        CdcMessage::Overflow { .. } => Some(ChangeEvent::Overflow),
    }
}

/// Binds one [`pg_sql::BoundValue`] onto a plain `sqlx::query(...)`, the
/// positional convention [`pg_sql::ParamList`] hands out placeholders under.
/// `query.rs`/`mutations.rs` share this rather than each re-deriving the
/// match arms `pg-relationships` already has privately.
pub(crate) fn bind_param<'q>(
    query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    param: &'q pg_sql::BoundValue,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    use pg_sql::BoundValue;
    match param {
        BoundValue::Null => query.bind(Option::<String>::None),
        BoundValue::Bool(b) => query.bind(*b),
        BoundValue::I32(v) => query.bind(*v),
        BoundValue::I64(v) => query.bind(*v),
        BoundValue::F64(v) => query.bind(*v),
        BoundValue::Uuid(u) => query.bind(*u),
        BoundValue::Text(s) => query.bind(s),
        BoundValue::Cast(s) => query.bind(s),
    }
}

/// Same binding as [`bind_param`], for the `query_scalar` used by
/// `totalCount` (§4.6).
pub(crate) fn bind_scalar_query<'q, O>(
    query: sqlx::query::QueryScalar<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments>,
    param: &'q pg_sql::BoundValue,
) -> sqlx::query::QueryScalar<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments> {
    use pg_sql::BoundValue;
    match param {
        BoundValue::Null => query.bind(Option::<String>::None),
        BoundValue::Bool(b) => query.bind(*b),
        BoundValue::I32(v) => query.bind(*v),
        BoundValue::I64(v) => query.bind(*v),
        BoundValue::F64(v) => query.bind(*v),
        BoundValue::Uuid(u) => query.bind(*u),
        BoundValue::Text(s) => query.bind(s),
        BoundValue::Cast(s) => query.bind(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;

    #[test]
    fn begin_and_commit_events_translate_to_nothing() {
        let begin = pg_cdc::Event { schema: "public".into(), table: "t".into(), lsn: 1, kind: pg_cdc::EventKind::Begin, received_at: Utc::now() };
        assert!(translate(CdcMessage::Event(begin)).is_none());
    }

    #[test]
    fn an_insert_event_translates_to_a_change_event_insert() {
        let event = pg_cdc::Event {
            schema: "public".into(),
            table: "t".into(),
            lsn: 1,
            kind: pg_cdc::EventKind::Insert { new: HashMap::new() },
            received_at: Utc::now(),
        };
        assert!(matches!(translate(CdcMessage::Event(event)), Some(ChangeEvent::Insert(_))));
    }

    #[test]
    fn an_overflow_message_translates_to_a_terminal_overflow_event() {
        assert!(matches!(translate(CdcMessage::Overflow { skipped: 4 }), Some(ChangeEvent::Overflow)));
    }
}
