use crate::error::EngineError;
use async_graphql::dataloader::DataLoader;
use pg_catalog::{CatalogSnapshot, ForeignKey};
use pg_relationships::{local_key, JoinColumns, ManyToOneLoader, OneToManyLoader};
use pg_sql::Row;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Caches one [`DataLoader`] per constraint name per direction, so every
/// relationship field across every concurrently-resolving sibling shares the
/// same loader instance — the requirement behind "exactly one query per
/// relationship per parent batch" (§4.5, §8). Loaders live for the engine's
/// lifetime rather than per-request: `DataLoader` only batches calls that
/// overlap in time, so a stale entry just means a previous batch window,
/// never a stale result.
pub struct RelationshipResolver {
    pool: PgPool,
    supports_row_value_in: bool,
    many_to_one: Mutex<HashMap<String, Arc<DataLoader<ManyToOneLoader>>>>,
    one_to_many: Mutex<HashMap<String, Arc<DataLoader<OneToManyLoader>>>>,
}

impl RelationshipResolver {
    pub fn new(pool: PgPool, supports_row_value_in: bool) -> Self {
        Self {
            pool,
            supports_row_value_in,
            many_to_one: Mutex::new(HashMap::new()),
            one_to_many: Mutex::new(HashMap::new()),
        }
    }

    /// The outgoing (many-to-one) side: `parent` is the child row carrying
    /// `fk.local_columns`; `referenced_table` (the `table` argument on
    /// [`pg_schema::QueryExecutor::relationship_one`]) is where we look the
    /// matching row up.
    pub async fn one(
        &self,
        snapshot: &CatalogSnapshot,
        referenced_table: &str,
        parent: &Row,
        constraint_name: &str,
    ) -> Result<Option<Row>, EngineError> {
        let (_owner, fk) = snapshot
            .foreign_key(constraint_name)
            .ok_or_else(|| EngineError::ColumnNotFound(constraint_name.to_string()))?;

        let Some(key) = local_key(parent, &fk.local_columns) else {
            return Ok(None);
        };

        let loader = self.many_to_one_loader(snapshot, constraint_name, fk, referenced_table).await?;
        loader.load_one(key).await.map_err(|e| EngineError::Database(e.to_string()))
    }

    /// The reverse (one-to-many) side: `parent` is the referenced-side row;
    /// `referencing_table` (the `table` argument on
    /// [`pg_schema::QueryExecutor::relationship_many`]) is the table
    /// declaring `constraint_name` and the one we load children from.
    pub async fn many(
        &self,
        snapshot: &CatalogSnapshot,
        referencing_table: &str,
        parent: &Row,
        constraint_name: &str,
    ) -> Result<Vec<Row>, EngineError> {
        let (_owner, fk) = snapshot
            .foreign_key(constraint_name)
            .ok_or_else(|| EngineError::ColumnNotFound(constraint_name.to_string()))?;

        let Some(key) = local_key(parent, &fk.referenced_columns) else {
            return Ok(Vec::new());
        };

        let loader = self.one_to_many_loader(snapshot, constraint_name, fk, referencing_table).await?;
        Ok(loader.load_one(key).await.map_err(|e| EngineError::Database(e.to_string()))?.unwrap_or_default())
    }

    async fn many_to_one_loader(
        &self,
        snapshot: &CatalogSnapshot,
        constraint_name: &str,
        fk: &ForeignKey,
        referenced_table: &str,
    ) -> Result<Arc<DataLoader<ManyToOneLoader>>, EngineError> {
        let mut loaders = self.many_to_one.lock().await;
        if let Some(loader) = loaders.get(constraint_name) {
            return Ok(loader.clone());
        }
        let table = snapshot
            .table(referenced_table)
            .ok_or_else(|| EngineError::TableNotFound(referenced_table.to_string()))?;
        let field_types = fk
            .referenced_columns
            .iter()
            .map(|c| table.column(c).map(|col| col.field_type.clone()).ok_or_else(|| EngineError::ColumnNotFound(c.clone())))
            .collect::<Result<Vec<_>, _>>()?;

        let join = JoinColumns {
            schema: snapshot.schema.clone(),
            table: referenced_table.to_string(),
            columns: fk.referenced_columns.clone(),
            field_types,
            composites: Arc::new(snapshot.composite_registry()),
        };
        let loader = Arc::new(DataLoader::new(
            ManyToOneLoader { pool: self.pool.clone(), join, supports_row_value_in: self.supports_row_value_in },
            tokio::spawn,
        ));
        loaders.insert(constraint_name.to_string(), loader.clone());
        Ok(loader)
    }

    async fn one_to_many_loader(
        &self,
        snapshot: &CatalogSnapshot,
        constraint_name: &str,
        fk: &ForeignKey,
        referencing_table: &str,
    ) -> Result<Arc<DataLoader<OneToManyLoader>>, EngineError> {
        let mut loaders = self.one_to_many.lock().await;
        if let Some(loader) = loaders.get(constraint_name) {
            return Ok(loader.clone());
        }
        let table = snapshot
            .table(referencing_table)
            .ok_or_else(|| EngineError::TableNotFound(referencing_table.to_string()))?;
        let field_types = fk
            .local_columns
            .iter()
            .map(|c| table.column(c).map(|col| col.field_type.clone()).ok_or_else(|| EngineError::ColumnNotFound(c.clone())))
            .collect::<Result<Vec<_>, _>>()?;

        let join = JoinColumns {
            schema: snapshot.schema.clone(),
            table: referencing_table.to_string(),
            columns: fk.local_columns.clone(),
            field_types,
            composites: Arc::new(snapshot.composite_registry()),
        };
        let loader = Arc::new(DataLoader::new(
            OneToManyLoader { pool: self.pool.clone(), join, supports_row_value_in: self.supports_row_value_in },
            tokio::spawn,
        ));
        loaders.insert(constraint_name.to_string(), loader.clone());
        Ok(loader)
    }
}
