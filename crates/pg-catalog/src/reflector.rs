use crate::error::CatalogError;
use crate::model::{
    CatalogSnapshot, Column, CompositeAttribute, CompositeType, EnumType, ForeignKey, Table,
    TableKind,
};
use crate::queries;
use arc_swap::ArcSwap;
use pg_types::map_declared_type;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Produces and caches a [`CatalogSnapshot`] per schema namespace (§4.1).
///
/// The cache is an [`ArcSwap`] so readers never observe a half-built
/// snapshot and never block behind a rebuild of a *different* schema
/// (Design Notes). A rebuild of the *same* schema is serialized through a
/// per-schema async mutex so concurrent callers don't issue the introspection
/// queries twice.
pub struct CatalogReflector {
    pool: PgPool,
    ttl: Duration,
    cache: ArcSwap<HashMap<String, Arc<CatalogSnapshot>>>,
    rebuild_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl CatalogReflector {
    pub fn new(pool: PgPool, ttl: Duration) -> Self {
        Self {
            pool,
            ttl,
            cache: ArcSwap::new(Arc::new(HashMap::new())),
            rebuild_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached snapshot for `schema` if it is still within the
    /// TTL, otherwise rebuilds it.
    #[tracing::instrument(skip(self))]
    pub async fn reflect(&self, schema: &str) -> Result<Arc<CatalogSnapshot>, CatalogError> {
        if let Some(snap) = self.cache.load().get(schema) {
            if !self.is_stale(snap) {
                return Ok(snap.clone());
            }
        }

        let lock = self.rebuild_lock_for(schema).await;
        let _guard = lock.lock().await;

        // Another task may have rebuilt it while we waited for the lock.
        if let Some(snap) = self.cache.load().get(schema) {
            if !self.is_stale(snap) {
                return Ok(snap.clone());
            }
        }

        tracing::debug!(schema, "reflecting catalog snapshot");
        match self.rebuild(schema).await {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                let mut next = (**self.cache.load()).clone();
                next.insert(schema.to_string(), snapshot.clone());
                self.cache.store(Arc::new(next));
                Ok(snapshot)
            }
            Err(err) => {
                tracing::warn!(schema, error = %err, "catalog refresh failed, retaining previous snapshot");
                Err(err)
            }
        }
    }

    /// Drops cached snapshots. `None` clears every namespace.
    pub fn invalidate(&self, schema: Option<&str>) {
        match schema {
            Some(schema) => {
                let mut next = (**self.cache.load()).clone();
                next.remove(schema);
                self.cache.store(Arc::new(next));
            }
            None => self.cache.store(Arc::new(HashMap::new())),
        }
    }

    fn is_stale(&self, snapshot: &CatalogSnapshot) -> bool {
        let age = chrono::Utc::now().signed_duration_since(snapshot.fetched_at);
        age.to_std().map(|age| age > self.ttl).unwrap_or(false)
    }

    async fn rebuild_lock_for(&self, schema: &str) -> Arc<Mutex<()>> {
        let mut locks = self.rebuild_locks.lock().await;
        locks
            .entry(schema.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn rebuild(&self, schema: &str) -> Result<CatalogSnapshot, CatalogError> {
        let map_err = |source: sqlx::Error| CatalogError::IntrospectionFailed {
            schema: schema.to_string(),
            source,
        };

        let raw_tables = queries::load_tables(&self.pool, schema)
            .await
            .map_err(map_err)?;
        let table_names: Vec<String> = raw_tables.iter().map(|t| t.name.clone()).collect();

        let (raw_columns, pks, raw_fks, raw_enums, raw_composites) = tokio::try_join!(
            queries::load_columns(&self.pool, schema, &table_names),
            queries::load_primary_keys(&self.pool, schema),
            queries::load_foreign_keys(&self.pool, schema),
            queries::load_enum_types(&self.pool, schema),
            queries::load_composite_types(&self.pool, schema),
        )
        .map_err(map_err)?;

        let enum_names: Vec<String> = {
            let mut names: Vec<String> = raw_enums.iter().map(|e| e.name.clone()).collect();
            names.dedup();
            names
        };
        let composite_names: Vec<String> = {
            let mut names: Vec<String> = raw_composites.iter().map(|c| c.type_name.clone()).collect();
            names.dedup();
            names
        };

        let mut columns_by_table: HashMap<String, Vec<Column>> = HashMap::new();
        for raw in raw_columns {
            let is_pk = pks
                .get(&raw.table_name)
                .map(|cols| cols.contains(&raw.column_name))
                .unwrap_or(false);
            let field_type = map_declared_type(&raw.declared_type, &enum_names, &composite_names);
            columns_by_table
                .entry(raw.table_name)
                .or_default()
                .push(Column {
                    name: raw.column_name,
                    declared_type: raw.declared_type,
                    field_type,
                    nullable: raw.nullable,
                    primary_key: is_pk,
                    domain_of: raw.domain_of,
                    ordinal: raw.ordinal,
                });
        }

        let mut fks_by_table: HashMap<String, Vec<ForeignKey>> = HashMap::new();
        for raw in raw_fks {
            fks_by_table
                .entry(raw.table_name)
                .or_default()
                .push(ForeignKey {
                    constraint_name: raw.constraint_name,
                    local_columns: raw.local_columns,
                    referenced_table: raw.referenced_table,
                    referenced_columns: raw.referenced_columns,
                });
        }

        let mut tables = HashMap::new();
        for raw in raw_tables {
            let kind = if !raw.is_view {
                TableKind::Base
            } else if raw.is_materialized {
                TableKind::MaterializedView
            } else {
                TableKind::View
            };
            let foreign_keys = if kind.is_view() {
                Vec::new()
            } else {
                fks_by_table.remove(&raw.name).unwrap_or_default()
            };
            tables.insert(
                raw.name.clone(),
                Table {
                    name: raw.name.clone(),
                    kind,
                    columns: columns_by_table.remove(&raw.name).unwrap_or_default(),
                    foreign_keys,
                },
            );
        }

        let mut enums: HashMap<String, EnumType> = HashMap::new();
        for raw in raw_enums {
            enums
                .entry(raw.name.clone())
                .or_insert_with(|| EnumType {
                    name: raw.name,
                    values: Vec::new(),
                })
                .values
                .push(raw.value);
        }

        let mut composites: HashMap<String, CompositeType> = HashMap::new();
        for raw in raw_composites {
            let field_type = map_declared_type(&raw.declared_type, &enum_names, &composite_names);
            composites
                .entry(raw.type_name.clone())
                .or_insert_with(|| CompositeType {
                    name: raw.type_name,
                    attributes: Vec::new(),
                })
                .attributes
                .push(CompositeAttribute {
                    name: raw.attr_name,
                    declared_type: raw.declared_type,
                    field_type,
                    nullable: raw.nullable,
                });
        }

        Ok(CatalogSnapshot {
            schema: schema.to_string(),
            tables,
            enums,
            composites,
            fetched_at: chrono::Utc::now(),
        })
    }
}
