use crate::config::EngineConfig;
use arc_swap::ArcSwap;
use async_graphql::dynamic::Schema;
use pg_catalog::CatalogReflector;
use pg_cdc::{CdcRegistry, IngestLoop, SlotConfig};
use pg_compiler::{Engine as CompiledEngine, EngineCdcSource, EngineError};
use pg_relationships::supports_row_value_in;
use pg_schema::{build_schema, CdcSource, QueryExecutor};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;

/// The one object an embedding service constructs at startup: owns the
/// catalog reflector, the compiled query executor, the CDC registry, and the
/// projected GraphQL schema, and rebuilds the schema whenever the catalog
/// changes (`reload_schema`). Grounded in
/// `control-plane-api::server::public::graphql::GraphQLSchema` plus
/// `aquadoggo`'s `GraphQLSchemaManager` — a single facade holding a
/// swappable schema behind an otherwise stateless request path.
pub struct Engine {
    pool: PgPool,
    config: EngineConfig,
    reflector: Arc<CatalogReflector>,
    cdc_registry: Arc<CdcRegistry>,
    compiler: Arc<CompiledEngine>,
    cdc_source: Arc<EngineCdcSource>,
    schema: ArcSwap<Schema>,
}

impl Engine {
    #[tracing::instrument(skip(config), fields(schema = %config.schema))]
    pub async fn connect(config: EngineConfig) -> Result<Self, EngineError> {
        let pool = build_pool(&config).await?;
        let reflector = Arc::new(CatalogReflector::new(pool.clone(), config.schema_ttl));
        let row_value_in = detect_row_value_in_support(&pool).await?;
        let compiler = Arc::new(CompiledEngine::new(
            pool.clone(),
            reflector.clone(),
            config.schema.clone(),
            row_value_in,
        ));
        let cdc_registry = Arc::new(CdcRegistry::new(config.cdc_overflow_threshold));
        let cdc_source = Arc::new(EngineCdcSource::new(cdc_registry.clone()));

        let snapshot = reflector.reflect(&config.schema).await?;
        let schema = project_schema(&snapshot, compiler.clone(), cdc_source.clone())?;

        Ok(Self {
            pool,
            config,
            reflector,
            cdc_registry,
            compiler,
            cdc_source,
            schema: ArcSwap::new(Arc::new(schema)),
        })
    }

    /// Executes one GraphQL request against the current schema snapshot,
    /// bounded by `EngineConfig.operation_timeout` (Open Question (c)).
    pub async fn execute(&self, request: impl Into<async_graphql::Request>) -> async_graphql::Response {
        let schema = self.schema.load_full();
        let request = request.into();
        match tokio::time::timeout(self.config.operation_timeout, schema.execute(request)).await {
            Ok(response) => response,
            Err(_elapsed) => {
                async_graphql::Response::from_errors(vec![async_graphql::ServerError::new(
                    EngineError::Timeout.to_string(),
                    None,
                )])
            }
        }
    }

    /// Drops the cached catalog snapshot and re-projects the GraphQL schema
    /// against a fresh one — the explicit cache-invalidation hook callers use
    /// after a DDL change instead of waiting out the TTL.
    #[tracing::instrument(skip(self))]
    pub async fn reload_schema(&self) -> Result<(), EngineError> {
        self.reflector.invalidate(Some(&self.config.schema));
        let snapshot = self.reflector.reflect(&self.config.schema).await?;
        let schema = project_schema(&snapshot, self.compiler.clone(), self.cdc_source.clone())?;
        self.schema.store(Arc::new(schema));
        tracing::info!(schema = %self.config.schema, "schema reloaded");
        Ok(())
    }

    /// Spawns the CDC ingest loop for `slot` onto the current runtime,
    /// publishing decoded changes to this engine's registry. The returned
    /// handle is cooperative cancellation only — dropping it does not stop
    /// the loop; abort it explicitly if the caller needs that.
    pub fn spawn_cdc_ingest(&self, slot: SlotConfig) -> tokio::task::JoinHandle<()> {
        let ingest = IngestLoop::new(
            self.pool.clone(),
            self.cdc_registry.clone(),
            self.reflector.clone(),
            self.config.schema.clone(),
            slot,
        );
        tokio::spawn(async move {
            if let Err(err) = ingest.run().await {
                tracing::error!(%err, "cdc ingest loop terminated");
            }
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn cdc_registry(&self) -> Arc<CdcRegistry> {
        self.cdc_registry.clone()
    }

    pub fn current_schema(&self) -> Arc<Schema> {
        self.schema.load_full()
    }
}

fn project_schema(
    snapshot: &pg_catalog::CatalogSnapshot,
    compiler: Arc<CompiledEngine>,
    cdc_source: Arc<EngineCdcSource>,
) -> Result<Schema, EngineError> {
    build_schema(
        snapshot,
        compiler as Arc<dyn QueryExecutor>,
        cdc_source as Arc<dyn CdcSource>,
    )
    .map_err(|err| EngineError::Database(err.to_string()))
}

async fn build_pool(config: &EngineConfig) -> Result<PgPool, EngineError> {
    let statement_timeout_ms = config.statement_timeout.as_millis() as i64;
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                sqlx::query(&format!("SET statement_timeout = {statement_timeout_ms}"))
                    .execute(conn)
                    .await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await
        .map_err(EngineError::from)
}

async fn detect_row_value_in_support(pool: &PgPool) -> Result<bool, EngineError> {
    let version_num: i32 = sqlx::query_scalar("SELECT current_setting('server_version_num')::int4")
        .fetch_one(pool)
        .await
        .map_err(EngineError::from)?;
    Ok(supports_row_value_in(version_num))
}
