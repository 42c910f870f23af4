//! External-collaborator demonstration binary: axum HTTP transport, a
//! GraphiQL route, config loading, tracing init. Deliberately thin — HTTP
//! transport and authentication are the boundary this workspace hands off to
//! a real embedding service, not something reimplemented here.

use anyhow::Context;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::extract::State;
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::Router;
use clap::Parser;
use pg_cdc::SlotConfig;
use pg_engine::{Engine, EngineConfig};
use std::sync::Arc;
use std::time::Duration;

/// Serves the catalog-driven GraphQL schema for one Postgres schema.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// URL of the Postgres database to reflect and serve.
    #[clap(long = "database", env = "DATABASE_URL")]
    database_url: String,
    /// The Postgres schema (namespace) to expose.
    #[clap(long, env = "PG_SCHEMA", default_value = "public")]
    schema: String,
    /// Port to listen on for GraphQL HTTP/WS requests.
    #[clap(long, env = "PORT", default_value = "8080")]
    port: u16,
    /// How long a reflected catalog snapshot is trusted before rebuilding.
    #[clap(long, env = "SCHEMA_TTL_SECS", default_value = "1800")]
    schema_ttl_secs: u64,
    /// Per-connection `SET statement_timeout`, in seconds.
    #[clap(long, env = "STATEMENT_TIMEOUT_SECS", default_value = "30")]
    statement_timeout_secs: u64,
    /// Upper bound on one GraphQL operation's wall time, in seconds.
    #[clap(long, env = "OPERATION_TIMEOUT_SECS", default_value = "60")]
    operation_timeout_secs: u64,
    /// Per-table CDC broadcast channel capacity before a subscriber overflows.
    #[clap(long, env = "CDC_OVERFLOW_THRESHOLD", default_value = "1024")]
    cdc_overflow_threshold: usize,
    /// Logical replication slot to drain for CDC subscriptions. Omit to
    /// serve queries/mutations without live subscriptions.
    #[clap(long, env = "REPLICATION_SLOT")]
    replication_slot: Option<String>,
    /// Publication the replication slot was created against.
    #[clap(long, env = "PUBLICATION_NAME", default_value = "pg_graphql")]
    publication_name: String,
    /// How often to poll the replication slot for new changes, in milliseconds.
    #[clap(long, env = "SLOT_POLL_INTERVAL_MS", default_value = "500")]
    slot_poll_interval_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting tracing default failed");

    let args = Args::parse();
    tracing::info!(schema = %args.schema, port = args.port, "starting pg-server");

    let mut config = EngineConfig::new(args.database_url.clone(), args.schema.clone());
    config.schema_ttl = Duration::from_secs(args.schema_ttl_secs);
    config.statement_timeout = Duration::from_secs(args.statement_timeout_secs);
    config.operation_timeout = Duration::from_secs(args.operation_timeout_secs);
    config.cdc_overflow_threshold = args.cdc_overflow_threshold;

    let engine = Arc::new(Engine::connect(config).await.context("connecting engine to Postgres")?);

    if let Some(slot_name) = args.replication_slot.clone() {
        tracing::info!(slot = %slot_name, "starting CDC ingest loop");
        engine.spawn_cdc_ingest(SlotConfig {
            slot_name,
            publication_name: args.publication_name.clone(),
            poll_interval: Duration::from_millis(args.slot_poll_interval_ms),
        });
    }

    let router = Router::new()
        .route("/graphql", post(graphql_handler))
        .route("/graphiql", get(graphiql))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(engine);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", args.port))
        .await
        .context("failed to bind server port")?;
    tracing::info!(port = args.port, "listening");
    axum::serve(listener, router).await.context("server error")?;

    Ok(())
}

async fn graphql_handler(State(engine): State<Arc<Engine>>, req: GraphQLRequest) -> GraphQLResponse {
    engine.execute(req.into_inner()).await.into()
}

async fn graphiql() -> impl IntoResponse {
    Html(async_graphql::http::GraphiQLSource::build().endpoint("/graphql").finish())
}
