use std::time::Duration;

/// Everything an embedding service needs to stand up an [`crate::Engine`] —
/// no process-global singleton reads any of this; every constructor takes a
/// config value or clone (Design Notes).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub database_url: String,
    /// The Postgres schema (namespace) this engine reflects and serves.
    pub schema: String,
    /// How long a reflected [`pg_catalog::CatalogSnapshot`] is trusted before
    /// the next `reflect()` call rebuilds it.
    pub schema_ttl: Duration,
    /// Applied to every pooled connection via `SET statement_timeout`.
    pub statement_timeout: Duration,
    /// Wraps the whole GraphQL operation, not just one statement — covers a
    /// `createWithRelationships` chain or a deeply nested connection.
    pub operation_timeout: Duration,
    /// Per-table broadcast channel capacity; a subscriber more than this many
    /// events behind is dropped with a terminal `Overflow` message rather
    /// than being allowed to stall the publisher (§4.8/§5).
    pub cdc_overflow_threshold: usize,
    /// Maximum number of pooled Postgres connections.
    pub max_connections: u32,
}

impl EngineConfig {
    pub fn new(database_url: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            schema: schema.into(),
            schema_ttl: Duration::from_secs(30 * 60),
            statement_timeout: Duration::from_secs(30),
            operation_timeout: Duration::from_secs(60),
            cdc_overflow_threshold: 1024,
            max_connections: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_the_documented_knobs() {
        let config = EngineConfig::new("postgres://localhost/db", "public");
        assert_eq!(config.schema_ttl, Duration::from_secs(1800));
        assert_eq!(config.statement_timeout, Duration::from_secs(30));
        assert_eq!(config.operation_timeout, Duration::from_secs(60));
        assert_eq!(config.cdc_overflow_threshold, 1024);
    }
}
