/// Raised when a catalog refresh fails. Per §4.1, the old snapshot (if any)
/// is retained on failure — this error only ever surfaces from `reflect()`,
/// it never invalidates an already-cached snapshot.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("introspection query failed while reflecting schema {schema:?}: {source}")]
    IntrospectionFailed {
        schema: String,
        #[source]
        source: sqlx::Error,
    },
}
