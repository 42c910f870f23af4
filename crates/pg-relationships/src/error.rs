#[derive(Debug, Clone, thiserror::Error)]
pub enum ResolverError {
    #[error("database error while resolving relationship: {0}")]
    Database(String),
    #[error(transparent)]
    Build(#[from] pg_sql::BuildError),
}

impl From<sqlx::Error> for ResolverError {
    fn from(err: sqlx::Error) -> Self {
        ResolverError::Database(err.to_string())
    }
}
