use pg_schema::ExecutorError;

/// The closed error taxonomy every lower-crate error folds into (§7). Kinds,
/// not type names: a caller matching on this enum sees exactly the
/// vocabulary the spec's error table names, regardless of which crate
/// actually detected the problem.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("table or view {0:?} is not known")]
    TableNotFound(String),
    #[error("column {0:?} is not known on this table")]
    ColumnNotFound(String),
    #[error("cursor is not valid for the current orderBy")]
    InvalidCursor,
    #[error("a cursor (first/after/last/before) was given without an orderBy")]
    CursorRequiresOrderBy,
    #[error("mutation requires an `input` or `inputs` argument")]
    InputRequired,
    #[error("table {0:?} has no primary key, so it cannot be updated or deleted by key")]
    NoPrimaryKey(String),
    #[error("no row matched the given primary key")]
    NotFound,
    #[error("value {value} cannot be coerced to column type {column_type}")]
    TypeMismatch { value: String, column_type: String },
    #[error("value is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("value is not a valid UUID: {0}")]
    InvalidUuid(String),
    #[error("value is not a valid date/time: {0}")]
    InvalidDate(String),
    #[error("value is not a valid network address: {0}")]
    InvalidNetwork(String),
    #[error("catalog refresh for schema {schema:?} failed: {source}")]
    IntrospectionError { schema: String, #[source] source: pg_catalog::CatalogError },
    #[error("transaction failed and was rolled back: {0}")]
    TransactionFailed(String),
    #[error("operation timed out")]
    Timeout,
    #[error("operation was cancelled")]
    Cancelled,
    #[error("database error: {0}")]
    Database(String),
}

impl From<pg_sql::BuildError> for EngineError {
    fn from(err: pg_sql::BuildError) -> Self {
        use pg_sql::BuildError as B;
        match err {
            B::ColumnNotFound(name) => EngineError::ColumnNotFound(name),
            B::InvalidCursor => EngineError::InvalidCursor,
            B::CursorRequiresOrderBy => EngineError::CursorRequiresOrderBy,
            B::TypeMismatch { value, column_type } => EngineError::TypeMismatch { value, column_type },
            B::InvalidJson(s) => EngineError::InvalidJson(s),
            B::InvalidUuid(s) => EngineError::InvalidUuid(s),
            B::InvalidDate(s) => EngineError::InvalidDate(s),
            B::InvalidNetwork(s) => EngineError::InvalidNetwork(s),
        }
    }
}

impl From<pg_relationships::ResolverError> for EngineError {
    fn from(err: pg_relationships::ResolverError) -> Self {
        match err {
            pg_relationships::ResolverError::Database(s) => EngineError::Database(s),
            pg_relationships::ResolverError::Build(build) => build.into(),
        }
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::Database(err.to_string())
    }
}

impl From<pg_catalog::CatalogError> for EngineError {
    fn from(err: pg_catalog::CatalogError) -> Self {
        let schema = match &err {
            pg_catalog::CatalogError::IntrospectionFailed { schema, .. } => schema.clone(),
        };
        EngineError::IntrospectionError { schema, source: err }
    }
}

/// Adapts to the seam `pg-schema` resolves fields through, so the projected
/// schema never needs to know this crate's concrete error type.
impl From<EngineError> for ExecutorError {
    fn from(err: EngineError) -> Self {
        ExecutorError(err.to_string())
    }
}
