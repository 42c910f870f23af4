/// Errors raised while binding a value (§4.4) or compiling SQL (§4.3). These
/// map onto the corresponding kinds in §7's error taxonomy; `pg-compiler`
/// folds them into the single `EngineError` surfaced to callers.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("column {0:?} is not known on this table")]
    ColumnNotFound(String),
    #[error("cursor is not valid for the current orderBy")]
    InvalidCursor,
    #[error("a cursor (first/after/last/before) was given without an orderBy")]
    CursorRequiresOrderBy,
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
}
