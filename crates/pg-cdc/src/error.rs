#[derive(Debug, thiserror::Error)]
pub enum CdcError {
    #[error("CDC stream for table {table} closed unexpectedly: {reason}")]
    StreamFatal { table: String, reason: String },

    #[error("malformed replication payload for table {table}: {reason}")]
    MalformedPayload { table: String, reason: String },

    #[error("subscriber for table {table} fell behind and was dropped, skipping {skipped} events")]
    Overflow { table: String, skipped: u64 },

    #[error("unknown table {0} has no CDC buffer")]
    UnknownTable(String),
}
