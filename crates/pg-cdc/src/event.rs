use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// A decoded row: column name to JSON-ish value, exactly the shape the rest
/// of the engine already uses for query results (§3 CDC entities).
pub type Payload = HashMap<String, serde_json::Value>;

/// The kind of change carried by an [`Event`]. `Begin`/`Commit` bracket a
/// transaction's events but carry no row payload of their own.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Begin,
    Commit,
    Insert { new: Payload },
    Update { old: Option<Payload>, new: Payload },
    Delete { old: Payload },
}

/// One row-level (or transaction-boundary) change, tagged with its source
/// LSN so subscribers can verify ordering (§8 "CDC order").
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub schema: String,
    pub table: String,
    pub lsn: u64,
    pub kind: EventKind,
    pub received_at: DateTime<Utc>,
}

impl Event {
    pub fn insert(schema: impl Into<String>, table: impl Into<String>, lsn: u64, new: Payload, received_at: DateTime<Utc>) -> Self {
        Self { schema: schema.into(), table: table.into(), lsn, kind: EventKind::Insert { new }, received_at }
    }

    pub fn update(
        schema: impl Into<String>,
        table: impl Into<String>,
        lsn: u64,
        old: Option<Payload>,
        new: Payload,
        received_at: DateTime<Utc>,
    ) -> Self {
        Self { schema: schema.into(), table: table.into(), lsn, kind: EventKind::Update { old, new }, received_at }
    }

    pub fn delete(schema: impl Into<String>, table: impl Into<String>, lsn: u64, old: Payload, received_at: DateTime<Utc>) -> Self {
        Self { schema: schema.into(), table: table.into(), lsn, kind: EventKind::Delete { old }, received_at }
    }
}
