//! Fans a logical-replication stream out to per-table, multi-subscriber
//! broadcast buffers that back GraphQL subscription fields (§4.8).

mod error;
mod event;
mod ingest;
mod registry;
mod remap;

pub use error::CdcError;
pub use event::{Event, EventKind, Payload};
pub use ingest::{IngestLoop, SlotConfig};
pub use registry::{BufferStatus, CdcMessage, CdcRegistry};
pub use remap::remap_tuple;
