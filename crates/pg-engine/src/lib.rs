//! Thin facade wiring the Catalog Reflector, Query Compiler, Schema
//! Projector, and CDC Fan-out behind one `Engine` an embedding service
//! constructs once at startup (§2, supplemented).

mod config;
mod engine;

pub use config::EngineConfig;
pub use engine::Engine;
pub use pg_cdc::SlotConfig;
pub use pg_compiler::EngineError;
