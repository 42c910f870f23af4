//! Orchestrates the Catalog Reflector, SQL Builder, Parameter Binder, and
//! Relationship Resolver per incoming GraphQL field selection: resolves the
//! target table, builds a `WhereTree`/pagination plan, compiles it to SQL,
//! executes it, and post-processes the rows (§4.7).
//!
//! This is the concrete [`pg_schema::QueryExecutor`]/[`pg_schema::CdcSource`]
//! the Schema Projector resolves every field through; everything else in
//! this crate is a building block [`executor::Engine`] composes.

mod args;
mod error;
mod executor;
mod mutations;
mod query;
mod relationships;

pub use error::EngineError;
pub use executor::{Engine, EngineCdcSource};
pub use relationships::RelationshipResolver;
