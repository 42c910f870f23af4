//! Projects a catalog snapshot into a GraphQL schema whose shape is only
//! knowable at runtime, using `async_graphql::dynamic` rather than its
//! derive macros (§4.6).

mod builder;
mod cdc_source;
mod connections;
mod executor;
mod filter;
mod mutations;
mod naming;
mod objects;
mod orderby;
mod type_ref;
mod where_input;

pub use builder::build_schema;
pub use cdc_source::{CdcSource, CdcSourceError, ChangeEvent};
pub use connections::Edge;
pub use executor::{ConnectionPage, ExecutorError, QueryExecutor};
pub use naming::{
    connection_field_name, connection_type_name, object_type_name, order_by_input_name, query_field_name,
    where_input_name,
};
