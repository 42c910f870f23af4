use crate::naming;
use async_graphql::dynamic::{Enum, EnumItem, InputObject, InputValue, TypeRef};
use pg_catalog::Table;

/// The shared `SortDirection` enum (`ASC`/`DESC`), built once and reused by
/// every table's `orderBy` input.
pub fn build_sort_direction_enum() -> Enum {
    Enum::new("SortDirection")
        .item(EnumItem::new("ASC"))
        .item(EnumItem::new("DESC"))
}

/// Builds `<Table>OrderBy`: one field per orderable column, each typed as
/// `SortDirection` (§4.6).
pub fn build_order_by_input(table: &Table) -> InputObject {
    let mut input = InputObject::new(naming::order_by_input_name(&table.name));
    for column in &table.columns {
        input = input.field(InputValue::new(column.name.clone(), TypeRef::named("SortDirection")));
    }
    input
}
