use crate::filter::filter_input_name;
use crate::naming;
use async_graphql::dynamic::{InputObject, InputValue, TypeRef};
use pg_catalog::Table;
use pg_types::ScalarCategory;

/// Builds `<Table>WhereInput`: one field per column, each typed as that
/// column's scalar-category filter input (§4.6). The `or` list argument
/// lives on the query field itself, not on this type, per §4.6's
/// "an `or` list on every query field takes a list of `where` inputs."
pub fn build_where_input(table: &Table) -> InputObject {
    let mut input = InputObject::new(naming::where_input_name(&table.name));
    for column in &table.columns {
        let category = ScalarCategory::of(&column.field_type);
        let filter_name = per_column_filter_name(&column.field_type, category);
        input = input.field(InputValue::new(column.name.clone(), TypeRef::named(filter_name)));
    }
    input
}

/// Enum/composite filters are typed per declared name (their operator set
/// doesn't vary, but their value type does); every other category shares one
/// filter input type.
fn per_column_filter_name(field_type: &pg_types::FieldType, category: ScalarCategory) -> String {
    match field_type {
        pg_types::FieldType::Enum(name) => format!("{}Filter", naming::pascal_case(name)),
        pg_types::FieldType::Composite(name) => format!("{}Filter", naming::pascal_case(name)),
        _ => filter_input_name(category).to_string(),
    }
}
