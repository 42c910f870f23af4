use crate::naming;
use crate::type_ref::field_type_ref;
use async_graphql::dynamic::{InputObject, InputValue, TypeRef};
use pg_catalog::Table;

/// Builds `<Table>CreateInput`: one optional field per non-generated column.
/// (The catalog doesn't currently distinguish identity/generated columns
/// from ordinary ones, so every column is accepted; the database rejects an
/// attempt to set a generated column.)
pub fn build_create_input(table: &Table) -> InputObject {
    let mut input = InputObject::new(naming::create_input_name(&table.name));
    for column in &table.columns {
        input = input.field(InputValue::new(column.name.clone(), field_type_ref(&column.field_type, true)));
    }
    input
}

/// `<Table>UpdateInput`: primary-key columns are required (they select the
/// row); every other column is optional (§4.7 "update").
pub fn build_update_input(table: &Table) -> InputObject {
    let mut input = InputObject::new(naming::update_input_name(&table.name));
    for column in &table.columns {
        let nullable = !column.primary_key;
        input = input.field(InputValue::new(column.name.clone(), field_type_ref(&column.field_type, nullable)));
    }
    input
}

/// `<Table>CreateWithRelationshipsInput`: the table's own create fields plus
/// one `<relationship>_connect` / `<relationship>_create` field per outgoing
/// foreign key, and one `<relationship>_createMany` field per table that
/// references this one, all recognized by suffix (§4.6).
pub fn build_create_with_relationships_input(table: &Table, children: &[&Table]) -> InputObject {
    let mut input = InputObject::new(naming::create_with_relationships_input_name(&table.name));
    for column in &table.columns {
        input = input.field(InputValue::new(column.name.clone(), field_type_ref(&column.field_type, true)));
    }
    for fk in table.outgoing() {
        let base = naming::camel_case(&fk.referenced_table);
        input = input
            .field(InputValue::new(format!("{base}_connect"), TypeRef::named(TypeRef::ID)))
            .field(InputValue::new(
                format!("{base}_create"),
                TypeRef::named(naming::create_input_name(&fk.referenced_table)),
            ));
    }
    for child in children {
        let base = naming::camel_case(&child.name);
        input = input.field(InputValue::new(
            format!("{base}_createMany"),
            TypeRef::List(Box::new(TypeRef::named(naming::create_input_name(&child.name)))),
        ));
    }
    input
}

/// `delete<Table>` takes just the primary key.
pub fn build_delete_input(table: &Table) -> InputObject {
    let mut input = InputObject::new(format!("{}DeleteInput", naming::pascal_case(&table.name)));
    for column in table.primary_key_columns() {
        input = input.field(InputValue::new(column.name.clone(), field_type_ref(&column.field_type, false)));
    }
    input
}
