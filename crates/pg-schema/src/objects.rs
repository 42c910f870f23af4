use crate::executor::QueryExecutor;
use crate::naming;
use crate::type_ref::field_type_ref;
use async_graphql::dynamic::{Field, FieldFuture, FieldValue, Object, TypeRef};
use async_graphql::{Error, Value};
use pg_catalog::{CatalogSnapshot, Table};
use pg_sql::Row;
use std::sync::Arc;

fn row_value(row: &Row, column: &str) -> Value {
    row.get(column)
        .and_then(|v| Value::from_json(v.clone()).ok())
        .unwrap_or(Value::Null)
}

/// Builds the object type for one table/view: one field per column plus one
/// relationship field per foreign key, in either direction (§4.6).
pub fn build_object_type(table: &Table, snapshot: &CatalogSnapshot, executor: Arc<dyn QueryExecutor>) -> Object {
    let mut object = Object::new(naming::object_type_name(&table.name));

    for column in &table.columns {
        let column_name = column.name.clone();
        let type_ref = field_type_ref(&column.field_type, column.nullable);
        object = object.field(Field::new(column.name.clone(), type_ref, move |ctx| {
            let column_name = column_name.clone();
            FieldFuture::new(async move {
                let row = ctx.parent_value.try_downcast_ref::<Row>()?;
                Ok(Some(FieldValue::value(row_value(row, &column_name))))
            })
        }));
    }

    for fk in table.outgoing() {
        let field_name = naming::camel_case(&fk.referenced_table);
        let type_name = naming::object_type_name(&fk.referenced_table);
        let referenced_table = fk.referenced_table.clone();
        let fk_field = fk.constraint_name.clone();
        let exec = executor.clone();
        object = object.field(Field::new(field_name, TypeRef::named(type_name), move |ctx| {
            let referenced_table = referenced_table.clone();
            let fk_field = fk_field.clone();
            let exec = exec.clone();
            FieldFuture::new(async move {
                let row = ctx.parent_value.try_downcast_ref::<Row>()?;
                match exec
                    .relationship_one(&referenced_table, row, &fk_field)
                    .await
                    .map_err(|e| Error::new(e.0))?
                {
                    Some(related) => Ok(Some(FieldValue::owned_any(related))),
                    None => Ok(None),
                }
            })
        }));
    }

    for (referencing, fk) in snapshot.referencing(&table.name) {
        let field_name = format!("{}s", naming::camel_case(&referencing.name));
        let type_name = naming::object_type_name(&referencing.name);
        let referencing_table = referencing.name.clone();
        let fk_field = fk.constraint_name.clone();
        let exec = executor.clone();
        object = object.field(Field::new(
            field_name,
            TypeRef::List(Box::new(TypeRef::named(type_name))),
            move |ctx| {
                let referencing_table = referencing_table.clone();
                let fk_field = fk_field.clone();
                let exec = exec.clone();
                FieldFuture::new(async move {
                    let row = ctx.parent_value.try_downcast_ref::<Row>()?;
                    let related = exec
                        .relationship_many(&referencing_table, row, &fk_field)
                        .await
                        .map_err(|e| Error::new(e.0))?;
                    Ok(Some(FieldValue::list(related.into_iter().map(FieldValue::owned_any))))
                })
            },
        ));
    }

    object
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_value_falls_back_to_null_for_a_missing_column() {
        let row = Row::new();
        assert!(matches!(row_value(&row, "missing"), Value::Null));
    }
}
