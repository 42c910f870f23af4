use crate::error::EngineError;
use crate::executor::bind_param;
use pg_catalog::{CatalogSnapshot, Table};
use pg_sql::{build_bulk_insert, build_delete, build_insert, build_update, bind_value, decode_row, BoundValue, Row};
use pg_types::FieldType;
use sqlx::{PgPool, Postgres, Transaction};

type Field = (String, BoundValue, FieldType);

/// `create`: filters null input fields, auto-fills non-nullable date/time
/// columns with the current time if absent, `INSERT … RETURNING *` (§4.7).
pub async fn create(pool: &PgPool, snapshot: &CatalogSnapshot, table: &Table, input: serde_json::Value) -> Result<Row, EngineError> {
    if input.is_null() {
        return Err(EngineError::InputRequired);
    }
    let mut fields = fields_from_input(table, &input, true)?;
    autofill_timestamps(table, &mut fields);
    let (sql, params) = build_insert(&snapshot.schema, &table.name, &fields);
    exec_insert_one(pool, &sql, &params, &snapshot.composite_registry()).await
}

/// `bulkCreate`: the union of every row's field names becomes the column
/// list; a row missing a field binds `NULL`; one multi-row
/// `INSERT … RETURNING *` (§4.7).
pub async fn bulk_create(pool: &PgPool, snapshot: &CatalogSnapshot, table: &Table, inputs: Vec<serde_json::Value>) -> Result<Vec<Row>, EngineError> {
    if inputs.is_empty() {
        return Err(EngineError::InputRequired);
    }
    let mut rows = Vec::with_capacity(inputs.len());
    for input in &inputs {
        let mut fields = fields_from_input(table, input, true)?;
        autofill_timestamps(table, &mut fields);
        rows.push(fields);
    }
    let (sql, params) = build_bulk_insert(&snapshot.schema, &table.name, &rows);
    exec_insert_many(pool, &sql, &params, &snapshot.composite_registry()).await
}

/// `update`: primary-key columns (possibly composite) are separated from
/// the fields being set; both must be non-empty. An empty result set maps
/// to `NotFound`, not a silent no-op (§4.7, §7).
pub async fn update(pool: &PgPool, snapshot: &CatalogSnapshot, table: &Table, input: serde_json::Value) -> Result<Row, EngineError> {
    let pk_columns = table.primary_key_columns();
    if pk_columns.is_empty() {
        return Err(EngineError::NoPrimaryKey(table.name.clone()));
    }
    let obj = input.as_object().ok_or(EngineError::InputRequired)?;

    let mut pk_fields = Vec::with_capacity(pk_columns.len());
    for column in &pk_columns {
        let value = obj.get(&column.name).ok_or(EngineError::InputRequired)?;
        pk_fields.push(bound_field(column.name.clone(), &column.field_type, value)?);
    }

    let mut update_fields = Vec::new();
    for (key, value) in obj {
        if pk_columns.iter().any(|c| &c.name == key) {
            continue;
        }
        let Some(column) = table.column(key) else { continue };
        update_fields.push(bound_field(column.name.clone(), &column.field_type, value)?);
    }
    if update_fields.is_empty() {
        return Err(EngineError::InputRequired);
    }

    let (sql, params) = build_update(&snapshot.schema, &table.name, &pk_fields, &update_fields);
    exec_update_one(pool, &sql, &params, &snapshot.composite_registry()).await
}

/// `delete`: by primary key, returning whether a row actually matched
/// (§4.7).
pub async fn delete(pool: &PgPool, snapshot: &CatalogSnapshot, table: &Table, input: serde_json::Value) -> Result<bool, EngineError> {
    let pk_columns = table.primary_key_columns();
    if pk_columns.is_empty() {
        return Err(EngineError::NoPrimaryKey(table.name.clone()));
    }
    let obj = input.as_object().ok_or(EngineError::InputRequired)?;

    let mut pk_fields = Vec::with_capacity(pk_columns.len());
    for column in &pk_columns {
        let value = obj.get(&column.name).ok_or(EngineError::InputRequired)?;
        pk_fields.push(bound_field(column.name.clone(), &column.field_type, value)?);
    }

    let (sql, params) = build_delete(&snapshot.schema, &table.name, &pk_fields);
    let mut query = sqlx::query(&sql);
    for param in &params {
        query = bind_param(query, param);
    }
    let deleted = query.fetch_optional(pool).await.map_err(EngineError::from)?;
    Ok(deleted.is_some())
}

/// `createWithRelationships`: runs the parent insert, every `_connect`/
/// `_create` resolution, and every `_createMany` child insert inside one
/// transaction, rolling the whole thing back on the first failure (§4.7).
pub async fn create_with_relationships(pool: &PgPool, snapshot: &CatalogSnapshot, table: &Table, input: serde_json::Value) -> Result<Row, EngineError> {
    if input.is_null() {
        return Err(EngineError::InputRequired);
    }
    let obj = input.as_object().cloned().ok_or(EngineError::InputRequired)?;

    let mut tx = pool.begin().await.map_err(EngineError::from)?;
    let row = match create_with_relationships_tx(&mut tx, snapshot, table, &obj).await {
        Ok(row) => row,
        Err(err) => {
            let _ = tx.rollback().await;
            return Err(EngineError::TransactionFailed(err.to_string()));
        }
    };
    tx.commit().await.map_err(EngineError::from)?;
    Ok(row)
}

fn create_with_relationships_tx<'a>(
    tx: &'a mut Transaction<'_, Postgres>,
    snapshot: &'a CatalogSnapshot,
    table: &'a Table,
    obj: &'a serde_json::Map<String, serde_json::Value>,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Row, EngineError>> + Send + 'a>> {
    Box::pin(async move {
        let mut fields = fields_from_input(table, &serde_json::Value::Object(obj.clone()), true)?;
        autofill_timestamps(table, &mut fields);

        for fk in table.outgoing() {
            let base = relationship_base_name(&fk.referenced_table);

            if let Some(connect_value) = obj.get(&format!("{base}_connect")) {
                if fk.local_columns.len() != 1 {
                    return Err(EngineError::TypeMismatch {
                        value: connect_value.to_string(),
                        column_type: "composite foreign key via _connect is not supported".into(),
                    });
                }
                let local_column = table
                    .column(&fk.local_columns[0])
                    .ok_or_else(|| EngineError::ColumnNotFound(fk.local_columns[0].clone()))?;
                upsert_field(&mut fields, bound_field(local_column.name.clone(), &local_column.field_type, connect_value)?);
            }

            if let Some(create_value) = obj.get(&format!("{base}_create")) {
                let referenced_table = snapshot
                    .table(&fk.referenced_table)
                    .ok_or_else(|| EngineError::TableNotFound(fk.referenced_table.clone()))?;
                let nested_obj = create_value.as_object().cloned().ok_or(EngineError::InputRequired)?;
                let created = create_with_relationships_tx(tx, snapshot, referenced_table, &nested_obj).await?;
                for (local_col, ref_col) in fk.local_columns.iter().zip(&fk.referenced_columns) {
                    let value = created.get(ref_col).cloned().unwrap_or(serde_json::Value::Null);
                    let local_column = table.column(local_col).ok_or_else(|| EngineError::ColumnNotFound(local_col.clone()))?;
                    upsert_field(&mut fields, bound_field(local_column.name.clone(), &local_column.field_type, &value)?);
                }
            }
        }

        let composites = snapshot.composite_registry();
        let (sql, params) = build_insert(&snapshot.schema, &table.name, &fields);
        let row = exec_insert_one_tx(tx, &sql, &params, &composites).await?;

        for (child, fk) in snapshot.referencing(&table.name) {
            let base = relationship_base_name(&child.name);
            let Some(serde_json::Value::Array(items)) = obj.get(&format!("{base}_createMany")) else {
                continue;
            };
            for item in items {
                let mut child_obj = item.as_object().cloned().unwrap_or_default();
                for (local_col, ref_col) in fk.local_columns.iter().zip(&fk.referenced_columns) {
                    let value = row.get(ref_col).cloned().unwrap_or(serde_json::Value::Null);
                    child_obj.insert(local_col.clone(), value);
                }
                let mut child_fields = fields_from_input(child, &serde_json::Value::Object(child_obj), true)?;
                autofill_timestamps(child, &mut child_fields);
                let (child_sql, child_params) = build_insert(&snapshot.schema, &child.name, &child_fields);
                exec_insert_one_tx(tx, &child_sql, &child_params, &composites).await?;
            }
        }

        Ok(row)
    })
}

/// Mirrors `pg_schema::naming::camel_case`, which is how the create-with-
/// relationships input names its `_connect`/`_create`/`_createMany` fields;
/// duplicated here rather than exposed publicly from `pg-schema` to avoid a
/// dependency cycle (the schema crate depends on nothing above it).
fn relationship_base_name(table_name: &str) -> String {
    let mut pascal = String::new();
    for part in table_name.split(|c: char| c == '_' || c == '-').filter(|p| !p.is_empty()) {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            pascal.push(first.to_ascii_uppercase());
            pascal.push_str(chars.as_str());
        }
    }
    let mut chars = pascal.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

fn bound_field(name: String, field_type: &FieldType, value: &serde_json::Value) -> Result<Field, EngineError> {
    let bound = bind_value(field_type, value).map_err(EngineError::from)?;
    Ok((name, bound, field_type.clone()))
}

fn upsert_field(fields: &mut Vec<Field>, field: Field) {
    match fields.iter_mut().find(|(name, _, _)| *name == field.0) {
        Some(existing) => *existing = field,
        None => fields.push(field),
    }
}

/// Resolves `input`'s keys against `table`'s known columns, binding each
/// value. Keys that don't name a column (e.g. a `createWithRelationships`
/// `_connect`/`_create`/`_createMany` suffix field) are silently skipped
/// here and handled by the caller instead. When `skip_nulls` is set, a
/// present-but-null field is treated as "not supplied" so the database's own
/// default applies, rather than explicitly writing `NULL` (§4.7 "create").
fn fields_from_input(table: &Table, input: &serde_json::Value, skip_nulls: bool) -> Result<Vec<Field>, EngineError> {
    let obj = input.as_object().ok_or(EngineError::InputRequired)?;
    let mut fields = Vec::new();
    for (key, value) in obj {
        if skip_nulls && value.is_null() {
            continue;
        }
        let Some(column) = table.column(key) else { continue };
        fields.push(bound_field(column.name.clone(), &column.field_type, value)?);
    }
    Ok(fields)
}

/// Fills in non-nullable date/time columns the caller didn't supply with the
/// current time, so a `createdAt timestamptz not null` column doesn't force
/// every client to pass it explicitly (§4.7 "create").
fn autofill_timestamps(table: &Table, fields: &mut Vec<Field>) {
    let now = chrono::Utc::now().to_rfc3339();
    for column in &table.columns {
        let is_temporal = matches!(column.field_type, FieldType::Date | FieldType::Timestamp | FieldType::TimestampTz);
        if !column.nullable && is_temporal && !fields.iter().any(|(name, _, _)| name == &column.name) {
            fields.push((column.name.clone(), BoundValue::Cast(now.clone()), column.field_type.clone()));
        }
    }
}

async fn exec_insert_one<'e, E>(executor: E, sql: &str, params: &[BoundValue], composites: &pg_sql::CompositeRegistry) -> Result<Row, EngineError>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let mut query = sqlx::query(sql);
    for param in params {
        query = bind_param(query, param);
    }
    let row = query.fetch_one(executor).await.map_err(EngineError::from)?;
    decode_row(&row, composites).map_err(EngineError::from)
}

async fn exec_insert_one_tx(tx: &mut Transaction<'_, Postgres>, sql: &str, params: &[BoundValue], composites: &pg_sql::CompositeRegistry) -> Result<Row, EngineError> {
    exec_insert_one(&mut *tx, sql, params, composites).await
}

async fn exec_insert_many(pool: &PgPool, sql: &str, params: &[BoundValue], composites: &pg_sql::CompositeRegistry) -> Result<Vec<Row>, EngineError> {
    let mut query = sqlx::query(sql);
    for param in params {
        query = bind_param(query, param);
    }
    let rows = query.fetch_all(pool).await.map_err(EngineError::from)?;
    rows.iter().map(|r| decode_row(r, composites).map_err(EngineError::from)).collect()
}

async fn exec_update_one(pool: &PgPool, sql: &str, params: &[BoundValue], composites: &pg_sql::CompositeRegistry) -> Result<Row, EngineError> {
    let mut query = sqlx::query(sql);
    for param in params {
        query = bind_param(query, param);
    }
    match query.fetch_optional(pool).await.map_err(EngineError::from)? {
        Some(row) => decode_row(&row, composites).map_err(EngineError::from),
        None => Err(EngineError::NotFound),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pg_catalog::{Column, TableKind};

    fn customer_table() -> Table {
        Table {
            name: "customer".into(),
            kind: TableKind::Base,
            columns: vec![
                Column { name: "customer_id".into(), declared_type: "int4".into(), field_type: FieldType::Int32, nullable: false, primary_key: true, domain_of: None, ordinal: 0 },
                Column { name: "name".into(), declared_type: "text".into(), field_type: FieldType::Text, nullable: true, primary_key: false, domain_of: None, ordinal: 1 },
                Column { name: "created_at".into(), declared_type: "timestamptz".into(), field_type: FieldType::TimestampTz, nullable: false, primary_key: false, domain_of: None, ordinal: 2 },
            ],
            foreign_keys: vec![],
        }
    }

    #[test]
    fn null_fields_are_skipped_when_building_a_create_payload() {
        let table = customer_table();
        let input = serde_json::json!({ "name": serde_json::Value::Null, "created_at": "2024-01-01T00:00:00Z" });
        let fields = fields_from_input(&table, &input, true).unwrap();
        assert!(fields.iter().all(|(name, _, _)| name != "name"));
    }

    #[test]
    fn autofill_supplies_a_missing_non_nullable_timestamp() {
        let table = customer_table();
        let mut fields = vec![];
        autofill_timestamps(&table, &mut fields);
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].0, "created_at");
    }

    #[test]
    fn autofill_does_not_override_a_supplied_timestamp() {
        let table = customer_table();
        let mut fields = fields_from_input(&table, &serde_json::json!({ "created_at": "2024-06-01T00:00:00Z" }), true).unwrap();
        autofill_timestamps(&table, &mut fields);
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn relationship_base_name_matches_schema_camel_case() {
        assert_eq!(relationship_base_name("order_item"), "orderItem");
    }

    #[test]
    fn unknown_keys_are_silently_skipped_rather_than_rejected() {
        let table = customer_table();
        let input = serde_json::json!({ "name": "Ada", "customer_create": { "name": "nested" } });
        let fields = fields_from_input(&table, &input, true).unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].0, "name");
    }
}
