use crate::error::CdcError;
use crate::event::Payload;
use pg_catalog::CatalogSnapshot;

/// Logical replication delivers tuples positionally — one value per column
/// in catalog order, with no column names attached. This remaps a positional
/// tuple back into a name-keyed [`Payload`] using the live catalog snapshot.
///
/// Open Question (b): the source's positional remap depends on live catalog
/// state, and behavior during a DDL change mid-stream is unspecified. We
/// resolve it conservatively: a tuple whose arity no longer matches the
/// snapshot's column count is a [`CdcError::MalformedPayload`], not a panic
/// or a best-effort partial remap, so a schema change that outruns catalog
/// refresh surfaces as one visible error event instead of silently
/// mislabeling columns.
pub fn remap_tuple(snapshot: &CatalogSnapshot, schema: &str, table: &str, values: Vec<serde_json::Value>) -> Result<Payload, CdcError> {
    if snapshot.schema != schema {
        return Err(CdcError::MalformedPayload {
            table: table.to_string(),
            reason: format!("event schema {schema} does not match catalog schema {}", snapshot.schema),
        });
    }
    let table_def = snapshot.table(table).ok_or_else(|| CdcError::UnknownTable(table.to_string()))?;

    if values.len() != table_def.columns.len() {
        return Err(CdcError::MalformedPayload {
            table: table.to_string(),
            reason: format!("tuple has {} values but catalog has {} columns (possible DDL change mid-stream)", values.len(), table_def.columns.len()),
        });
    }

    let mut payload = Payload::new();
    for (column, value) in table_def.columns.iter().zip(values.into_iter()) {
        payload.insert(column.name.clone(), value);
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pg_catalog::{Column, Table, TableKind};
    use pg_types::FieldType;
    use std::collections::HashMap;

    fn snapshot() -> CatalogSnapshot {
        let table = Table {
            name: "customer".into(),
            kind: TableKind::Base,
            columns: vec![
                Column { name: "id".into(), declared_type: "integer".into(), field_type: FieldType::Int32, nullable: false, primary_key: true, domain_of: None, ordinal: 0 },
                Column { name: "name".into(), declared_type: "text".into(), field_type: FieldType::Text, nullable: true, primary_key: false, domain_of: None, ordinal: 1 },
            ],
            foreign_keys: vec![],
        };
        let mut tables = HashMap::new();
        tables.insert("customer".to_string(), table);
        CatalogSnapshot { schema: "public".into(), tables, enums: HashMap::new(), composites: HashMap::new(), fetched_at: Utc::now() }
    }

    #[test]
    fn remaps_a_tuple_in_catalog_column_order() {
        let snapshot = snapshot();
        let payload = remap_tuple(&snapshot, "public", "customer", vec![serde_json::json!(1), serde_json::json!("ada")]).unwrap();
        assert_eq!(payload.get("id"), Some(&serde_json::json!(1)));
        assert_eq!(payload.get("name"), Some(&serde_json::json!("ada")));
    }

    #[test]
    fn arity_mismatch_is_a_malformed_payload_error_not_a_panic() {
        let snapshot = snapshot();
        let result = remap_tuple(&snapshot, "public", "customer", vec![serde_json::json!(1)]);
        assert!(matches!(result, Err(CdcError::MalformedPayload { .. })));
    }

    #[test]
    fn unknown_table_is_rejected() {
        let snapshot = snapshot();
        let result = remap_tuple(&snapshot, "public", "missing", vec![]);
        assert!(matches!(result, Err(CdcError::UnknownTable(_))));
    }
}
