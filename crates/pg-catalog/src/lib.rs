//! Reflects a live Postgres schema into an in-memory [`CatalogSnapshot`] and
//! caches it per namespace under a TTL (§4.1).

mod error;
mod model;
pub mod queries;
mod reflector;

pub use error::CatalogError;
pub use model::{
    CatalogSnapshot, Column, CompositeAttribute, CompositeType, EnumType, ForeignKey, Table,
    TableKind,
};
pub use reflector::CatalogReflector;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use chrono::Utc;
    use std::collections::HashMap;

    fn sample_snapshot() -> CatalogSnapshot {
        let customer = Table {
            name: "customer".into(),
            kind: TableKind::Base,
            columns: vec![Column {
                name: "customer_id".into(),
                declared_type: "int4".into(),
                field_type: pg_types::FieldType::Int32,
                nullable: false,
                primary_key: true,
                domain_of: None,
                ordinal: 1,
            }],
            foreign_keys: vec![],
        };
        let order = Table {
            name: "order".into(),
            kind: TableKind::Base,
            columns: vec![],
            foreign_keys: vec![ForeignKey {
                constraint_name: "order_customer_fk".into(),
                local_columns: vec!["customer_id".into()],
                referenced_table: "customer".into(),
                referenced_columns: vec!["customer_id".into()],
            }],
        };
        let mut tables = HashMap::new();
        tables.insert("customer".to_string(), customer);
        tables.insert("order".to_string(), order);
        CatalogSnapshot {
            schema: "public".into(),
            tables,
            enums: HashMap::new(),
            composites: HashMap::new(),
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn referencing_finds_the_reverse_side_of_a_foreign_key() {
        let snapshot = sample_snapshot();
        let refs = snapshot.referencing("customer");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].0.name, "order");
    }

    #[test]
    fn views_are_excluded_from_foreign_key_assembly_by_convention() {
        let snapshot = sample_snapshot();
        assert!(snapshot.table("customer").unwrap().kind == TableKind::Base);
    }
}
