use chrono::{DateTime, Utc};
use pg_types::FieldType;
use std::collections::HashMap;

/// Whether a [`Table`] is a real base table, a plain view, or a materialized
/// view. Views carry no [`ForeignKey`]s (§3 invariant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TableKind {
    Base,
    View,
    MaterializedView,
}

impl TableKind {
    pub fn is_view(&self) -> bool {
        !matches!(self, TableKind::Base)
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Column {
    pub name: String,
    /// The resolved base type string, after stripping any domain alias.
    pub declared_type: String,
    pub field_type: FieldType,
    pub nullable: bool,
    pub primary_key: bool,
    /// The domain alias this column was declared with, if any. Diagnostic
    /// only; `declared_type`/`field_type` are always already resolved.
    pub domain_of: Option<String>,
    pub ordinal: i32,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ForeignKey {
    pub constraint_name: String,
    pub local_columns: Vec<String>,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Table {
    pub name: String,
    pub kind: TableKind,
    pub columns: Vec<Column>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl Table {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn primary_key_columns(&self) -> Vec<&Column> {
        self.columns.iter().filter(|c| c.primary_key).collect()
    }

    /// Foreign keys whose local side points away from this table, i.e. this
    /// table's many-to-one / one-to-one relationships.
    pub fn outgoing(&self) -> impl Iterator<Item = &ForeignKey> {
        self.foreign_keys.iter()
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EnumType {
    pub name: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CompositeAttribute {
    pub name: String,
    pub declared_type: String,
    pub field_type: FieldType,
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CompositeType {
    pub name: String,
    pub attributes: Vec<CompositeAttribute>,
}

/// A complete, immutable view of a schema namespace, as produced by the
/// [`crate::CatalogReflector`]. Tables are stored in a flat map keyed by
/// name; foreign keys reference other tables by name rather than by pointer,
/// since the catalog graph is naturally cyclic (Design Notes).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CatalogSnapshot {
    pub schema: String,
    pub tables: HashMap<String, Table>,
    pub enums: HashMap<String, EnumType>,
    pub composites: HashMap<String, CompositeType>,
    pub fetched_at: DateTime<Utc>,
}

impl CatalogSnapshot {
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Every foreign key across the schema that targets `table`, paired with
    /// the table declaring it — used by the schema projector to derive the
    /// reverse (one-to-many) side of a relationship.
    pub fn referencing(&self, table: &str) -> Vec<(&Table, &ForeignKey)> {
        self.tables
            .values()
            .flat_map(|t| t.foreign_keys.iter().map(move |fk| (t, fk)))
            .filter(|(_, fk)| fk.referenced_table == table)
            .collect()
    }

    /// Finds the table declaring a foreign key by its constraint name, along
    /// with the constraint itself. Constraint names are unique per schema,
    /// so this is the stable handle the relationship resolver uses to look a
    /// foreign key back up without threading the owning table's name through
    /// every resolver closure (§4.5).
    pub fn foreign_key(&self, constraint_name: &str) -> Option<(&Table, &ForeignKey)> {
        self.tables.values().find_map(|t| {
            t.foreign_keys
                .iter()
                .find(|fk| fk.constraint_name == constraint_name)
                .map(|fk| (t, fk))
        })
    }

    /// Flattens `composites` into the shape row decoding needs: each
    /// composite's attributes in ordinal order, by name, with their
    /// declared type dropped (a row literal carries no type tags of its
    /// own, so decoding only needs names and positions).
    pub fn composite_registry(&self) -> HashMap<String, Vec<(String, FieldType)>> {
        self.composites
            .iter()
            .map(|(name, ty)| {
                let attrs = ty.attributes.iter().map(|a| (a.name.clone(), a.field_type.clone())).collect();
                (name.clone(), attrs)
            })
            .collect()
    }
}
