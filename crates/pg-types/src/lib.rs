//! Maps Postgres declared column types to the closed, tagged [`FieldType`]
//! vocabulary shared by the schema projector and the SQL builder.

mod map;
mod operators;

pub use map::map_declared_type;
pub use operators::{operators_for, Operator, ScalarCategory};

/// The abstract type of a column, independent of how Postgres happens to
/// spell it. Total: [`map_declared_type`] never fails, it falls back to
/// [`FieldType::Text`] for anything it doesn't recognize.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FieldType {
    Int32,
    Int64,
    Float,
    Numeric,
    Bool,
    Text,
    Uuid,
    Date,
    Time,
    TimeTz,
    Timestamp,
    TimestampTz,
    Interval,
    Bytea,
    Inet,
    Cidr,
    MacAddr,
    Json,
    Xml,
    Array(Box<FieldType>),
    Enum(String),
    Composite(String),
}

impl FieldType {
    /// The element type of an array column, or `self` for anything else.
    pub fn element(&self) -> &FieldType {
        match self {
            FieldType::Array(inner) => inner.element(),
            other => other,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, FieldType::Array(_))
    }

    /// Whether a parameter bound against a column of this type needs an
    /// explicit `::cast` in the generated SQL (§4.3).
    pub fn needs_cast(&self) -> bool {
        match self {
            FieldType::Int32
            | FieldType::Int64
            | FieldType::Float
            | FieldType::Numeric
            | FieldType::Bool
            | FieldType::Text
            | FieldType::Uuid => false,
            FieldType::Array(_) => true,
            FieldType::Date
            | FieldType::Time
            | FieldType::TimeTz
            | FieldType::Timestamp
            | FieldType::TimestampTz
            | FieldType::Interval
            | FieldType::Bytea
            | FieldType::Inet
            | FieldType::Cidr
            | FieldType::MacAddr
            | FieldType::Json
            | FieldType::Xml
            | FieldType::Enum(_)
            | FieldType::Composite(_) => true,
        }
    }

    /// The Postgres-side cast suffix for a bound parameter, e.g. `"interval"`
    /// for `FieldType::Interval`. Arrays cast to `"<element>[]"`.
    pub fn cast_name(&self) -> String {
        match self {
            FieldType::Array(inner) => format!("{}[]", inner.cast_name()),
            FieldType::Date => "date".into(),
            FieldType::Time => "time".into(),
            FieldType::TimeTz => "timetz".into(),
            FieldType::Timestamp => "timestamp".into(),
            FieldType::TimestampTz => "timestamptz".into(),
            FieldType::Interval => "interval".into(),
            FieldType::Bytea => "bytea".into(),
            FieldType::Inet => "inet".into(),
            FieldType::Cidr => "cidr".into(),
            FieldType::MacAddr => "macaddr".into(),
            FieldType::Json => "jsonb".into(),
            FieldType::Xml => "xml".into(),
            FieldType::Enum(name) => name.clone(),
            FieldType::Composite(name) => name.clone(),
            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_cast_name_nests_the_element() {
        let ty = FieldType::Array(Box::new(FieldType::Interval));
        assert_eq!(ty.cast_name(), "interval[]");
        assert!(ty.needs_cast());
    }

    #[test]
    fn scalar_types_need_no_cast() {
        for ty in [FieldType::Int32, FieldType::Text, FieldType::Bool, FieldType::Uuid] {
            assert!(!ty.needs_cast(), "{ty:?} should bind without a cast");
        }
    }
}
