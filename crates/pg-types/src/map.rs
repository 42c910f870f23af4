use crate::FieldType;

/// Maps a Postgres declared type string (case-insensitive, size/precision
/// suffixes stripped) to a [`FieldType`]. `enum_name`/`composite_name` let
/// the catalog pass through the resolved name of a user-defined type when
/// `declared` turns out to be neither a known base type nor an array of one.
pub fn map_declared_type(declared: &str, enum_names: &[String], composite_names: &[String]) -> FieldType {
    let trimmed = strip_size_suffix(declared).to_ascii_lowercase();

    if let Some(element) = trimmed.strip_suffix("[]") {
        return FieldType::Array(Box::new(map_declared_type(
            element,
            enum_names,
            composite_names,
        )));
    }
    // Postgres array udt_names are prefixed with an underscore, e.g. `_int4`.
    if let Some(element) = trimmed.strip_prefix('_') {
        return FieldType::Array(Box::new(map_declared_type(element, enum_names, composite_names)));
    }

    match trimmed.as_str() {
        "int2" | "smallint" | "int4" | "integer" | "int" | "serial" | "smallserial" => {
            FieldType::Int32
        }
        "int8" | "bigint" | "bigserial" => FieldType::Int64,
        "float4" | "real" | "float8" | "double precision" => FieldType::Float,
        "numeric" | "decimal" | "money" => FieldType::Numeric,
        "bool" | "boolean" => FieldType::Bool,
        // `character varying` and `varchar` are text; `bit varying`/`varbit` is
        // a distinct binary-string type and must not fall into this arm just
        // because both contain the word "varying" (§4.4).
        "text" | "varchar" | "character varying" | "char" | "character" | "bpchar" | "citext"
        | "name" => FieldType::Text,
        "bit varying" | "varbit" | "bit" => FieldType::Bytea,
        "uuid" => FieldType::Uuid,
        "date" => FieldType::Date,
        "time" | "time without time zone" => FieldType::Time,
        "timetz" | "time with time zone" => FieldType::TimeTz,
        "timestamp" | "timestamp without time zone" => FieldType::Timestamp,
        "timestamptz" | "timestamp with time zone" => FieldType::TimestampTz,
        "interval" => FieldType::Interval,
        "bytea" => FieldType::Bytea,
        "inet" => FieldType::Inet,
        "cidr" => FieldType::Cidr,
        "macaddr" | "macaddr8" => FieldType::MacAddr,
        "json" | "jsonb" => FieldType::Json,
        "xml" => FieldType::Xml,
        other => {
            if enum_names.iter().any(|n| n.eq_ignore_ascii_case(other)) {
                FieldType::Enum(other.to_string())
            } else if composite_names.iter().any(|n| n.eq_ignore_ascii_case(other)) {
                FieldType::Composite(other.to_string())
            } else {
                FieldType::Text
            }
        }
    }
}

/// Strips a trailing `(n)` or `(p,s)` precision/size suffix, e.g.
/// `numeric(10,2)` -> `numeric`, `varchar(255)` -> `varchar`.
fn strip_size_suffix(declared: &str) -> &str {
    match declared.find('(') {
        Some(idx) => declared[..idx].trim_end(),
        None => declared.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn strips_precision_and_lowercases() {
        assert_eq!(
            map_declared_type("NUMERIC(10,2)", &[], &[]),
            FieldType::Numeric
        );
        assert_eq!(
            map_declared_type("VARCHAR(255)", &[], &[]),
            FieldType::Text
        );
    }

    #[test]
    fn varying_does_not_conflate_bit_and_character() {
        assert_eq!(map_declared_type("bit varying", &[], &[]), FieldType::Bytea);
        assert_eq!(
            map_declared_type("character varying", &[], &[]),
            FieldType::Text
        );
    }

    #[test]
    fn array_udt_name_maps_to_element_array() {
        assert_eq!(
            map_declared_type("_int4", &[], &[]),
            FieldType::Array(Box::new(FieldType::Int32))
        );
        assert_eq!(
            map_declared_type("text[]", &[], &[]),
            FieldType::Array(Box::new(FieldType::Text))
        );
    }

    #[test]
    fn unknown_type_falls_back_to_text() {
        assert_eq!(map_declared_type("tsvector", &[], &[]), FieldType::Text);
    }

    #[test]
    fn known_enum_and_composite_names_are_recognized() {
        let enums = vec!["mood".to_string()];
        let composites = vec!["address".to_string()];
        assert_eq!(
            map_declared_type("mood", &enums, &composites),
            FieldType::Enum("mood".into())
        );
        assert_eq!(
            map_declared_type("address", &enums, &composites),
            FieldType::Composite("address".into())
        );
    }
}
