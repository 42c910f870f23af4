use crate::error::BuildError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use pg_types::FieldType;
use uuid::Uuid;

/// A value ready to be bound into a parameterized statement. Basic scalars
/// bind natively; everything else binds as text alongside an explicit
/// `::cast` emitted by the SQL builder (§4.3/§4.4) — the same representation
/// PostgREST-style engines use so the database, not the application, is the
/// source of truth for type coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundValue {
    Null,
    Bool(bool),
    I32(i32),
    I64(i64),
    F64(f64),
    Uuid(Uuid),
    /// Bound as plain text, no cast emitted.
    Text(String),
    /// Bound as text, with the SQL builder appending `::{FieldType::cast_name()}`.
    Cast(String),
}

/// Converts an incoming JSON value (as received from the GraphQL layer) into
/// a [`BoundValue`] appropriate for `field_type`. This is the Parameter
/// Binder of §4.4.
pub fn bind_value(field_type: &FieldType, value: &serde_json::Value) -> Result<BoundValue, BuildError> {
    if value.is_null() {
        return Ok(BoundValue::Null);
    }

    match field_type {
        FieldType::Int32 => value
            .as_i64()
            .map(|v| BoundValue::I32(v as i32))
            .ok_or_else(|| type_mismatch(value, "int32")),
        FieldType::Int64 => value
            .as_i64()
            .map(BoundValue::I64)
            .ok_or_else(|| type_mismatch(value, "int64")),
        FieldType::Float | FieldType::Numeric => value
            .as_f64()
            .map(BoundValue::F64)
            .ok_or_else(|| type_mismatch(value, "numeric")),
        FieldType::Bool => value
            .as_bool()
            .map(BoundValue::Bool)
            .ok_or_else(|| type_mismatch(value, "bool")),
        FieldType::Text => value
            .as_str()
            .map(|s| BoundValue::Text(s.to_string()))
            .ok_or_else(|| type_mismatch(value, "text")),
        FieldType::Uuid => {
            let s = value.as_str().ok_or_else(|| type_mismatch(value, "uuid"))?;
            Uuid::parse_str(s)
                .map(BoundValue::Uuid)
                .map_err(|_| BuildError::InvalidUuid(s.to_string()))
        }
        FieldType::Date | FieldType::Time | FieldType::TimeTz | FieldType::Timestamp | FieldType::TimestampTz => {
            bind_datetime(field_type, value)
        }
        FieldType::Interval => value
            .as_str()
            .map(|s| BoundValue::Cast(s.to_string()))
            .ok_or_else(|| type_mismatch(value, "interval")),
        FieldType::Bytea => bind_bytea(value),
        FieldType::Inet | FieldType::Cidr | FieldType::MacAddr => bind_network(field_type, value),
        FieldType::Json => bind_json(value),
        FieldType::Xml => value
            .as_str()
            .map(|s| BoundValue::Cast(s.to_string()))
            .ok_or_else(|| type_mismatch(value, "xml")),
        FieldType::Array(element) => bind_array(element, value),
        FieldType::Enum(_) => value
            .as_str()
            .map(|s| BoundValue::Cast(s.to_string()))
            .ok_or_else(|| type_mismatch(value, "enum")),
        FieldType::Composite(_) => bind_composite(value),
    }
}

fn type_mismatch(value: &serde_json::Value, column_type: &str) -> BuildError {
    BuildError::TypeMismatch {
        value: value.to_string(),
        column_type: column_type.to_string(),
    }
}

/// Validates the incoming string against the format its `FieldType` expects
/// before binding it as a `::cast` value, so a malformed date/time is
/// rejected here rather than surfacing as an opaque database error later
/// (§4.4).
fn bind_datetime(field_type: &FieldType, value: &serde_json::Value) -> Result<BoundValue, BuildError> {
    let s = value
        .as_str()
        .ok_or_else(|| type_mismatch(value, "datetime"))?;

    let parsed = match field_type {
        FieldType::Date => NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok(),
        FieldType::Timestamp => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
            .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
            .is_ok(),
        FieldType::TimestampTz => DateTime::<Utc>::parse_from_rfc3339(s).is_ok(),
        FieldType::Time | FieldType::TimeTz => NaiveTime::parse_from_str(s, "%H:%M:%S").is_ok(),
        _ => false,
    };
    if !parsed {
        return Err(BuildError::InvalidDate(s.to_string()));
    }

    Ok(BoundValue::Cast(s.to_string()))
}

fn bind_bytea(value: &serde_json::Value) -> Result<BoundValue, BuildError> {
    let s = value.as_str().ok_or_else(|| type_mismatch(value, "bytea"))?;
    // Accept hex text (with or without the Postgres `\x` prefix) verbatim;
    // the cast to `bytea` happens in the builder.
    let hex = s.strip_prefix("\\x").unwrap_or(s);
    Ok(BoundValue::Cast(format!("\\x{hex}")))
}

fn bind_network(field_type: &FieldType, value: &serde_json::Value) -> Result<BoundValue, BuildError> {
    let s = value
        .as_str()
        .ok_or_else(|| type_mismatch(value, "network"))?;
    if s.trim().is_empty() {
        return Err(BuildError::InvalidNetwork(s.to_string()));
    }
    let _ = field_type;
    Ok(BoundValue::Cast(s.to_string()))
}

fn bind_json(value: &serde_json::Value) -> Result<BoundValue, BuildError> {
    let text = match value {
        serde_json::Value::String(s) => {
            // Accept a JSON-encoded string, validating it parses.
            serde_json::from_str::<serde_json::Value>(s)
                .map(|_| s.clone())
                .map_err(|e| BuildError::InvalidJson(e.to_string()))?
        }
        other => other.to_string(),
    };
    Ok(BoundValue::Cast(text))
}

/// Builds a Postgres array literal `{a,b,c}` from a JSON list, or accepts a
/// `{a,b,c}`-literal string verbatim. Empty lists bind as `NULL` to preserve
/// Postgres's array-casting behavior (§4.4).
fn bind_array(element: &FieldType, value: &serde_json::Value) -> Result<BoundValue, BuildError> {
    match value {
        serde_json::Value::String(literal) => Ok(BoundValue::Cast(literal.clone())),
        serde_json::Value::Array(items) => {
            if items.is_empty() {
                return Ok(BoundValue::Null);
            }
            let mut parts = Vec::with_capacity(items.len());
            for item in items {
                let bound = bind_value(element, item)?;
                parts.push(array_element_literal(bound));
            }
            Ok(BoundValue::Cast(format!("{{{}}}", parts.join(","))))
        }
        other => Err(type_mismatch(other, "array")),
    }
}

fn array_element_literal(bound: BoundValue) -> String {
    match bound {
        BoundValue::Null => "NULL".to_string(),
        BoundValue::Bool(b) => b.to_string(),
        BoundValue::I32(v) => v.to_string(),
        BoundValue::I64(v) => v.to_string(),
        BoundValue::F64(v) => v.to_string(),
        BoundValue::Uuid(u) => u.to_string(),
        BoundValue::Text(s) | BoundValue::Cast(s) => quote_array_element(&s),
    }
}

fn quote_array_element(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Builds a `(v1,v2,...)` composite-row literal from a JSON object, quoting
/// and escaping embedded quotes, parens, and commas in each field (§4.4).
fn bind_composite(value: &serde_json::Value) -> Result<BoundValue, BuildError> {
    let obj = value
        .as_object()
        .ok_or_else(|| type_mismatch(value, "composite"))?;
    let mut parts = Vec::with_capacity(obj.len());
    for (_key, v) in obj {
        parts.push(composite_field_literal(v));
    }
    Ok(BoundValue::Cast(format!("({})", parts.join(","))))
}

fn composite_field_literal(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => quote_composite_field(s),
        other => quote_composite_field(&other.to_string()),
    }
}

fn needs_composite_quoting(s: &str) -> bool {
    s.is_empty()
        || s.chars()
            .any(|c| c == ',' || c == ')' || c == '(' || c == '"' || c.is_whitespace())
}

fn quote_composite_field(s: &str) -> String {
    if needs_composite_quoting(s) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_array_binds_as_null() {
        let bound = bind_value(&FieldType::Array(Box::new(FieldType::Int32)), &json!([])).unwrap();
        assert_eq!(bound, BoundValue::Null);
    }

    #[test]
    fn array_of_text_quotes_each_element() {
        let bound = bind_value(
            &FieldType::Array(Box::new(FieldType::Text)),
            &json!(["a", "b,c"]),
        )
        .unwrap();
        assert_eq!(bound, BoundValue::Cast("{\"a\",\"b,c\"}".to_string()));
    }

    #[test]
    fn invalid_uuid_is_rejected() {
        let err = bind_value(&FieldType::Uuid, &json!("not-a-uuid")).unwrap_err();
        assert!(matches!(err, BuildError::InvalidUuid(_)));
    }

    #[test]
    fn unparseable_timestamp_is_rejected() {
        let err = bind_value(&FieldType::TimestampTz, &json!("not-a-timestamp")).unwrap_err();
        assert!(matches!(err, BuildError::InvalidDate(_)));
    }

    #[test]
    fn a_valid_rfc3339_timestamp_binds_as_cast() {
        let bound = bind_value(&FieldType::TimestampTz, &json!("2024-01-01T00:00:00Z")).unwrap();
        assert_eq!(bound, BoundValue::Cast("2024-01-01T00:00:00Z".to_string()));
    }

    #[test]
    fn composite_quotes_fields_containing_commas_or_parens() {
        let bound = bind_composite(&json!({"street": "1 Main St, Apt 2", "zip": "90210"})).unwrap();
        match bound {
            BoundValue::Cast(s) => {
                assert!(s.contains("\"1 Main St, Apt 2\""));
                assert!(s.contains("90210"));
            }
            other => panic!("expected Cast, got {other:?}"),
        }
    }

    #[test]
    fn json_string_value_is_validated() {
        let err = bind_json(&json!("{not valid json")).unwrap_err();
        assert!(matches!(err, BuildError::InvalidJson(_)));
    }
}
