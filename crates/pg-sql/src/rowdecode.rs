use crate::Row;
use pg_types::FieldType;
use sqlx::{postgres::PgRow, Column, Row as _, TypeInfo, ValueRef};
use std::collections::HashMap;

/// Ordinal attribute list for every known composite type, keyed by the
/// Postgres type name (lower-cased, matching how `column.type_info().name()`
/// reports it). Decoding a row literal back into named fields needs this:
/// the wire format itself carries neither a field count nor field names.
pub type CompositeRegistry = HashMap<String, Vec<(String, FieldType)>>;

/// Decodes a `sqlx` row into a column-name-keyed JSON map. Since the table
/// set (and therefore the column types a query returns) is only known at
/// runtime, this inspects each column's reported Postgres type name rather
/// than decoding against a `#[derive(FromRow)]` struct. `composites` supplies
/// the attribute list for any composite-typed column.
pub fn decode_row(row: &PgRow, composites: &CompositeRegistry) -> Result<Row, sqlx::Error> {
    let mut out = Row::new();
    for column in row.columns() {
        let name = column.name().to_string();
        let value = decode_column(row, column.ordinal(), column.type_info().name(), composites)?;
        out.insert(name, value);
    }
    Ok(out)
}

fn decode_column(row: &PgRow, index: usize, type_name: &str, composites: &CompositeRegistry) -> Result<serde_json::Value, sqlx::Error> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(serde_json::Value::Null);
    }

    if let Some(attrs) = composites.get(&type_name.to_ascii_lowercase()) {
        let literal = row.try_get::<String, _>(index)?;
        return Ok(decode_composite_literal(&literal, attrs));
    }

    let value = match type_name {
        "INT2" => row.try_get::<i16, _>(index).map(|v| serde_json::json!(v))?,
        "INT4" => row.try_get::<i32, _>(index).map(|v| serde_json::json!(v))?,
        "INT8" => row.try_get::<i64, _>(index).map(|v| serde_json::json!(v))?,
        "FLOAT4" => row.try_get::<f32, _>(index).map(|v| serde_json::json!(v))?,
        "FLOAT8" => row.try_get::<f64, _>(index).map(|v| serde_json::json!(v))?,
        "NUMERIC" => row
            .try_get::<bigdecimal::BigDecimal, _>(index)
            .map(|v| serde_json::Value::String(v.to_string()))?,
        "BOOL" => row.try_get::<bool, _>(index).map(|v| serde_json::json!(v))?,
        "UUID" => row.try_get::<uuid::Uuid, _>(index).map(|v| serde_json::json!(v.to_string()))?,
        "JSON" | "JSONB" => row.try_get::<serde_json::Value, _>(index)?,
        "TIMESTAMPTZ" => row
            .try_get::<chrono::DateTime<chrono::Utc>, _>(index)
            .map(|v| serde_json::json!(v.to_rfc3339()))?,
        "TIMESTAMP" => row
            .try_get::<chrono::NaiveDateTime, _>(index)
            .map(|v| serde_json::json!(v.to_string()))?,
        "DATE" => row
            .try_get::<chrono::NaiveDate, _>(index)
            .map(|v| serde_json::json!(v.to_string()))?,
        "TIME" => row
            .try_get::<chrono::NaiveTime, _>(index)
            .map(|v| serde_json::json!(v.to_string()))?,
        "BYTEA" => row
            .try_get::<Vec<u8>, _>(index)
            .map(|v| serde_json::Value::String(format!("\\x{}", hex::encode(v))))?,
        other if other.ends_with("[]") => row
            .try_get::<Vec<String>, _>(index)
            .map(serde_json::Value::from)
            .or_else(|_| row.try_get::<Vec<i64>, _>(index).map(serde_json::Value::from))?,
        _ => row.try_get::<String, _>(index).map(serde_json::Value::String)?,
    };
    Ok(value)
}

/// Parses a Postgres composite row literal (`(v1,v2,...)`) into a JSON
/// object keyed by `attrs`' names, in the same ordinal order the attributes
/// were declared in — row literals carry no field names of their own. A
/// field past the end of `attrs`, or an attribute past the end of the
/// literal, is dropped/filled with `null` rather than treated as an error:
/// the catalog and the wire value are expected to agree, but a stale
/// snapshot shouldn't turn a read into a panic.
fn decode_composite_literal(literal: &str, attrs: &[(String, FieldType)]) -> serde_json::Value {
    let trimmed = literal.trim();
    let inner = trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')).unwrap_or(trimmed);
    let fields = split_composite_fields(inner);

    let mut map = serde_json::Map::with_capacity(attrs.len());
    for (i, (name, _field_type)) in attrs.iter().enumerate() {
        let value = match fields.get(i) {
            Some(Some(text)) => serde_json::Value::String(text.clone()),
            _ => serde_json::Value::Null,
        };
        map.insert(name.clone(), value);
    }
    serde_json::Value::Object(map)
}

/// Splits a composite literal's interior on top-level commas, honoring
/// `"`-quoting and doubled-quote escapes — the reverse of
/// `param::quote_composite_field`. An unquoted empty field decodes to `None`
/// (Postgres's own representation of a NULL attribute); a quoted empty
/// field (`""`) decodes to `Some(String::new())`.
fn split_composite_fields(inner: &str) -> Vec<Option<String>> {
    if inner.is_empty() {
        return Vec::new();
    }

    let mut fields = Vec::new();
    let mut chars = inner.chars().peekable();
    let mut current = String::new();
    let mut quoted = false;
    let mut saw_quotes = false;

    while let Some(c) = chars.next() {
        if quoted {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    quoted = false;
                }
            } else {
                current.push(c);
            }
            continue;
        }
        match c {
            '"' => {
                quoted = true;
                saw_quotes = true;
            }
            ',' => {
                fields.push(if current.is_empty() && !saw_quotes { None } else { Some(std::mem::take(&mut current)) });
                saw_quotes = false;
            }
            _ => current.push(c),
        }
    }
    fields.push(if current.is_empty() && !saw_quotes { None } else { Some(current) });
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(names: &[&str]) -> Vec<(String, FieldType)> {
        names.iter().map(|n| (n.to_string(), FieldType::Text)).collect()
    }

    #[test]
    fn a_plain_composite_literal_decodes_field_by_position() {
        let value = decode_composite_literal("(1,hello,t)", &attrs(&["id", "label", "flag"]));
        assert_eq!(value["id"], serde_json::json!("1"));
        assert_eq!(value["label"], serde_json::json!("hello"));
        assert_eq!(value["flag"], serde_json::json!("t"));
    }

    #[test]
    fn an_unquoted_empty_field_decodes_to_null() {
        let value = decode_composite_literal("(1,,t)", &attrs(&["id", "label", "flag"]));
        assert_eq!(value["label"], serde_json::Value::Null);
    }

    #[test]
    fn a_quoted_empty_field_decodes_to_an_empty_string() {
        let value = decode_composite_literal("(1,\"\",t)", &attrs(&["id", "label", "flag"]));
        assert_eq!(value["label"], serde_json::json!(""));
    }

    #[test]
    fn a_quoted_field_with_a_comma_and_an_escaped_quote_round_trips() {
        let value = decode_composite_literal("(1,\"a, b \"\"c\"\"\",t)", &attrs(&["id", "label", "flag"]));
        assert_eq!(value["label"], serde_json::json!("a, b \"c\""));
    }

    #[test]
    fn a_missing_trailing_field_fills_null_rather_than_panicking() {
        let value = decode_composite_literal("(1)", &attrs(&["id", "label"]));
        assert_eq!(value["id"], serde_json::json!("1"));
        assert_eq!(value["label"], serde_json::Value::Null);
    }
}
