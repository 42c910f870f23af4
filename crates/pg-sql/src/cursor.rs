use crate::error::BuildError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};

/// The decoded payload of an opaque keyset cursor: the `orderBy` column
/// names it was cut against, and the row's value for each (§4.7, Design
/// Notes — cursors are tagged with their orderBy so a client can't reuse a
/// cursor minted under a different sort without us noticing).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct CursorPayload {
    #[serde(rename = "c")]
    columns: Vec<String>,
    #[serde(rename = "v")]
    values: Vec<serde_json::Value>,
}

/// Encodes a row's orderBy column values into an opaque, base64 cursor.
pub fn encode_cursor(columns: &[String], values: &[serde_json::Value]) -> String {
    let payload = CursorPayload {
        columns: columns.to_vec(),
        values: values.to_vec(),
    };
    let json = serde_json::to_vec(&payload).expect("CursorPayload is always serializable");
    URL_SAFE_NO_PAD.encode(json)
}

/// Decodes a cursor, rejecting it unless it was minted against exactly
/// `expected_columns` (in order) — a cursor carried over from a different
/// `orderBy` is not silently reinterpreted.
pub fn decode_cursor(cursor: &str, expected_columns: &[String]) -> Result<Vec<serde_json::Value>, BuildError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(cursor)
        .map_err(|_| BuildError::InvalidCursor)?;
    let payload: CursorPayload = serde_json::from_slice(&bytes).map_err(|_| BuildError::InvalidCursor)?;
    if payload.columns != expected_columns {
        return Err(BuildError::InvalidCursor);
    }
    Ok(payload.values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_trips_through_encode_and_decode() {
        let columns = vec!["created_at".to_string(), "id".to_string()];
        let values = vec![json!("2024-01-01T00:00:00Z"), json!(42)];
        let cursor = encode_cursor(&columns, &values);
        let decoded = decode_cursor(&cursor, &columns).unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn rejects_a_cursor_minted_under_a_different_order_by() {
        let cursor = encode_cursor(&["id".to_string()], &[json!(1)]);
        let err = decode_cursor(&cursor, &["created_at".to_string()]).unwrap_err();
        assert!(matches!(err, BuildError::InvalidCursor));
    }

    #[test]
    fn rejects_garbage_input() {
        let err = decode_cursor("not-a-real-cursor!!", &["id".to_string()]).unwrap_err();
        assert!(matches!(err, BuildError::InvalidCursor));
    }
}
