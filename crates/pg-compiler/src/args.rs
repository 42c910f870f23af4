use crate::error::EngineError;
use pg_catalog::Table;
use pg_sql::{bind_value, decode_cursor, BoundValue, FieldPredicate, OrderBy, Pagination, PredicateValue, SortDirection, WhereTree};
use pg_types::Operator;

/// The resolved shape of one query field's `where`/`or`/`orderBy`/pagination
/// arguments, ready to hand to the SQL Builder (§4.7 step 2).
#[derive(Debug, Clone)]
pub struct ParsedArgs {
    pub where_tree: Option<WhereTree>,
    pub order_by: Vec<OrderBy>,
    pub pagination: Pagination,
}

/// Parses a query field's raw JSON arguments into a [`ParsedArgs`], resolving
/// every filter column and value against `table`'s catalog-known columns.
pub fn parse_args(table: &Table, args: &serde_json::Value) -> Result<ParsedArgs, EngineError> {
    let where_tree = parse_where_and_or(table, args)?;
    let order_by = parse_order_by(table, args.get("orderBy"))?;
    let pagination = parse_pagination(args, &order_by)?;
    Ok(ParsedArgs { where_tree, order_by, pagination })
}

fn parse_where_and_or(table: &Table, args: &serde_json::Value) -> Result<Option<WhereTree>, EngineError> {
    let mut branches = Vec::new();

    // The legacy flat syntax (`customer_id_eq: 524`) and the object syntax
    // (`where: {customerId: {eq: 524}}`) may both be present; each
    // contributes its own AND'd set of predicates to the top-level AND,
    // same as if `where` had been split across two calls.
    let flat = parse_flat_filters(table, args)?;
    if let Some(flat) = flat {
        branches.push(flat);
    }

    if let Some(where_obj) = args.get("where") {
        if !where_obj.is_null() {
            branches.push(parse_where_object(table, where_obj)?);
        }
    }

    let and_tree = match branches.len() {
        0 => None,
        _ => Some(WhereTree::And(branches)),
    };

    let or_tree = match args.get("or") {
        Some(serde_json::Value::Array(items)) if !items.is_empty() => {
            let mut ors = Vec::with_capacity(items.len());
            for item in items {
                ors.push(parse_where_object(table, item)?);
            }
            Some(WhereTree::Or(ors))
        }
        _ => None,
    };

    Ok(match (and_tree, or_tree) {
        (Some(a), Some(o)) => Some(WhereTree::And(vec![a, o])),
        (Some(a), None) => Some(a),
        (None, Some(o)) => Some(o),
        (None, None) => None,
    })
}

/// `where: {column: {op: value, ...}, ...}` — every column an AND, every
/// operator within a column's filter object an AND (§6).
fn parse_where_object(table: &Table, value: &serde_json::Value) -> Result<WhereTree, EngineError> {
    let obj = match value.as_object() {
        Some(obj) => obj,
        None => return Ok(WhereTree::And(vec![])),
    };

    let mut predicates = Vec::new();
    for (column_name, filter) in obj {
        let column = table
            .column(column_name)
            .ok_or_else(|| EngineError::ColumnNotFound(column_name.clone()))?;
        let filter_obj = filter.as_object().ok_or_else(|| EngineError::ColumnNotFound(column_name.clone()))?;
        for (op_name, op_value) in filter_obj {
            let op = Operator::from_str(op_name).ok_or_else(|| EngineError::ColumnNotFound(format!("{column_name}.{op_name}")))?;
            predicates.push(WhereTree::predicate(build_predicate(column.name.clone(), &column.field_type, op, op_value)?));
        }
    }
    Ok(WhereTree::And(predicates))
}

/// `customer_id_eq: 524` — top-level keys are matched against `{column}_{op}`
/// with a case-sensitive, lowercase-only operator suffix (Open Question (a),
/// resolved in SPEC_FULL.md: the narrowest reading, so `CUSTOMER_ID_EQ`
/// never gets silently reinterpreted as a differently-cased column name).
fn parse_flat_filters(table: &Table, args: &serde_json::Value) -> Result<Option<WhereTree>, EngineError> {
    let obj = match args.as_object() {
        Some(obj) => obj,
        None => return Ok(None),
    };

    const RESERVED: &[&str] = &["where", "or", "orderBy", "limit", "offset", "first", "after", "last", "before", "input", "inputs", "id"];

    let mut predicates = Vec::new();
    for (key, value) in obj {
        if RESERVED.contains(&key.as_str()) {
            continue;
        }
        let Some((column_name, op)) = split_flat_key(key) else { continue };
        let Some(column) = table.column(column_name) else { continue };
        predicates.push(WhereTree::predicate(build_predicate(column.name.clone(), &column.field_type, op, value)?));
    }

    Ok(if predicates.is_empty() { None } else { Some(WhereTree::And(predicates)) })
}

/// Splits `customer_id_eq` into (`customer_id`, `Eq`) by matching the
/// longest recognized, lowercase operator suffix. A key with no recognized
/// suffix is not a flat filter at all (probably just an unrelated argument).
fn split_flat_key(key: &str) -> Option<(&str, Operator)> {
    const SUFFIXES: &[&str] = &[
        "isNotNull", "containedBy", "startsWith", "endsWith", "pathText", "hasKeys", "hasAny", "hasAll", "notIn",
        "isNull", "ilike", "hasKey", "path", "neq", "gte", "lte", "contains", "like", "length", "eq", "gt", "lt", "in",
    ];
    let mut best: Option<(&str, Operator)> = None;
    for suffix in SUFFIXES {
        let marker = format!("_{suffix}");
        if let Some(column) = key.strip_suffix(&marker) {
            if !column.is_empty() && best.map(|(c, _)| c.len() < column.len()).unwrap_or(true) {
                if let Some(op) = Operator::from_str(suffix) {
                    best = Some((column, op));
                }
            }
        }
    }
    best
}

fn build_predicate(
    column: String,
    field_type: &pg_types::FieldType,
    op: Operator,
    value: &serde_json::Value,
) -> Result<FieldPredicate, EngineError> {
    let predicate_value = build_predicate_value(field_type, op, value)?;
    Ok(FieldPredicate { column, field_type: field_type.clone(), op, value: predicate_value })
}

/// Picks the [`PredicateValue`] shape `op` expects: a bare sense flag for
/// null checks, a bound list for `in`/`notIn`, a single bound scalar
/// otherwise (§4.3/§4.4).
fn build_predicate_value(field_type: &pg_types::FieldType, op: Operator, value: &serde_json::Value) -> Result<PredicateValue, EngineError> {
    match op {
        Operator::IsNull | Operator::IsNotNull => Ok(match value.as_bool() {
            Some(b) => PredicateValue::Scalar(BoundValue::Bool(b)),
            None if value.is_null() => PredicateValue::None,
            None => return Err(type_mismatch_err(value, field_type)),
        }),
        Operator::In | Operator::NotIn => {
            let items = value.as_array().ok_or_else(|| type_mismatch_err(value, field_type))?;
            let mut bound = Vec::with_capacity(items.len());
            for item in items {
                bound.push(bind_value(field_type, item).map_err(EngineError::from)?);
            }
            Ok(PredicateValue::List(bound))
        }
        _ => Ok(PredicateValue::Scalar(bind_value(field_type, value).map_err(EngineError::from)?)),
    }
}

fn type_mismatch_err(value: &serde_json::Value, field_type: &pg_types::FieldType) -> EngineError {
    EngineError::TypeMismatch { value: value.to_string(), column_type: format!("{field_type:?}") }
}

fn parse_order_by(table: &Table, value: Option<&serde_json::Value>) -> Result<Vec<OrderBy>, EngineError> {
    let mut order_by = Vec::new();
    if let Some(serde_json::Value::Object(obj)) = value {
        for (column_name, direction) in obj {
            table.column(column_name).ok_or_else(|| EngineError::ColumnNotFound(column_name.clone()))?;
            let direction = match direction.as_str() {
                Some("DESC") | Some("desc") => SortDirection::Desc,
                _ => SortDirection::Asc,
            };
            order_by.push(OrderBy { column: column_name.clone(), direction });
        }
    }
    Ok(order_by)
}

fn parse_pagination(args: &serde_json::Value, order_by: &[OrderBy]) -> Result<Pagination, EngineError> {
    let first = args.get("first").and_then(|v| v.as_i64());
    let last = args.get("last").and_then(|v| v.as_i64());
    let after = args.get("after").and_then(|v| v.as_str());
    let before = args.get("before").and_then(|v| v.as_str());
    let limit = args.get("limit").and_then(|v| v.as_i64());
    let offset = args.get("offset").and_then(|v| v.as_i64());

    if first.is_some() || last.is_some() || after.is_some() || before.is_some() {
        if order_by.is_empty() {
            return Err(EngineError::CursorRequiresOrderBy);
        }
        let columns: Vec<String> = order_by.iter().map(|o| o.column.clone()).collect();
        let after = after.map(|c| decode_cursor(c, &columns)).transpose().map_err(EngineError::from)?;
        let before = before.map(|c| decode_cursor(c, &columns)).transpose().map_err(EngineError::from)?;
        return Ok(Pagination::Keyset { first, after, last, before });
    }

    if limit.is_some() || offset.is_some() {
        return Ok(Pagination::Offset { limit: limit.unwrap_or(i64::MAX), offset: offset.unwrap_or(0) });
    }

    Ok(Pagination::None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use pg_catalog::{Column, TableKind};
    use pg_types::FieldType;

    fn customer_table() -> Table {
        Table {
            name: "customer".into(),
            kind: TableKind::Base,
            columns: vec![
                Column { name: "customer_id".into(), declared_type: "int4".into(), field_type: FieldType::Int32, nullable: false, primary_key: true, domain_of: None, ordinal: 0 },
                Column { name: "name".into(), declared_type: "text".into(), field_type: FieldType::Text, nullable: true, primary_key: false, domain_of: None, ordinal: 1 },
            ],
            foreign_keys: vec![],
        }
    }

    #[test]
    fn splits_a_flat_key_on_its_lowercase_operator_suffix() {
        assert_eq!(split_flat_key("customer_id_eq").unwrap().0, "customer_id");
        assert_eq!(split_flat_key("customer_id_eq").unwrap().1, Operator::Eq);
    }

    #[test]
    fn an_uppercase_suffix_is_not_recognized_as_an_operator() {
        assert!(split_flat_key("customer_id_EQ").is_none());
    }

    #[test]
    fn flat_filters_compile_into_an_and_tree() {
        let table = customer_table();
        let args = serde_json::json!({ "customer_id_eq": 5 });
        let parsed = parse_args(&table, &args).unwrap();
        assert!(matches!(parsed.where_tree, Some(WhereTree::And(ref v)) if v.len() == 1));
    }

    #[test]
    fn object_where_with_multiple_operators_ands_them() {
        let table = customer_table();
        let args = serde_json::json!({ "where": { "customer_id": { "gte": 1, "lte": 10 } } });
        let parsed = parse_args(&table, &args).unwrap();
        match parsed.where_tree {
            Some(WhereTree::And(branches)) => {
                assert_eq!(branches.len(), 1);
                match &branches[0] {
                    WhereTree::And(inner) => assert_eq!(inner.len(), 2),
                    other => panic!("expected nested And, got {other:?}"),
                }
            }
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn unknown_column_in_where_is_rejected() {
        let table = customer_table();
        let args = serde_json::json!({ "where": { "ghost_column": { "eq": 1 } } });
        assert!(matches!(parse_args(&table, &args), Err(EngineError::ColumnNotFound(_))));
    }

    #[test]
    fn limit_and_offset_select_offset_pagination() {
        let args = serde_json::json!({ "limit": 10, "offset": 5 });
        let parsed = parse_pagination(&args, &[]).unwrap();
        assert_eq!(parsed, Pagination::Offset { limit: 10, offset: 5 });
    }

    #[test]
    fn a_cursor_without_an_order_by_is_rejected() {
        let args = serde_json::json!({ "first": 10, "after": "whatever" });
        assert!(matches!(parse_pagination(&args, &[]), Err(EngineError::CursorRequiresOrderBy)));
    }

    #[test]
    fn in_operator_requires_a_json_array() {
        let column_type = FieldType::Int32;
        let err = build_predicate_value(&column_type, Operator::In, &serde_json::json!(5)).unwrap_err();
        assert!(matches!(err, EngineError::TypeMismatch { .. }));
    }
}
