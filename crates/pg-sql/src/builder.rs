use crate::error::BuildError;
use crate::filter::{FieldPredicate, PredicateValue, WhereTree};
use crate::ident::{qualify, quote_ident};
use crate::param::BoundValue;
use pg_types::Operator;

/// Accumulates bound parameters and hands out `$n` placeholders in the order
/// they were pushed, the same positional convention `sqlx::query(...).bind(...)`
/// expects.
#[derive(Debug, Default)]
pub struct ParamList {
    values: Vec<BoundValue>,
}

impl ParamList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a value and returns its `$n` placeholder.
    pub fn push(&mut self, value: BoundValue) -> String {
        self.values.push(value);
        format!("${}", self.values.len())
    }

    pub fn into_values(self) -> Vec<BoundValue> {
        self.values
    }

    pub fn values(&self) -> &[BoundValue] {
        &self.values
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pagination {
    None,
    Offset { limit: i64, offset: i64 },
    Keyset {
        first: Option<i64>,
        after: Option<Vec<serde_json::Value>>,
        last: Option<i64>,
        before: Option<Vec<serde_json::Value>>,
    },
}

#[derive(Debug, Clone)]
pub struct SelectPlan {
    pub schema: String,
    pub table: String,
    pub columns: Vec<String>,
    pub where_tree: Option<WhereTree>,
    pub order_by: Vec<OrderBy>,
    pub pagination: Pagination,
}

/// Compiles a [`WhereTree`] into a parenthesized SQL boolean expression,
/// pushing any parameters it needs onto `params`.
pub fn compile_where(tree: &WhereTree, alias: &str, params: &mut ParamList) -> Result<String, BuildError> {
    match tree {
        WhereTree::And(children) => compile_conjunction(children, " AND ", alias, params),
        WhereTree::Or(children) => compile_conjunction(children, " OR ", alias, params),
        WhereTree::Predicate(predicate) => compile_predicate(predicate, alias, params),
    }
}

fn compile_conjunction(
    children: &[WhereTree],
    joiner: &str,
    alias: &str,
    params: &mut ParamList,
) -> Result<String, BuildError> {
    if children.is_empty() {
        return Ok("TRUE".to_string());
    }
    let mut parts = Vec::with_capacity(children.len());
    for child in children {
        parts.push(compile_where(child, alias, params)?);
    }
    Ok(format!("({})", parts.join(joiner)))
}

fn column_ref(alias: &str, column: &str) -> String {
    format!("{}.{}", quote_ident(alias), quote_ident(column))
}

fn bind_scalar(value: &BoundValue, field_type: &pg_types::FieldType, params: &mut ParamList) -> String {
    let placeholder = params.push(value.clone());
    match value {
        BoundValue::Cast(_) if field_type.needs_cast() => format!("{placeholder}::{}", field_type.cast_name()),
        _ => placeholder,
    }
}

/// Compiles a single `column op value` predicate following the operator
/// table (§4.3/§6).
pub fn compile_predicate(predicate: &FieldPredicate, alias: &str, params: &mut ParamList) -> Result<String, BuildError> {
    let col = column_ref(alias, &predicate.column);

    let scalar = |_: &mut ParamList| -> Result<&BoundValue, BuildError> {
        match &predicate.value {
            PredicateValue::Scalar(v) => Ok(v),
            _ => Err(BuildError::TypeMismatch {
                value: "<non-scalar>".to_string(),
                column_type: predicate.column.clone(),
            }),
        }
    };

    match predicate.op {
        Operator::Eq => Ok(format!("{col} = {}", bind_scalar(scalar(params)?, &predicate.field_type, params))),
        Operator::Neq => Ok(format!("{col} != {}", bind_scalar(scalar(params)?, &predicate.field_type, params))),
        Operator::Gt => Ok(format!("{col} > {}", bind_scalar(scalar(params)?, &predicate.field_type, params))),
        Operator::Gte => Ok(format!("{col} >= {}", bind_scalar(scalar(params)?, &predicate.field_type, params))),
        Operator::Lt => Ok(format!("{col} < {}", bind_scalar(scalar(params)?, &predicate.field_type, params))),
        Operator::Lte => Ok(format!("{col} <= {}", bind_scalar(scalar(params)?, &predicate.field_type, params))),
        Operator::Like => Ok(format!("{col} LIKE {}", bind_scalar(scalar(params)?, &predicate.field_type, params))),
        Operator::ILike => Ok(format!("{col} ILIKE {}", bind_scalar(scalar(params)?, &predicate.field_type, params))),
        Operator::Contains => compile_wildcard(&col, predicate, params, "%{}%"),
        Operator::StartsWith => compile_wildcard(&col, predicate, params, "{}%"),
        Operator::EndsWith => compile_wildcard(&col, predicate, params, "%{}"),
        Operator::In | Operator::NotIn => compile_in(&col, predicate, params),
        Operator::IsNull => compile_null_sense(&col, predicate, true),
        Operator::IsNotNull => compile_null_sense(&col, predicate, false),
        Operator::HasKey => Ok(format!("{col} ? {}", bind_scalar(scalar(params)?, &predicate.field_type, params))),
        Operator::HasKeys => Ok(format!("{col} ?& {}", bind_scalar(scalar(params)?, &predicate.field_type, params))),
        Operator::ContainedBy => Ok(format!("{col} <@ {}", bind_scalar(scalar(params)?, &predicate.field_type, params))),
        Operator::Path => Ok(format!("{col} #> {}", bind_scalar(scalar(params)?, &predicate.field_type, params))),
        Operator::PathText => Ok(format!("{col} #>> {}", bind_scalar(scalar(params)?, &predicate.field_type, params))),
        Operator::HasAny => Ok(format!("{col} && {}", bind_scalar(scalar(params)?, &predicate.field_type, params))),
        Operator::HasAll => Ok(format!("{col} @> {}", bind_scalar(scalar(params)?, &predicate.field_type, params))),
        Operator::Length => Ok(format!("length({col}) = {}", bind_scalar(scalar(params)?, &predicate.field_type, params))),
    }
}

/// `contains`/`startsWith`/`endsWith` wrap the value in wildcards; network
/// columns use `ILIKE` with a text cast, JSON/XML compare their text form
/// (§4.3).
fn compile_wildcard(
    col: &str,
    predicate: &FieldPredicate,
    params: &mut ParamList,
    pattern: &str,
) -> Result<String, BuildError> {
    use pg_types::ScalarCategory;

    let value = match &predicate.value {
        PredicateValue::Scalar(BoundValue::Text(s)) | PredicateValue::Scalar(BoundValue::Cast(s)) => s.clone(),
        _ => {
            return Err(BuildError::TypeMismatch {
                value: "<non-text>".to_string(),
                column_type: predicate.column.clone(),
            })
        }
    };
    let wildcarded = pattern.replace("{}", &value);
    let placeholder = params.push(BoundValue::Text(wildcarded));

    let category = ScalarCategory::of(&predicate.field_type);
    let lhs = match category {
        ScalarCategory::Network => format!("{col}::text"),
        ScalarCategory::Json | ScalarCategory::Xml => format!("{col}::text"),
        _ => col.to_string(),
    };
    let op = if matches!(category, ScalarCategory::Network) {
        "ILIKE"
    } else {
        "LIKE"
    };
    Ok(format!("{lhs} {op} {placeholder}"))
}

fn compile_in(col: &str, predicate: &FieldPredicate, params: &mut ParamList) -> Result<String, BuildError> {
    let values = match &predicate.value {
        PredicateValue::List(values) => values,
        _ => {
            return Err(BuildError::TypeMismatch {
                value: "<non-list>".to_string(),
                column_type: predicate.column.clone(),
            })
        }
    };
    if values.is_empty() {
        return Ok(if predicate.op == Operator::In { "FALSE".to_string() } else { "TRUE".to_string() });
    }
    let mut placeholders = Vec::with_capacity(values.len());
    for value in values {
        placeholders.push(bind_scalar(value, &predicate.field_type, params));
    }
    let op = if predicate.op == Operator::In { "IN" } else { "NOT IN" };
    Ok(format!("{col} {op} ({})", placeholders.join(", ")))
}

fn compile_null_sense(col: &str, predicate: &FieldPredicate, is_null_operator: bool) -> Result<String, BuildError> {
    let sense = match &predicate.value {
        PredicateValue::Scalar(BoundValue::Bool(b)) => *b,
        PredicateValue::None => true,
        _ => {
            return Err(BuildError::TypeMismatch {
                value: "<non-bool>".to_string(),
                column_type: predicate.column.clone(),
            })
        }
    };
    let want_null = sense == is_null_operator;
    Ok(if want_null {
        format!("{col} IS NULL")
    } else {
        format!("{col} IS NOT NULL")
    })
}

/// Compiles the keyset fragment `(col1 op v1) OR (col1 = v1 AND col2 op v2) OR …`
/// (§4.3's exact wording), where `op` flips with direction and with
/// before/after.
fn compile_keyset(
    order_by: &[OrderBy],
    values: &[serde_json::Value],
    alias: &str,
    reverse: bool,
    params: &mut ParamList,
) -> Result<String, BuildError> {
    if order_by.is_empty() {
        return Err(BuildError::CursorRequiresOrderBy);
    }
    let mut clauses = Vec::with_capacity(order_by.len());
    for i in 0..order_by.len() {
        let mut parts = Vec::with_capacity(i + 1);
        for (j, ob) in order_by.iter().enumerate().take(i) {
            let col = column_ref(alias, &ob.column);
            let placeholder = params.push(json_scalar(&values[j]));
            parts.push(format!("{col} = {placeholder}"));
        }
        let ob = &order_by[i];
        let col = column_ref(alias, &ob.column);
        let placeholder = params.push(json_scalar(&values[i]));
        let forward = matches!(ob.direction, SortDirection::Asc);
        let op = match (forward, reverse) {
            (true, false) => ">",
            (false, false) => "<",
            (true, true) => "<",
            (false, true) => ">",
        };
        parts.push(format!("{col} {op} {placeholder}"));
        clauses.push(format!("({})", parts.join(" AND ")));
    }
    Ok(format!("({})", clauses.join(" OR ")))
}

fn json_scalar(value: &serde_json::Value) -> BoundValue {
    match value {
        serde_json::Value::Null => BoundValue::Null,
        serde_json::Value::Bool(b) => BoundValue::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                BoundValue::I64(i)
            } else {
                BoundValue::F64(n.as_f64().unwrap_or_default())
            }
        }
        serde_json::Value::String(s) => BoundValue::Text(s.clone()),
        other => BoundValue::Text(other.to_string()),
    }
}

fn order_by_clause(order_by: &[OrderBy], alias: &str, reverse: bool) -> String {
    if order_by.is_empty() {
        return String::new();
    }
    let fragments: Vec<String> = order_by
        .iter()
        .map(|ob| {
            let direction = match (&ob.direction, reverse) {
                (SortDirection::Asc, false) => "ASC",
                (SortDirection::Desc, false) => "DESC",
                (SortDirection::Asc, true) => "DESC",
                (SortDirection::Desc, true) => "ASC",
            };
            format!("{} {direction}", column_ref(alias, &ob.column))
        })
        .collect();
    format!(" ORDER BY {}", fragments.join(", "))
}

/// Builds a `SELECT` and its bound parameters for `plan`. Keyset pagination
/// is applied as an extra AND'd predicate and compiled with a temporarily
/// reversed sort when paging backward via `last`/`before`, so the outermost
/// caller re-reverses the returned rows to restore the requested order.
pub fn build_select(plan: &SelectPlan) -> Result<(String, Vec<BoundValue>), BuildError> {
    let alias = "t";
    let mut params = ParamList::new();
    let mut predicates = Vec::new();

    if let Some(tree) = &plan.where_tree {
        if !tree.is_empty_and() {
            predicates.push(compile_where(tree, alias, &mut params)?);
        }
    }

    let mut reverse = false;
    let mut limit = None;
    match &plan.pagination {
        Pagination::None => {}
        Pagination::Offset { limit: l, .. } => {
            limit = Some(*l);
        }
        Pagination::Keyset { first, after, last, before } => {
            if let Some(after_values) = after {
                predicates.push(compile_keyset(&plan.order_by, after_values, alias, false, &mut params)?);
            }
            if let Some(before_values) = before {
                predicates.push(compile_keyset(&plan.order_by, before_values, alias, true, &mut params)?);
            }
            if last.is_some() {
                reverse = true;
            }
            limit = first.or(*last);
        }
    }

    let where_clause = if predicates.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", predicates.join(" AND "))
    };

    let columns = if plan.columns.is_empty() {
        "*".to_string()
    } else {
        plan.columns
            .iter()
            .map(|c| column_ref(alias, c))
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut sql = format!(
        "SELECT {columns} FROM {} AS {}{where_clause}{}",
        qualify(&plan.schema, &plan.table),
        quote_ident(alias),
        order_by_clause(&plan.order_by, alias, reverse),
    );

    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }
    if let Pagination::Offset { offset, .. } = &plan.pagination {
        sql.push_str(&format!(" OFFSET {offset}"));
    }

    Ok((sql, params.into_values()))
}

/// Builds `SELECT count(*) FROM … WHERE …` sharing the same `WhereTree`
/// compilation as [`build_select`], for `totalCount` (§4.6).
pub fn build_count(plan: &SelectPlan) -> Result<(String, Vec<BoundValue>), BuildError> {
    let alias = "t";
    let mut params = ParamList::new();
    let where_clause = match &plan.where_tree {
        Some(tree) if !tree.is_empty_and() => format!(" WHERE {}", compile_where(tree, alias, &mut params)?),
        _ => String::new(),
    };
    let sql = format!(
        "SELECT count(*) FROM {} AS {}{where_clause}",
        qualify(&plan.schema, &plan.table),
        quote_ident(alias),
    );
    Ok((sql, params.into_values()))
}

/// Builds `INSERT INTO … (cols) VALUES (...) RETURNING *`, skipping fields
/// that were not supplied.
pub fn build_insert(
    schema: &str,
    table: &str,
    fields: &[(String, BoundValue, pg_types::FieldType)],
) -> (String, Vec<BoundValue>) {
    let mut params = ParamList::new();
    let columns: Vec<String> = fields.iter().map(|(name, _, _)| quote_ident(name)).collect();
    let placeholders: Vec<String> = fields
        .iter()
        .map(|(_, value, field_type)| bind_scalar(value, field_type, &mut params))
        .collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
        qualify(schema, table),
        columns.join(", "),
        placeholders.join(", "),
    );
    (sql, params.into_values())
}

/// Builds a multi-row `INSERT`. The column list is the union of every row's
/// field names; a row missing a field binds `NULL` for it (§4.3).
pub fn build_bulk_insert(
    schema: &str,
    table: &str,
    rows: &[Vec<(String, BoundValue, pg_types::FieldType)>],
) -> (String, Vec<BoundValue>) {
    let mut column_order: Vec<String> = Vec::new();
    for row in rows {
        for (name, _, _) in row {
            if !column_order.contains(name) {
                column_order.push(name.clone());
            }
        }
    }

    let mut params = ParamList::new();
    let mut row_fragments = Vec::with_capacity(rows.len());
    for row in rows {
        let mut placeholders = Vec::with_capacity(column_order.len());
        for column in &column_order {
            match row.iter().find(|(name, _, _)| name == column) {
                Some((_, value, field_type)) => placeholders.push(bind_scalar(value, field_type, &mut params)),
                None => placeholders.push(params.push(BoundValue::Null)),
            }
        }
        row_fragments.push(format!("({})", placeholders.join(", ")));
    }

    let columns: Vec<String> = column_order.iter().map(|c| quote_ident(c)).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES {} RETURNING *",
        qualify(schema, table),
        columns.join(", "),
        row_fragments.join(", "),
    );
    (sql, params.into_values())
}

/// Builds `UPDATE … SET … WHERE pk = … RETURNING *`. An empty result set
/// means the caller maps it to `NotFound`, not an error here.
pub fn build_update(
    schema: &str,
    table: &str,
    pk: &[(String, BoundValue, pg_types::FieldType)],
    fields: &[(String, BoundValue, pg_types::FieldType)],
) -> (String, Vec<BoundValue>) {
    let mut params = ParamList::new();
    let set_fragments: Vec<String> = fields
        .iter()
        .map(|(name, value, field_type)| {
            format!("{} = {}", quote_ident(name), bind_scalar(value, field_type, &mut params))
        })
        .collect();
    let pk_fragments: Vec<String> = pk
        .iter()
        .map(|(name, value, field_type)| {
            format!("{} = {}", quote_ident(name), bind_scalar(value, field_type, &mut params))
        })
        .collect();
    let sql = format!(
        "UPDATE {} SET {} WHERE {} RETURNING *",
        qualify(schema, table),
        set_fragments.join(", "),
        pk_fragments.join(" AND "),
    );
    (sql, params.into_values())
}

/// Builds `DELETE … WHERE pk = … RETURNING *`, used to both delete and
/// confirm prior existence in one round trip.
pub fn build_delete(
    schema: &str,
    table: &str,
    pk: &[(String, BoundValue, pg_types::FieldType)],
) -> (String, Vec<BoundValue>) {
    let mut params = ParamList::new();
    let pk_fragments: Vec<String> = pk
        .iter()
        .map(|(name, value, field_type)| {
            format!("{} = {}", quote_ident(name), bind_scalar(value, field_type, &mut params))
        })
        .collect();
    let sql = format!(
        "DELETE FROM {} WHERE {} RETURNING *",
        qualify(schema, table),
        pk_fragments.join(" AND "),
    );
    (sql, params.into_values())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use crate::filter::FieldPredicate;
    use pg_types::FieldType;

    fn predicate(column: &str, op: Operator, value: BoundValue) -> WhereTree {
        WhereTree::predicate(FieldPredicate {
            column: column.to_string(),
            field_type: FieldType::Int32,
            op,
            value: PredicateValue::Scalar(value),
        })
    }

    #[test]
    fn eq_predicate_compiles_to_equality() {
        let mut params = ParamList::new();
        let sql = compile_predicate(
            &FieldPredicate {
                column: "customer_id".to_string(),
                field_type: FieldType::Int32,
                op: Operator::Eq,
                value: PredicateValue::Scalar(BoundValue::I32(5)),
            },
            "t",
            &mut params,
        )
        .unwrap();
        assert_eq!(sql, "\"t\".\"customer_id\" = $1");
        assert_eq!(params.values(), &[BoundValue::I32(5)]);
    }

    #[test]
    fn or_composition_matches_and_with_single_branch() {
        let tree_and = WhereTree::And(vec![
            predicate("a", Operator::Eq, BoundValue::I32(1)),
            predicate("b", Operator::Eq, BoundValue::I32(2)),
        ]);
        let tree_or_single = WhereTree::Or(vec![tree_and.clone()]);
        let mut p1 = ParamList::new();
        let mut p2 = ParamList::new();
        let sql_and = compile_where(&tree_and, "t", &mut p1).unwrap();
        let sql_or = compile_where(&tree_or_single, "t", &mut p2).unwrap();
        assert_eq!(sql_and, sql_or);
    }

    #[test]
    fn empty_in_list_short_circuits_to_false() {
        let pred = FieldPredicate {
            column: "id".to_string(),
            field_type: FieldType::Int32,
            op: Operator::In,
            value: PredicateValue::List(vec![]),
        };
        let mut params = ParamList::new();
        let sql = compile_predicate(&pred, "t", &mut params).unwrap();
        assert_eq!(sql, "FALSE");
        assert!(params.values().is_empty());
    }

    #[test]
    fn keyset_after_ascending_uses_greater_than() {
        let order_by = vec![OrderBy { column: "id".to_string(), direction: SortDirection::Asc }];
        let mut params = ParamList::new();
        let sql = compile_keyset(&order_by, &[serde_json::json!(10)], "t", false, &mut params).unwrap();
        assert_eq!(sql, "((\"t\".\"id\" > $1))");
    }

    #[test]
    fn keyset_without_order_by_is_rejected() {
        let err = compile_keyset(&[], &[], "t", false, &mut ParamList::new()).unwrap_err();
        assert!(matches!(err, BuildError::CursorRequiresOrderBy));
    }

    #[test]
    fn select_plan_emits_limit_and_order_by() {
        let plan = SelectPlan {
            schema: "public".to_string(),
            table: "customer".to_string(),
            columns: vec!["customer_id".to_string()],
            where_tree: None,
            order_by: vec![OrderBy { column: "customer_id".to_string(), direction: SortDirection::Asc }],
            pagination: Pagination::Keyset { first: Some(20), after: None, last: None, before: None },
        };
        let (sql, _) = build_select(&plan).unwrap();
        assert!(sql.contains("ORDER BY \"t\".\"customer_id\" ASC"));
        assert!(sql.contains("LIMIT 20"));
    }
}
