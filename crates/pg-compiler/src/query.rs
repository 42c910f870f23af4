use crate::args::parse_args;
use crate::error::EngineError;
use pg_catalog::{CatalogSnapshot, Table};
use pg_schema::ConnectionPage;
use pg_sql::{build_count, build_select, decode_row, encode_cursor, OrderBy, Pagination, Row, SelectPlan, SortDirection};
use sqlx::PgPool;

/// Executes the plain (non-connection) list query field: resolves `args`
/// against `table`, builds and runs one `SELECT`, and decodes every row
/// (§4.7 steps 1-5, minus pagination metadata).
pub async fn list(pool: &PgPool, snapshot: &CatalogSnapshot, table: &Table, args: serde_json::Value) -> Result<Vec<Row>, EngineError> {
    let parsed = parse_args(table, &args)?;

    let plan = SelectPlan {
        schema: snapshot.schema.clone(),
        table: table.name.clone(),
        columns: Vec::new(),
        where_tree: parsed.where_tree,
        order_by: parsed.order_by,
        pagination: parsed.pagination,
    };

    let (sql, params) = build_select(&plan).map_err(EngineError::from)?;
    let mut query = sqlx::query(&sql);
    for param in &params {
        query = crate::executor::bind_param(query, param);
    }
    let rows = query.fetch_all(pool).await.map_err(EngineError::from)?;
    let composites = snapshot.composite_registry();
    rows.iter().map(|r| decode_row(r, &composites).map_err(EngineError::from)).collect()
}

/// Executes the connection (Relay-style) list query field: fetches one extra
/// row beyond the requested page size to determine `hasNextPage`/
/// `hasPreviousPage` without a second round trip, then truncates it back off
/// (§4.6, §8 pagination law).
pub async fn connection(pool: &PgPool, snapshot: &CatalogSnapshot, table: &Table, args: serde_json::Value) -> Result<ConnectionPage, EngineError> {
    let parsed = parse_args(table, &args)?;

    let order_by = if parsed.order_by.is_empty() {
        default_order_by(table)?
    } else {
        parsed.order_by
    };

    let fetch_pagination = widen_for_lookahead(&parsed.pagination);

    let plan = SelectPlan {
        schema: snapshot.schema.clone(),
        table: table.name.clone(),
        columns: Vec::new(),
        where_tree: parsed.where_tree.clone(),
        order_by: order_by.clone(),
        pagination: fetch_pagination,
    };

    let (sql, params) = build_select(&plan).map_err(EngineError::from)?;
    let mut query = sqlx::query(&sql);
    for param in &params {
        query = crate::executor::bind_param(query, param);
    }
    let fetched = query.fetch_all(pool).await.map_err(EngineError::from)?;
    let composites = snapshot.composite_registry();
    let mut rows: Vec<Row> = fetched.iter().map(|r| decode_row(r, &composites)).collect::<Result<_, _>>().map_err(EngineError::from)?;

    let requested = requested_page_size(&parsed.pagination);
    let is_backward = matches!(parsed.pagination, Pagination::Keyset { last: Some(_), .. });

    let has_extra = requested.map(|n| rows.len() > n as usize).unwrap_or(false);
    if has_extra {
        if is_backward {
            rows.remove(0);
        } else {
            rows.pop();
        }
    }
    if is_backward {
        rows.reverse();
    }

    let (has_next_page, has_previous_page) = match (&parsed.pagination, is_backward) {
        (Pagination::Keyset { after: Some(_), .. }, false) => (has_extra, true),
        (Pagination::Keyset { .. }, false) => (has_extra, false),
        (Pagination::Keyset { before: Some(_), .. }, true) => (true, has_extra),
        (Pagination::Keyset { .. }, true) => (false, has_extra),
        _ => (has_extra, false),
    };

    let columns: Vec<String> = order_by.iter().map(|o| o.column.clone()).collect();
    let edges: Vec<(Row, String)> = rows
        .into_iter()
        .map(|row| {
            let values: Vec<serde_json::Value> = columns.iter().map(|c| row.get(c).cloned().unwrap_or(serde_json::Value::Null)).collect();
            let cursor = encode_cursor(&columns, &values);
            (row, cursor)
        })
        .collect();

    let count_plan = SelectPlan {
        schema: snapshot.schema.clone(),
        table: table.name.clone(),
        columns: Vec::new(),
        where_tree: parsed.where_tree,
        order_by: Vec::new(),
        pagination: Pagination::None,
    };
    let (count_sql, count_params) = build_count(&count_plan).map_err(EngineError::from)?;
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for param in &count_params {
        count_query = crate::executor::bind_scalar_query(count_query, param);
    }
    let total_count = count_query.fetch_one(pool).await.map_err(EngineError::from)?;

    Ok(ConnectionPage { edges, has_next_page, has_previous_page, total_count })
}

/// A connection field with no `orderBy` still needs a deterministic cursor
/// column; the primary key is the natural choice since it's always unique.
fn default_order_by(table: &Table) -> Result<Vec<OrderBy>, EngineError> {
    let pk = table.primary_key_columns();
    if pk.is_empty() {
        return Err(EngineError::NoPrimaryKey(table.name.clone()));
    }
    Ok(pk.into_iter().map(|c| OrderBy { column: c.name.clone(), direction: SortDirection::Asc }).collect())
}

/// Requests one extra row beyond `first`/`last` so the caller can tell
/// whether another page exists without a second query.
fn widen_for_lookahead(pagination: &Pagination) -> Pagination {
    match pagination {
        Pagination::Keyset { first: Some(n), after, last, before } => {
            Pagination::Keyset { first: Some(n + 1), after: after.clone(), last: *last, before: before.clone() }
        }
        Pagination::Keyset { first, after, last: Some(n), before } => {
            Pagination::Keyset { first: *first, after: after.clone(), last: Some(n + 1), before: before.clone() }
        }
        other => other.clone(),
    }
}

fn requested_page_size(pagination: &Pagination) -> Option<i64> {
    match pagination {
        Pagination::Keyset { first: Some(n), .. } => Some(*n),
        Pagination::Keyset { last: Some(n), .. } => Some(*n),
        _ => None,
    }
}
