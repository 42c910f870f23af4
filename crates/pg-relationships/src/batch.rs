use crate::error::ResolverError;
use crate::key::RowKey;
use pg_sql::{bind_value, decode_row, qualify, quote_ident, BoundValue, CompositeRegistry, Row};
use pg_types::FieldType;
use sqlx::PgPool;
use std::sync::Arc;

/// Describes one side of a foreign key traversal: which columns on the
/// referenced table to match against the batch of keys collected from the
/// parent rows.
#[derive(Debug, Clone)]
pub struct JoinColumns {
    pub schema: String,
    pub table: String,
    pub columns: Vec<String>,
    pub field_types: Vec<FieldType>,
    /// The whole schema's composite attribute lists, so a composite-typed
    /// column on the referenced table decodes the same way it would from a
    /// direct query. Shared rather than re-derived per batch since it's
    /// schema-wide, not join-specific.
    pub composites: Arc<CompositeRegistry>,
}

/// Issues exactly one `SELECT … WHERE (col1, col2) IN ((v1, v2), …)` for the
/// whole batch (§4.5 point 2), using Postgres row-value `IN` when available
/// and falling back to a disjunction of per-row `AND`s otherwise.
pub async fn fetch_matching_rows(
    pool: &PgPool,
    join: &JoinColumns,
    keys: &[RowKey],
    supports_row_value_in: bool,
) -> Result<Vec<Row>, ResolverError> {
    if keys.is_empty() {
        return Ok(Vec::new());
    }

    let mut params: Vec<BoundValue> = Vec::new();
    let predicate = if supports_row_value_in {
        row_value_in(join, keys, &mut params)?
    } else {
        disjunction_of_ands(join, keys, &mut params)?
    };

    let alias = "j";
    let sql = format!(
        "SELECT {}.* FROM {} AS {} WHERE {}",
        quote_ident(alias),
        qualify(&join.schema, &join.table),
        quote_ident(alias),
        predicate,
    );

    let mut query = sqlx::query(&sql);
    for param in &params {
        query = bind_param(query, param);
    }

    let rows = query.fetch_all(pool).await?;
    rows.iter().map(|r| decode_row(r, &join.composites)).collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

fn row_value_in(join: &JoinColumns, keys: &[RowKey], params: &mut Vec<BoundValue>) -> Result<String, ResolverError> {
    let columns: Vec<String> = join.columns.iter().map(|c| quote_ident(c)).collect();
    let mut tuples = Vec::with_capacity(keys.len());
    for key in keys {
        let mut placeholders = Vec::with_capacity(key.0.len());
        for (value, field_type) in key.0.iter().zip(&join.field_types) {
            let bound = bind_value(field_type, value)?;
            params.push(bound);
            placeholders.push(format!("${}", params.len()));
        }
        tuples.push(format!("({})", placeholders.join(", ")));
    }
    Ok(format!("({}) IN ({})", columns.join(", "), tuples.join(", ")))
}

fn disjunction_of_ands(join: &JoinColumns, keys: &[RowKey], params: &mut Vec<BoundValue>) -> Result<String, ResolverError> {
    let mut clauses = Vec::with_capacity(keys.len());
    for key in keys {
        let mut parts = Vec::with_capacity(key.0.len());
        for ((column, value), field_type) in join.columns.iter().zip(&key.0).zip(&join.field_types) {
            let bound = bind_value(field_type, value)?;
            params.push(bound);
            parts.push(format!("{} = ${}", quote_ident(column), params.len()));
        }
        clauses.push(format!("({})", parts.join(" AND ")));
    }
    Ok(format!("({})", clauses.join(" OR ")))
}

fn bind_param<'q>(
    query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    param: &'q BoundValue,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    match param {
        BoundValue::Null => query.bind(Option::<String>::None),
        BoundValue::Bool(b) => query.bind(*b),
        BoundValue::I32(v) => query.bind(*v),
        BoundValue::I64(v) => query.bind(*v),
        BoundValue::F64(v) => query.bind(*v),
        BoundValue::Uuid(u) => query.bind(*u),
        BoundValue::Text(s) => query.bind(s),
        BoundValue::Cast(s) => query.bind(s),
    }
}

/// Extracts the local-side key value(s) for `row` per `local_columns`. A
/// foreign-key column missing from the parent selection resolves the
/// relationship to `None` rather than erroring (§4.5).
pub fn local_key(row: &Row, local_columns: &[String]) -> Option<RowKey> {
    let mut values = Vec::with_capacity(local_columns.len());
    for column in local_columns {
        values.push(row.get(column)?.clone());
    }
    Some(RowKey(values))
}

/// Extracts the referenced-side key value(s) from a fetched row, used to map
/// results back onto the batch's keys.
pub fn referenced_key(row: &Row, referenced_columns: &[String]) -> Option<RowKey> {
    local_key(row, referenced_columns)
}
