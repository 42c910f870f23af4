//! The bulk introspection queries behind `reflect()`. Every query here takes
//! the whole schema (or the whole table-name set) at once — §4.1 is explicit
//! that the reflector must not introspect one table at a time.

use sqlx::{PgPool, Row};
use std::collections::HashMap;

pub struct RawTable {
    pub name: String,
    pub is_view: bool,
    pub is_materialized: bool,
}

/// One query for base tables, one (unioned) query for views and materialized
/// views, per §4.1 step (a)/(b).
pub async fn load_tables(pool: &PgPool, schema: &str) -> sqlx::Result<Vec<RawTable>> {
    let rows = sqlx::query(
        r#"
        select table_name as name, 'base' as kind
        from information_schema.tables
        where table_schema = $1 and table_type = 'BASE TABLE'
        union all
        select table_name as name, 'view' as kind
        from information_schema.views
        where table_schema = $1
        union all
        select matviewname as name, 'materialized' as kind
        from pg_matviews
        where schemaname = $1
        order by name
        "#,
    )
    .bind(schema)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let kind: String = row.get("kind");
            RawTable {
                name: row.get("name"),
                is_view: kind == "view" || kind == "materialized",
                is_materialized: kind == "materialized",
            }
        })
        .collect())
}

pub struct RawColumn {
    pub table_name: String,
    pub column_name: String,
    pub ordinal: i32,
    pub nullable: bool,
    pub declared_type: String,
    pub domain_of: Option<String>,
}

/// One bulk query across every table name given, per §4.1 step (c)/(d).
/// Domain-aliased columns are resolved to their base type here, before
/// anything downstream ever sees the alias (§3, §4.1).
pub async fn load_columns(pool: &PgPool, schema: &str, table_names: &[String]) -> sqlx::Result<Vec<RawColumn>> {
    if table_names.is_empty() {
        return Ok(Vec::new());
    }
    let rows = sqlx::query(
        r#"
        select
            c.table_name,
            c.column_name,
            c.ordinal_position::int4 as ordinal,
            (c.is_nullable = 'YES') as nullable,
            coalesce(bt.typname, c.udt_name) as declared_type,
            case when bt.typname is not null then c.udt_name else null end as domain_of
        from information_schema.columns c
        left join pg_type t on t.typname = c.udt_name
        left join pg_type bt on t.typtype = 'd' and bt.oid = t.typbasetype
        where c.table_schema = $1 and c.table_name = any($2)
        order by c.table_name, c.ordinal_position
        "#,
    )
    .bind(schema)
    .bind(table_names)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| RawColumn {
            table_name: row.get("table_name"),
            column_name: row.get("column_name"),
            ordinal: row.get("ordinal"),
            nullable: row.get("nullable"),
            declared_type: row.get("declared_type"),
            domain_of: row.get("domain_of"),
        })
        .collect())
}

/// One bulk query for every primary key column across the schema (§4.1 step (e)).
pub async fn load_primary_keys(pool: &PgPool, schema: &str) -> sqlx::Result<HashMap<String, Vec<String>>> {
    let rows = sqlx::query(
        r#"
        select
            t.relname as table_name,
            a.attname as column_name
        from pg_index i
        join pg_class t on t.oid = i.indrelid
        join pg_namespace n on n.oid = t.relnamespace
        join pg_attribute a on a.attrelid = i.indrelid and a.attnum = any(i.indkey)
        where n.nspname = $1 and i.indisprimary
        order by t.relname, array_position(i.indkey, a.attnum)
        "#,
    )
    .bind(schema)
    .fetch_all(pool)
    .await?;

    let mut out: HashMap<String, Vec<String>> = HashMap::new();
    for row in rows {
        let table: String = row.get("table_name");
        let column: String = row.get("column_name");
        out.entry(table).or_default().push(column);
    }
    Ok(out)
}

pub struct RawForeignKey {
    pub table_name: String,
    pub constraint_name: String,
    pub local_columns: Vec<String>,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
}

/// One bulk query for every foreign key across the schema (§4.1 step (f)).
pub async fn load_foreign_keys(pool: &PgPool, schema: &str) -> sqlx::Result<Vec<RawForeignKey>> {
    let rows = sqlx::query(
        r#"
        select
            c.conname as constraint_name,
            t1.relname as table_name,
            t2.relname as referenced_table,
            array_agg(a1.attname order by array_position(c.conkey, a1.attnum)) as local_columns,
            array_agg(a2.attname order by array_position(c.confkey, a2.attnum)) as referenced_columns
        from pg_constraint c
        join pg_class t1 on t1.oid = c.conrelid
        join pg_namespace n1 on n1.oid = t1.relnamespace
        join pg_class t2 on t2.oid = c.confrelid
        join pg_attribute a1 on a1.attrelid = c.conrelid and a1.attnum = any(c.conkey)
        join pg_attribute a2 on a2.attrelid = c.confrelid and a2.attnum = any(c.confkey)
        where c.contype = 'f' and n1.nspname = $1
        group by c.conname, t1.relname, t2.relname, c.conrelid
        "#,
    )
    .bind(schema)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| RawForeignKey {
            constraint_name: row.get("constraint_name"),
            table_name: row.get("table_name"),
            referenced_table: row.get("referenced_table"),
            local_columns: row.get("local_columns"),
            referenced_columns: row.get("referenced_columns"),
        })
        .collect())
}

pub struct RawEnum {
    pub name: String,
    pub value: String,
    pub sort_order: f32,
}

pub async fn load_enum_types(pool: &PgPool, schema: &str) -> sqlx::Result<Vec<RawEnum>> {
    let rows = sqlx::query(
        r#"
        select t.typname as name, e.enumlabel as value, e.enumsortorder as sort_order
        from pg_type t
        join pg_namespace n on n.oid = t.typnamespace
        join pg_enum e on e.enumtypid = t.oid
        where n.nspname = $1
        order by t.typname, e.enumsortorder
        "#,
    )
    .bind(schema)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| RawEnum {
            name: row.get("name"),
            value: row.get("value"),
            sort_order: row.get("sort_order"),
        })
        .collect())
}

pub struct RawCompositeAttr {
    pub type_name: String,
    pub attr_name: String,
    pub declared_type: String,
    pub nullable: bool,
    pub ordinal: i16,
}

pub async fn load_composite_types(pool: &PgPool, schema: &str) -> sqlx::Result<Vec<RawCompositeAttr>> {
    let rows = sqlx::query(
        r#"
        select
            t.typname as type_name,
            a.attname as attr_name,
            format_type(a.atttypid, a.atttypmod) as declared_type,
            not a.attnotnull as nullable,
            a.attnum as ordinal
        from pg_type t
        join pg_namespace n on n.oid = t.typnamespace
        join pg_class c on c.oid = t.typrelid
        join pg_attribute a on a.attrelid = c.oid
        where n.nspname = $1 and t.typtype = 'c' and a.attnum > 0 and not a.attisdropped
        order by t.typname, a.attnum
        "#,
    )
    .bind(schema)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| RawCompositeAttr {
            type_name: row.get("type_name"),
            attr_name: row.get("attr_name"),
            declared_type: row.get("declared_type"),
            nullable: row.get("nullable"),
            ordinal: row.get("ordinal"),
        })
        .collect())
}
