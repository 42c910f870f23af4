use crate::batch::{fetch_matching_rows, referenced_key, JoinColumns};
use crate::error::ResolverError;
use crate::key::RowKey;
use async_graphql::dataloader::Loader;
use async_trait::async_trait;
use pg_sql::Row;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;

/// Batches the many-to-one side of a foreign key: given the local columns'
/// values from a batch of child rows, loads at most one referenced parent
/// row per key.
pub struct ManyToOneLoader {
    pub pool: PgPool,
    pub join: JoinColumns,
    pub supports_row_value_in: bool,
}

#[async_trait]
impl Loader<RowKey> for ManyToOneLoader {
    type Value = Row;
    type Error = Arc<ResolverError>;

    async fn load(&self, keys: &[RowKey]) -> Result<HashMap<RowKey, Self::Value>, Self::Error> {
        let rows = fetch_matching_rows(&self.pool, &self.join, keys, self.supports_row_value_in)
            .await
            .map_err(Arc::new)?;

        let mut out = HashMap::new();
        for row in rows {
            if let Some(key) = referenced_key(&row, &self.join.columns) {
                out.insert(key, row);
            }
        }
        Ok(out)
    }
}

/// Batches the one-to-many side: given the referenced columns' values from a
/// batch of parent rows, loads every child row for each parent, grouped by
/// key.
pub struct OneToManyLoader {
    pub pool: PgPool,
    pub join: JoinColumns,
    pub supports_row_value_in: bool,
}

#[async_trait]
impl Loader<RowKey> for OneToManyLoader {
    type Value = Vec<Row>;
    type Error = Arc<ResolverError>;

    async fn load(&self, keys: &[RowKey]) -> Result<HashMap<RowKey, Self::Value>, Self::Error> {
        let rows = fetch_matching_rows(&self.pool, &self.join, keys, self.supports_row_value_in)
            .await
            .map_err(Arc::new)?;

        let mut out: HashMap<RowKey, Vec<Row>> = HashMap::new();
        for row in rows {
            if let Some(key) = referenced_key(&row, &self.join.columns) {
                out.entry(key).or_default().push(row);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use crate::key::RowKey;

    #[test]
    fn row_key_equality_ignores_vec_allocation_identity() {
        let a = RowKey::single(serde_json::json!(1));
        let b = RowKey::single(serde_json::json!(1));
        assert_eq!(a, b);
    }
}
