//! Resolves foreign-key traversals as batched lookups so each relationship
//! field costs at most one query per parent batch, regardless of result
//! size (§4.5).

mod batch;
mod error;
mod key;
mod loaders;

pub use batch::{fetch_matching_rows, local_key, referenced_key, JoinColumns};
pub use error::ResolverError;
pub use key::RowKey;
pub use loaders::{ManyToOneLoader, OneToManyLoader};

/// Postgres added row-value `IN ((a, b), (c, d))` comparisons well before any
/// version this crate targets; the flag exists so [`batch::fetch_matching_rows`]
/// has a tested fallback path, not because the cutoff is expected to matter
/// in practice (§4.5).
pub fn supports_row_value_in(server_version_num: i32) -> bool {
    server_version_num >= 90000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modern_postgres_supports_row_value_in() {
        assert!(supports_row_value_in(150003));
    }

    #[test]
    fn ancient_postgres_falls_back() {
        assert!(!supports_row_value_in(80400));
    }
}
