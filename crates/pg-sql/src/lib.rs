//! Compiles resolved `WhereTree`/orderBy/pagination arguments into
//! parameterized SQL text and its positional bindings (§4.3/§4.4).

mod builder;
mod cursor;
mod error;
mod filter;
mod ident;
mod param;
mod rowdecode;

pub use builder::{
    build_bulk_insert, build_count, build_delete, build_insert, build_select, build_update,
    compile_predicate, compile_where, OrderBy, ParamList, Pagination, SelectPlan, SortDirection,
};
pub use cursor::{decode_cursor, encode_cursor};
pub use error::BuildError;
pub use filter::{FieldPredicate, PredicateValue, WhereTree};
pub use ident::{qualify, quote_ident};
pub use param::{bind_value, BoundValue};
pub use rowdecode::{decode_row, CompositeRegistry};

/// A decoded result row, keyed by column name. The concrete shape every
/// layer above the driver passes rows around as, since the column set is
/// only known at runtime.
pub type Row = std::collections::HashMap<String, serde_json::Value>;

#[cfg(test)]
mod property_tests {
    use super::*;
    use pg_types::{FieldType, Operator};
    use quickcheck_macros::quickcheck;

    /// Every bound value a caller hands to `compile_predicate` ends up behind
    /// a `$n` placeholder, never interpolated into the SQL text itself —
    /// the parametric-safety property from §8.
    #[quickcheck]
    fn text_values_never_appear_literally_in_the_generated_sql(text: String) -> bool {
        if text.is_empty() || text.contains('\'') {
            return true;
        }
        let predicate = FieldPredicate {
            column: "name".to_string(),
            field_type: FieldType::Text,
            op: Operator::Eq,
            value: PredicateValue::Scalar(BoundValue::Text(text.clone())),
        };
        let mut params = ParamList::new();
        let sql = compile_predicate(&predicate, "t", &mut params).unwrap();
        !sql.contains(&text)
    }

    /// `where: {A, B}` (an implicit AND) and `or: [{A, B}]` (a single-branch
    /// OR wrapping the same AND) must compile to the same boolean expression
    /// — the OR/AND composition law from §8.
    #[quickcheck]
    fn single_branch_or_matches_bare_and(a: i32, b: i32) -> bool {
        let and_tree = WhereTree::And(vec![
            WhereTree::predicate(FieldPredicate {
                column: "a".to_string(),
                field_type: FieldType::Int32,
                op: Operator::Eq,
                value: PredicateValue::Scalar(BoundValue::I32(a)),
            }),
            WhereTree::predicate(FieldPredicate {
                column: "b".to_string(),
                field_type: FieldType::Int32,
                op: Operator::Eq,
                value: PredicateValue::Scalar(BoundValue::I32(b)),
            }),
        ]);
        let or_tree = WhereTree::Or(vec![and_tree.clone()]);
        let mut p1 = ParamList::new();
        let mut p2 = ParamList::new();
        compile_where(&and_tree, "t", &mut p1).unwrap() == compile_where(&or_tree, "t", &mut p2).unwrap()
    }
}
