use crate::param::BoundValue;
use pg_types::{FieldType, Operator};

/// A single `column op value` predicate, already resolved against the
/// catalog: the column's declared [`FieldType`] travels with it so the
/// builder never has to re-look it up.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPredicate {
    pub column: String,
    pub field_type: FieldType,
    pub op: Operator,
    pub value: PredicateValue,
}

/// The shape of the right-hand side a given [`Operator`] expects.
#[derive(Debug, Clone, PartialEq)]
pub enum PredicateValue {
    /// `isNull` / `isNotNull` — no bound parameter, just a sense flag.
    None,
    Scalar(BoundValue),
    List(Vec<BoundValue>),
}

/// The recursive filter tree a `where` argument compiles down to (§3/§4.3).
/// Each `And`/`Or` node's children are themselves trees, so arbitrary nesting
/// composes the same way the GraphQL `where` input type allows.
#[derive(Debug, Clone, PartialEq)]
pub enum WhereTree {
    And(Vec<WhereTree>),
    Or(Vec<WhereTree>),
    Predicate(Box<FieldPredicate>),
}

impl WhereTree {
    pub fn predicate(predicate: FieldPredicate) -> WhereTree {
        WhereTree::Predicate(Box::new(predicate))
    }

    pub fn is_empty_and(&self) -> bool {
        matches!(self, WhereTree::And(children) if children.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eq_predicate(column: &str, v: i32) -> WhereTree {
        WhereTree::predicate(FieldPredicate {
            column: column.to_string(),
            field_type: FieldType::Int32,
            op: Operator::Eq,
            value: PredicateValue::Scalar(BoundValue::I32(v)),
        })
    }

    #[test]
    fn and_or_nest_without_flattening() {
        let tree = WhereTree::And(vec![
            eq_predicate("a", 1),
            WhereTree::Or(vec![eq_predicate("b", 2), eq_predicate("c", 3)]),
        ]);
        match tree {
            WhereTree::And(children) => {
                assert_eq!(children.len(), 2);
                assert!(matches!(children[1], WhereTree::Or(_)));
            }
            _ => panic!("expected And"),
        }
    }
}
