use async_graphql::dynamic::{InputObject, InputValue, TypeRef};
use pg_types::{operators_for, Operator, ScalarCategory};

/// Builds the `<Category>Filter` input type for one scalar category,
/// exposing exactly the operators [`operators_for`] allows for it (§4.3/§4.6).
/// `value_type` is the GraphQL type each scalar-valued operator argument
/// takes; list-valued operators (`in`, `notIn`, `hasAny`, `hasAll`) wrap it
/// in a list automatically.
pub fn build_filter_input(name: &str, category: ScalarCategory, value_type: TypeRef) -> InputObject {
    let mut input = InputObject::new(name);
    for op in operators_for(category) {
        let field_name = op.as_str();
        let field_type = match op {
            Operator::In | Operator::NotIn | Operator::HasAny | Operator::HasAll | Operator::HasKeys => {
                TypeRef::List(Box::new(value_type.clone()))
            }
            Operator::IsNull | Operator::IsNotNull => TypeRef::named(TypeRef::BOOLEAN),
            Operator::Length => TypeRef::named(TypeRef::INT),
            _ => value_type.clone(),
        };
        input = input.field(InputValue::new(field_name, field_type));
    }
    input
}

pub fn filter_input_name(category: ScalarCategory) -> &'static str {
    category.filter_type_name()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_filter_builds_one_field_per_allowed_operator() {
        let input = build_filter_input("BoolFilter", ScalarCategory::Bool, TypeRef::named(TypeRef::BOOLEAN));
        // `Debug` is the only thing `dynamic::InputObject` exposes publicly;
        // the operator set itself is covered directly in `pg-types`.
        assert!(format!("{input:?}").contains("BoolFilter"));
    }
}
