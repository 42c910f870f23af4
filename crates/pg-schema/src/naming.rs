//! Every generated GraphQL name lives behind one of these functions so the
//! spelling stays consistent between the type that declares a shape and the
//! field that references it.

pub fn pascal_case(table: &str) -> String {
    table
        .split(|c: char| c == '_' || c == '-')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

pub fn camel_case(table: &str) -> String {
    let pascal = pascal_case(table);
    let mut chars = pascal.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

pub fn object_type_name(table: &str) -> String {
    pascal_case(table)
}

pub fn query_field_name(table: &str) -> String {
    camel_case(table)
}

pub fn connection_field_name(table: &str) -> String {
    format!("{}Connection", camel_case(table))
}

pub fn connection_type_name(table: &str) -> String {
    format!("{}Connection", pascal_case(table))
}

pub fn edge_type_name(table: &str) -> String {
    format!("{}Edge", pascal_case(table))
}

pub fn where_input_name(table: &str) -> String {
    format!("{}WhereInput", pascal_case(table))
}

pub fn order_by_input_name(table: &str) -> String {
    format!("{}OrderBy", pascal_case(table))
}

pub fn create_input_name(table: &str) -> String {
    format!("{}CreateInput", pascal_case(table))
}

pub fn update_input_name(table: &str) -> String {
    format!("{}UpdateInput", pascal_case(table))
}

pub fn create_with_relationships_input_name(table: &str) -> String {
    format!("{}CreateWithRelationshipsInput", pascal_case(table))
}

pub fn create_mutation_name(table: &str) -> String {
    format!("create{}", pascal_case(table))
}

pub fn bulk_create_mutation_name(table: &str) -> String {
    format!("bulkCreate{}", pascal_case(table))
}

pub fn update_mutation_name(table: &str) -> String {
    format!("update{}", pascal_case(table))
}

pub fn delete_mutation_name(table: &str) -> String {
    format!("delete{}", pascal_case(table))
}

pub fn create_with_relationships_mutation_name(table: &str) -> String {
    format!("create{}WithRelationships", pascal_case(table))
}

pub fn subscription_field_name(table: &str) -> String {
    camel_case(table)
}

pub fn enum_type_name(name: &str) -> String {
    pascal_case(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn pascal_case_splits_on_underscore() {
        assert_eq!(pascal_case("order_item"), "OrderItem");
    }

    #[test]
    fn camel_case_lowercases_the_first_letter_only() {
        assert_eq!(camel_case("order_item"), "orderItem");
    }

    #[test]
    fn connection_names_are_derived_from_the_table_name() {
        assert_eq!(connection_type_name("customer"), "CustomerConnection");
        assert_eq!(connection_field_name("customer"), "customerConnection");
    }
}
