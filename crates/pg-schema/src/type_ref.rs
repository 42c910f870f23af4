use async_graphql::dynamic::TypeRef;
use pg_types::FieldType;

/// Maps a column's [`FieldType`] to the scalar `TypeRef` it projects as.
/// Composite and enum types project under their own declared name, which
/// the caller must have registered separately.
pub fn scalar_type_ref(field_type: &FieldType) -> TypeRef {
    match field_type {
        FieldType::Int32 => TypeRef::named(TypeRef::INT),
        FieldType::Int64 => TypeRef::named(TypeRef::STRING),
        FieldType::Float | FieldType::Numeric => TypeRef::named(TypeRef::FLOAT),
        FieldType::Bool => TypeRef::named(TypeRef::BOOLEAN),
        FieldType::Text
        | FieldType::Uuid
        | FieldType::Date
        | FieldType::Time
        | FieldType::TimeTz
        | FieldType::Timestamp
        | FieldType::TimestampTz
        | FieldType::Interval
        | FieldType::Bytea
        | FieldType::Inet
        | FieldType::Cidr
        | FieldType::MacAddr
        | FieldType::Xml => TypeRef::named(TypeRef::STRING),
        FieldType::Json => TypeRef::named("JSON"),
        FieldType::Array(element) => TypeRef::List(Box::new(scalar_type_ref(element))),
        FieldType::Enum(name) => TypeRef::named(name.clone()),
        FieldType::Composite(name) => TypeRef::named(name.clone()),
    }
}

/// Wraps `inner` as non-null when `nullable` is false — the column-nullability
/// to field-nullability mapping from §4.6.
pub fn field_type_ref(field_type: &FieldType, nullable: bool) -> TypeRef {
    let inner = scalar_type_ref(field_type);
    if nullable {
        inner
    } else {
        non_null(inner)
    }
}

fn non_null(type_ref: TypeRef) -> TypeRef {
    match type_ref {
        TypeRef::Named(name) => TypeRef::NonNull(Box::new(TypeRef::Named(name))),
        TypeRef::List(inner) => TypeRef::NonNull(Box::new(TypeRef::List(inner))),
        already_non_null @ TypeRef::NonNull(_) => already_non_null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int64_projects_as_a_string_to_avoid_precision_loss() {
        // GraphQL's Int is 32-bit; bigint columns would silently truncate.
        matches!(scalar_type_ref(&FieldType::Int64), TypeRef::Named(_));
    }

    #[test]
    fn nullable_columns_are_not_wrapped_non_null() {
        let type_ref = field_type_ref(&FieldType::Int32, true);
        assert!(matches!(type_ref, TypeRef::Named(_)));
    }

    #[test]
    fn non_nullable_columns_are_wrapped() {
        let type_ref = field_type_ref(&FieldType::Int32, false);
        assert!(matches!(type_ref, TypeRef::NonNull(_)));
    }
}
