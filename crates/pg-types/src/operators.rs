use crate::FieldType;

/// The groups of scalar types that share a filter-operator set and a
/// generated `<Category>Filter` GraphQL input type (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarCategory {
    Numeric,
    Bool,
    Text,
    Uuid,
    DateTime,
    Interval,
    Network,
    Json,
    Xml,
    Binary,
    Enum,
    Composite,
    Array,
}

impl ScalarCategory {
    pub fn of(ty: &FieldType) -> ScalarCategory {
        match ty {
            FieldType::Int32 | FieldType::Int64 | FieldType::Float | FieldType::Numeric => {
                ScalarCategory::Numeric
            }
            FieldType::Bool => ScalarCategory::Bool,
            FieldType::Text => ScalarCategory::Text,
            FieldType::Uuid => ScalarCategory::Uuid,
            FieldType::Date
            | FieldType::Time
            | FieldType::TimeTz
            | FieldType::Timestamp
            | FieldType::TimestampTz => ScalarCategory::DateTime,
            FieldType::Interval => ScalarCategory::Interval,
            FieldType::Inet | FieldType::Cidr | FieldType::MacAddr => ScalarCategory::Network,
            FieldType::Json => ScalarCategory::Json,
            FieldType::Xml => ScalarCategory::Xml,
            FieldType::Bytea => ScalarCategory::Binary,
            FieldType::Enum(_) => ScalarCategory::Enum,
            FieldType::Composite(_) => ScalarCategory::Composite,
            FieldType::Array(_) => ScalarCategory::Array,
        }
    }

    /// The name of the generated GraphQL filter input type for this
    /// category, e.g. `IntFilter`, `JsonFilter`.
    pub fn filter_type_name(&self) -> &'static str {
        match self {
            ScalarCategory::Numeric => "NumericFilter",
            ScalarCategory::Bool => "BooleanFilter",
            ScalarCategory::Text => "TextFilter",
            ScalarCategory::Uuid => "UuidFilter",
            ScalarCategory::DateTime => "DateTimeFilter",
            ScalarCategory::Interval => "IntervalFilter",
            ScalarCategory::Network => "NetworkFilter",
            ScalarCategory::Json => "JsonFilter",
            ScalarCategory::Xml => "XmlFilter",
            ScalarCategory::Binary => "BinaryFilter",
            ScalarCategory::Enum => "EnumFilter",
            ScalarCategory::Composite => "CompositeFilter",
            ScalarCategory::Array => "ArrayFilter",
        }
    }
}

/// One recognized filter operator (§4.3, §6). Availability is a static map
/// keyed by [`ScalarCategory`] rather than an inheritance hierarchy (Design
/// Notes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    ILike,
    Contains,
    StartsWith,
    EndsWith,
    In,
    NotIn,
    IsNull,
    IsNotNull,
    HasKey,
    HasKeys,
    ContainedBy,
    Path,
    PathText,
    HasAny,
    HasAll,
    Length,
}

impl Operator {
    /// The argument-key spelling used in GraphQL input objects, e.g. `eq`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Neq => "neq",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Like => "like",
            Operator::ILike => "ilike",
            Operator::Contains => "contains",
            Operator::StartsWith => "startsWith",
            Operator::EndsWith => "endsWith",
            Operator::In => "in",
            Operator::NotIn => "notIn",
            Operator::IsNull => "isNull",
            Operator::IsNotNull => "isNotNull",
            Operator::HasKey => "hasKey",
            Operator::HasKeys => "hasKeys",
            Operator::ContainedBy => "containedBy",
            Operator::Path => "path",
            Operator::PathText => "pathText",
            Operator::HasAny => "hasAny",
            Operator::HasAll => "hasAll",
            Operator::Length => "length",
        }
    }

    pub fn from_str(s: &str) -> Option<Operator> {
        Some(match s {
            "eq" => Operator::Eq,
            "neq" => Operator::Neq,
            "gt" => Operator::Gt,
            "gte" => Operator::Gte,
            "lt" => Operator::Lt,
            "lte" => Operator::Lte,
            "like" => Operator::Like,
            "ilike" => Operator::ILike,
            "contains" => Operator::Contains,
            "startsWith" => Operator::StartsWith,
            "endsWith" => Operator::EndsWith,
            "in" => Operator::In,
            "notIn" => Operator::NotIn,
            "isNull" => Operator::IsNull,
            "isNotNull" => Operator::IsNotNull,
            "hasKey" => Operator::HasKey,
            "hasKeys" => Operator::HasKeys,
            "containedBy" => Operator::ContainedBy,
            "path" => Operator::Path,
            "pathText" => Operator::PathText,
            "hasAny" => Operator::HasAny,
            "hasAll" => Operator::HasAll,
            "length" => Operator::Length,
            _ => return None,
        })
    }
}

const COMPARISON: &[Operator] = &[
    Operator::Eq,
    Operator::Neq,
    Operator::Gt,
    Operator::Gte,
    Operator::Lt,
    Operator::Lte,
    Operator::In,
    Operator::NotIn,
    Operator::IsNull,
    Operator::IsNotNull,
];

/// Returns the operators valid for a given scalar category (§4.3 table plus
/// the JSON/XML extensions in §6).
pub fn operators_for(category: ScalarCategory) -> &'static [Operator] {
    match category {
        ScalarCategory::Numeric | ScalarCategory::Uuid | ScalarCategory::DateTime => COMPARISON,
        ScalarCategory::Bool => &[Operator::Eq, Operator::Neq, Operator::IsNull, Operator::IsNotNull],
        ScalarCategory::Interval => COMPARISON,
        ScalarCategory::Enum => &[
            Operator::Eq,
            Operator::Neq,
            Operator::In,
            Operator::NotIn,
            Operator::IsNull,
            Operator::IsNotNull,
        ],
        ScalarCategory::Text => &[
            Operator::Eq,
            Operator::Neq,
            Operator::Gt,
            Operator::Gte,
            Operator::Lt,
            Operator::Lte,
            Operator::In,
            Operator::NotIn,
            Operator::Like,
            Operator::ILike,
            Operator::Contains,
            Operator::StartsWith,
            Operator::EndsWith,
            Operator::IsNull,
            Operator::IsNotNull,
            Operator::Length,
        ],
        ScalarCategory::Network => &[
            Operator::Eq,
            Operator::Neq,
            Operator::Contains,
            Operator::StartsWith,
            Operator::EndsWith,
            Operator::ContainedBy,
            Operator::IsNull,
            Operator::IsNotNull,
        ],
        ScalarCategory::Json => &[
            Operator::Eq,
            Operator::Neq,
            Operator::Contains,
            Operator::HasKey,
            Operator::HasKeys,
            Operator::ContainedBy,
            Operator::Path,
            Operator::PathText,
            Operator::IsNull,
            Operator::IsNotNull,
        ],
        ScalarCategory::Xml => &[
            Operator::Eq,
            Operator::Neq,
            Operator::Contains,
            Operator::IsNull,
            Operator::IsNotNull,
        ],
        ScalarCategory::Binary => &[Operator::Eq, Operator::Neq, Operator::IsNull, Operator::IsNotNull, Operator::Length],
        ScalarCategory::Composite => &[Operator::Eq, Operator::Neq, Operator::IsNull, Operator::IsNotNull],
        ScalarCategory::Array => &[
            Operator::Contains,
            Operator::ContainedBy,
            Operator::HasAny,
            Operator::HasAll,
            Operator::IsNull,
            Operator::IsNotNull,
            Operator::Length,
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_round_trips_through_its_string_form() {
        for op in [Operator::Eq, Operator::StartsWith, Operator::HasKeys, Operator::PathText] {
            assert_eq!(Operator::from_str(op.as_str()), Some(op));
        }
    }

    #[test]
    fn json_category_exposes_path_operators() {
        let ops = operators_for(ScalarCategory::Json);
        assert!(ops.contains(&Operator::Path));
        assert!(ops.contains(&Operator::PathText));
        assert!(!ops.contains(&Operator::Like));
    }

    #[test]
    fn bool_category_has_no_ordering_operators() {
        let ops = operators_for(ScalarCategory::Bool);
        assert!(!ops.contains(&Operator::Gt));
    }
}
