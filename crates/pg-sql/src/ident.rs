//! The one place that decides how identifiers are quoted, so a `"` embedded
//! in a table/column name (however unlikely) is escaped consistently
//! everywhere a statement kind needs an identifier (§4.3).

/// Double-quotes an identifier, doubling any embedded quote.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Qualifies a table name with the configured schema namespace.
pub fn qualify(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_embedded_quotes() {
        assert_eq!(quote_ident(r#"weird"name"#), r#""weird""name""#);
    }

    #[test]
    fn qualifies_with_schema() {
        assert_eq!(qualify("public", "customer"), "\"public\".\"customer\"");
    }
}
