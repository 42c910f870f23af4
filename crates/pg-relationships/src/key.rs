use std::hash::{Hash, Hasher};

/// A batch key for the DataLoader: the ordered values of one side of a
/// foreign key on a single parent row. Composite keys carry more than one
/// value; simple keys carry exactly one.
#[derive(Debug, Clone)]
pub struct RowKey(pub Vec<serde_json::Value>);

impl PartialEq for RowKey {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for RowKey {}

impl Hash for RowKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for value in &self.0 {
            value.to_string().hash(state);
        }
    }
}

impl RowKey {
    pub fn single(value: serde_json::Value) -> RowKey {
        RowKey(vec![value])
    }
}
