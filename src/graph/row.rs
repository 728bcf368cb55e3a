//! Result rows and query parameters for Cypher execution.

use serde_json::{Map, Value};
use std::collections::HashMap;

/// Query parameters, bound by name (`$name`).
pub type Params = HashMap<String, Value>;

/// One record returned by a Cypher query.
///
/// Columns keep the order of the `RETURN` clause, which table output relies on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    data: Map<String, Value>,
}

impl Row {
    pub fn new(data: Map<String, Value>) -> Self {
        Self { data }
    }

    /// Column names in `RETURN` order.
    pub fn columns(&self) -> Vec<String> {
        self.data.keys().cloned().collect()
    }

    /// Consumes the row, keeping only one column.
    pub fn take(mut self, column: &str) -> Option<Value> {
        self.data.remove(column)
    }

    pub fn into_object(self) -> Map<String, Value> {
        self.data
    }
}
