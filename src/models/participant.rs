use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A survey participant as listed by `list_participants`.
///
/// Requested attributes (such as `attribute_1`) arrive as extra top-level
/// fields and are kept in `attributes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    #[serde(default)]
    pub tid: Value,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Participant {
    /// Returns a string attribute as stored, unless it is blank.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }
}
