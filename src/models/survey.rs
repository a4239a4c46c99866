use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A survey as listed by `list_surveys`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Survey {
    /// Numeric survey identifier (sent by the server as a string or a number)
    #[serde(deserialize_with = "numeric_id")]
    pub sid: u64,
    /// Display title
    #[serde(rename = "surveyls_title")]
    pub title: String,
}

impl Survey {
    pub fn new(sid: u64, title: impl Into<String>) -> Self {
        Self {
            sid,
            title: title.into(),
        }
    }
}

fn numeric_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| D::Error::custom(format!("invalid survey id: {}", n))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("invalid survey id: '{}'", s))),
        other => Err(D::Error::custom(format!("invalid survey id: {}", other))),
    }
}
