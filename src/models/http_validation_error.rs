use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of a 422 response: the server rejected the request parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpValidationError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Vec<ValidationError>>,
    #[serde(flatten)]
    pub additional_properties: Map<String, Value>,
}

impl HttpValidationError {
    pub fn from_payload(payload: Value) -> serde_json::Result<Self> {
        serde_json::from_value(payload)
    }

    pub fn to_payload(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    pub fn messages(&self) -> Vec<&str> {
        self.detail
            .iter()
            .flatten()
            .map(|e| e.msg.as_str())
            .collect()
    }
}

/// One rejected field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    pub loc: Vec<LocationItem>,
    pub msg: String,
    #[serde(rename = "type")]
    pub error_type: String,
    #[serde(flatten)]
    pub additional_properties: Map<String, Value>,
}

/// Path segment of a validation error location, e.g. `["query", "dispatch_id"]`
/// or `["body", "items", 0]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocationItem {
    Index(i64),
    Name(String),
}

impl std::fmt::Display for LocationItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocationItem::Index(i) => write!(f, "{i}"),
            LocationItem::Name(n) => f.write_str(n),
        }
    }
}
