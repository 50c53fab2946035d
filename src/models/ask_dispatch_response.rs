use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Result or current status of a previously dispatched query.
///
/// Only `result` and `data` are typed. Every other property the server
/// sends is kept in `additional_properties` so nothing is lost on a
/// round trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AskDispatchResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(flatten)]
    pub additional_properties: Map<String, Value>,
}

impl AskDispatchResponse {
    pub fn from_payload(payload: Value) -> serde_json::Result<Self> {
        serde_json::from_value(payload)
    }

    pub fn to_payload(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// `result` as a string, when the server sent one.
    pub fn result_str(&self) -> Option<&str> {
        self.result.as_ref().and_then(Value::as_str)
    }
}
