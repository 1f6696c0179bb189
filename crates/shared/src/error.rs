use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Structured error body returned by the backend alongside a non-success status.
///
/// `detail` is usually a sentence, but request validation failures carry an
/// array of field errors instead, so it is kept as raw JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Value,
}

impl ErrorBody {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: Value::String(detail.into()),
        }
    }

    pub fn detail_text(&self) -> Option<String> {
        match &self.detail {
            Value::Null => None,
            Value::String(text) => Some(text.clone()),
            Value::Array(items) => {
                let messages: Vec<String> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect();
                if messages.is_empty() {
                    Some(self.detail.to_string())
                } else {
                    Some(messages.join("; "))
                }
            }
            other => Some(other.to_string()),
        }
    }
}
