use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST /v1/forms`. Only the title can be set at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFormRequest {
    pub info: FormInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormInfo {
    pub title: String,
}

/// Body of `POST /v1/forms/{formId}:batchUpdate`.
///
/// The individual requests (`createItem`, `updateFormInfo`, ...) are kept as
/// raw JSON: the template file is the canonical source for their shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchUpdateRequest {
    #[serde(default)]
    pub requests: Vec<Value>,
}

impl BatchUpdateRequest {
    pub fn new(requests: Vec<Value>) -> Self {
        Self { requests }
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }
}

/// The subset of a form resource the toolkit reads back after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormMetadata {
    pub form_id: String,
    #[serde(default)]
    pub responder_uri: Option<String>,
}
