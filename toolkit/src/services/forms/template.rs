use super::FormsError;
use common::model::form::BatchUpdateRequest;
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::Path;

/// Title plus the `batchUpdate` body that builds the rest of a form.
///
/// Template documents look like
/// `{"title_header": {"info": {"title": ...}}, "form_body": {"requests": [...]}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct GoogleFormTemplate {
    pub title: String,
    pub batch_update: BatchUpdateRequest,
}

impl GoogleFormTemplate {
    pub fn new(title: impl Into<String>) -> Self {
        GoogleFormTemplate {
            title: title.into(),
            batch_update: BatchUpdateRequest::default(),
        }
    }

    pub fn with_requests(title: impl Into<String>, requests: Vec<Value>) -> Self {
        GoogleFormTemplate {
            title: title.into(),
            batch_update: BatchUpdateRequest::new(requests),
        }
    }

    /// `None` when the document has no `title_header.info.title`. A missing
    /// or request-less `form_body` yields an empty batch.
    pub fn from_dict(data: &Value) -> Option<Self> {
        let title = data
            .get("title_header")?
            .get("info")?
            .get("title")?
            .as_str()?;
        let requests = data
            .get("form_body")
            .and_then(|body| body.get("requests"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Some(Self::with_requests(title, requests))
    }

    /// Reads a template document, optionally nested under `key`.
    pub fn from_json_file(path: &Path, key: Option<&str>) -> Result<Self, FormsError> {
        let document: Value = serde_json::from_str(&fs::read_to_string(path)?)?;
        let payload = match key {
            Some(key) => document
                .get(key)
                .ok_or_else(|| FormsError::MissingTemplateKey(key.to_string()))?,
            None => &document,
        };
        Self::from_dict(payload).ok_or_else(|| FormsError::TemplateMissingTitle(path.to_path_buf()))
    }
}

impl fmt::Display for GoogleFormTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GoogleFormTemplate(title={}, requests={})",
            self.title,
            self.batch_update.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn document() -> Value {
        json!({
            "title_header": {"info": {"title": "Odyssey-Attendance"}},
            "form_body": {"requests": [
                {"createItem": {
                    "item": {"title": "Full Name", "questionItem": {"question": {"required": true, "textQuestion": {}}}},
                    "location": {"index": 0}
                }}
            ]}
        })
    }

    #[test]
    fn from_dict_reads_title_and_requests() {
        let template = GoogleFormTemplate::from_dict(&document()).unwrap();
        assert_eq!(template.title, "Odyssey-Attendance");
        assert_eq!(template.batch_update.len(), 1);
        assert_eq!(
            template.to_string(),
            "GoogleFormTemplate(title=Odyssey-Attendance, requests=1)"
        );
    }

    #[test]
    fn from_dict_without_title_header_is_none() {
        assert!(GoogleFormTemplate::from_dict(&json!({"form_body": {"requests": []}})).is_none());
        assert!(GoogleFormTemplate::from_dict(&json!({"title_header": {"info": {}}})).is_none());
    }

    #[test]
    fn body_without_requests_is_an_empty_batch() {
        let template = GoogleFormTemplate::from_dict(&json!({
            "title_header": {"info": {"title": "Practice"}},
            "form_body": {"items": []}
        }))
        .unwrap();
        assert!(template.batch_update.is_empty());
    }

    #[test]
    fn from_json_file_honours_the_key() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("templates.json");
        fs::write(&path, json!({"practice": document()}).to_string()).unwrap();

        let template = GoogleFormTemplate::from_json_file(&path, Some("practice")).unwrap();
        assert_eq!(template.title, "Odyssey-Attendance");

        assert!(matches!(
            GoogleFormTemplate::from_json_file(&path, Some("gala")),
            Err(FormsError::MissingTemplateKey(key)) if key == "gala"
        ));
        assert!(matches!(
            GoogleFormTemplate::from_json_file(&path, None),
            Err(FormsError::TemplateMissingTitle(_))
        ));
    }
}
