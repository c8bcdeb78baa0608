use super::api_client::FormsApiClient;
use super::template::GoogleFormTemplate;
use super::FormsError;
use common::model::form::{BatchUpdateRequest, FormMetadata};
use log::info;
use serde_json::{json, Value};
use std::fmt;

/// Output-only identifiers the API assigns and refuses on `createItem`.
const OUTPUT_ONLY_IDS: [&str; 2] = ["itemId", "questionId"];

/// A form built from a template. `form_id` and `responder_uri` are known once
/// `create_and_apply` has run.
pub struct GoogleForm {
    pub client: FormsApiClient,
    pub template: GoogleFormTemplate,
    pub form_id: Option<String>,
    pub responder_uri: Option<String>,
}

impl GoogleForm {
    pub fn new(client: FormsApiClient, template: GoogleFormTemplate) -> Self {
        GoogleForm {
            client,
            template,
            form_id: None,
            responder_uri: None,
        }
    }

    /// Creates the form, applies the template's requests (if any) and
    /// returns the resulting form resource.
    pub async fn create_and_apply(&mut self) -> Result<Value, FormsError> {
        let created = self.client.create_form(&self.template.title).await?;
        let metadata: FormMetadata = serde_json::from_value(created)?;
        info!("Created form {} ({})", metadata.form_id, self.template.title);
        self.form_id = Some(metadata.form_id.clone());
        self.responder_uri = metadata.responder_uri;

        if !self.template.batch_update.is_empty() {
            self.client
                .batch_update(&metadata.form_id, &self.template.batch_update)
                .await?;
        }
        self.client.get_form(&metadata.form_id).await
    }

    pub async fn append_items(&self, requests: &BatchUpdateRequest) -> Result<Value, FormsError> {
        let form_id = self.form_id.as_deref().ok_or(FormsError::FormNotCreated)?;
        self.client.batch_update(form_id, requests).await
    }

    pub async fn refresh(&self) -> Result<Value, FormsError> {
        let form_id = self.form_id.as_deref().ok_or(FormsError::FormNotCreated)?;
        self.client.get_form(form_id).await
    }
}

impl fmt::Display for GoogleForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GoogleForm(title={:?}, form_id={})",
            self.template.title,
            self.form_id.as_deref().unwrap_or("None")
        )
    }
}

/// Converts the `items` of a fetched form into `createItem` requests that
/// rebuild them in the same order.
pub fn items_to_batch_requests(items: &[Value]) -> BatchUpdateRequest {
    let requests = items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let mut item = item.clone();
            strip_output_only(&mut item);
            json!({
                "createItem": {
                    "item": item,
                    "location": {"index": index}
                }
            })
        })
        .collect();
    BatchUpdateRequest::new(requests)
}

fn strip_output_only(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for key in OUTPUT_ONLY_IDS {
                map.remove(key);
            }
            map.values_mut().for_each(strip_output_only);
        }
        Value::Array(values) => values.iter_mut().for_each(strip_output_only),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::forms::FormsApiConfig;

    fn form() -> GoogleForm {
        GoogleForm::new(
            FormsApiClient::new(FormsApiConfig::new("token.json", "credentials.json")),
            GoogleFormTemplate::new("Odyssey-Attendance"),
        )
    }

    #[test]
    fn items_become_create_requests_without_ids() {
        let items = vec![
            json!({
                "itemId": "1a2b",
                "title": "Full Name",
                "questionItem": {"question": {"questionId": "3c4d", "required": true, "textQuestion": {}}}
            }),
            json!({
                "itemId": "5e6f",
                "title": "Class",
                "questionItem": {"question": {
                    "questionId": "7a8b",
                    "choiceQuestion": {"type": "RADIO", "options": [{"value": "Beginner"}, {"value": "Advanced"}]}
                }}
            }),
        ];

        let batch = items_to_batch_requests(&items);

        assert_eq!(
            batch.requests,
            vec![
                json!({"createItem": {
                    "item": {"title": "Full Name", "questionItem": {"question": {"required": true, "textQuestion": {}}}},
                    "location": {"index": 0}
                }}),
                json!({"createItem": {
                    "item": {"title": "Class", "questionItem": {"question": {
                        "choiceQuestion": {"type": "RADIO", "options": [{"value": "Beginner"}, {"value": "Advanced"}]}
                    }}},
                    "location": {"index": 1}
                }}),
            ]
        );
    }

    #[test]
    fn no_items_no_requests() {
        assert!(items_to_batch_requests(&[]).is_empty());
    }

    #[actix_web::test]
    async fn uncreated_form_refuses_updates() {
        let form = form();

        assert!(matches!(
            form.append_items(&BatchUpdateRequest::default()).await,
            Err(FormsError::FormNotCreated)
        ));
        assert!(matches!(form.refresh().await, Err(FormsError::FormNotCreated)));
        assert_eq!(form.to_string(), "GoogleForm(title=\"Odyssey-Attendance\", form_id=None)");
    }
}
