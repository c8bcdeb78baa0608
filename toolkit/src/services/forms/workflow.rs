use super::api_client::{FormsApiClient, FormsApiConfig};
use super::form::GoogleForm;
use super::template::GoogleFormTemplate;
use super::FormsError;
use log::info;
use serde_json::Value;
use std::fs;
use std::path::Path;

pub const PRACTICE_FORM_TITLE: &str = "Odyssey-Attendance";

/// Creates an empty `Odyssey-Attendance` form.
pub async fn create_practice_form(client: FormsApiClient) -> Result<GoogleForm, FormsError> {
    let mut form = GoogleForm::new(client, GoogleFormTemplate::new(PRACTICE_FORM_TITLE));
    form.create_and_apply().await?;
    info!(
        "Created form: title={} formId={} responderUri={}",
        form.template.title,
        form.form_id.as_deref().unwrap_or_default(),
        form.responder_uri.as_deref().unwrap_or_default()
    );
    Ok(form)
}

/// Creates a form from a template file and writes the resulting form JSON to
/// `out_path`.
pub async fn create_form_from_template(
    client: FormsApiClient,
    template_path: &Path,
    key: Option<&str>,
    out_path: &Path,
) -> Result<GoogleForm, FormsError> {
    let template = GoogleFormTemplate::from_json_file(template_path, key)?;
    let mut form = GoogleForm::new(client, template);
    let created = form.create_and_apply().await?;
    write_pretty(out_path, &created)?;
    info!(
        "Form ID: {}, form JSON written to {}",
        form.form_id.as_deref().unwrap_or_default(),
        out_path.display()
    );
    Ok(form)
}

/// Fetches an existing form and writes its JSON to `out_path`.
pub async fn export_form_json(
    client: &FormsApiClient,
    form_id: &str,
    out_path: &Path,
) -> Result<Value, FormsError> {
    let form = client.get_form(form_id).await?;
    write_pretty(out_path, &form)?;
    info!("Wrote form {} JSON to {}", form_id, out_path.display());
    Ok(form)
}

/// The JSON of an existing form, with the session established up front.
pub async fn get_google_form_json(
    config: FormsApiConfig,
    form_id: &str,
) -> Result<Value, FormsError> {
    let client = FormsApiClient::auto_session(config).await?;
    client.get_form(form_id).await
}

fn write_pretty(path: &Path, value: &Value) -> Result<(), FormsError> {
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}
