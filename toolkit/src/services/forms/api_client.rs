use super::auth::{obtain_credentials, AuthorizedUser};
use super::FormsError;
use crate::config::AppConfig;
use chrono::Utc;
use common::model::form::{BatchUpdateRequest, CreateFormRequest, FormInfo};
use log::debug;
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::Mutex;

pub const FORMS_API_ROOT: &str = "https://forms.googleapis.com/v1";
pub const FORMS_BODY_SCOPE: &str = "https://www.googleapis.com/auth/forms.body";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Where the OAuth material lives and which scopes to ask for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormsApiConfig {
    pub token_path: PathBuf,
    pub client_secrets_path: PathBuf,
    pub scopes: Vec<String>,
}

impl FormsApiConfig {
    pub fn new(token_path: impl Into<PathBuf>, client_secrets_path: impl Into<PathBuf>) -> Self {
        FormsApiConfig {
            token_path: token_path.into(),
            client_secrets_path: client_secrets_path.into(),
            scopes: vec![FORMS_BODY_SCOPE.to_string()],
        }
    }

    pub fn from_app_config(config: &AppConfig) -> Self {
        Self::new(
            config.forms_token_path.clone(),
            config.forms_client_secrets_path.clone(),
        )
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }
}

/// Talks to the Forms REST API on behalf of the authorized user.
pub struct FormsApiClient {
    config: FormsApiConfig,
    api_root: String,
    http: reqwest::Client,
    session: Mutex<Option<AuthorizedUser>>,
}

impl FormsApiClient {
    /// Client without a session; credentials are obtained by the first request.
    pub fn new(config: FormsApiConfig) -> Self {
        FormsApiClient {
            config,
            api_root: FORMS_API_ROOT.to_string(),
            http: reqwest::Client::new(),
            session: Mutex::new(None),
        }
    }

    /// Client whose session is established before it is returned.
    pub async fn auto_session(config: FormsApiConfig) -> Result<Self, FormsError> {
        let client = Self::new(config);
        client.access_token().await?;
        Ok(client)
    }

    /// Starts from already-obtained credentials instead of the token file.
    pub fn with_credentials(self, credentials: AuthorizedUser) -> Self {
        FormsApiClient {
            session: Mutex::new(Some(credentials)),
            ..self
        }
    }

    /// Sends requests to another API root (a proxy or a local stand-in).
    pub fn with_api_root(self, api_root: impl Into<String>) -> Self {
        FormsApiClient {
            api_root: api_root.into().trim_end_matches('/').to_string(),
            ..self
        }
    }

    pub fn config(&self) -> &FormsApiConfig {
        &self.config
    }

    /// Current access token, refreshing or re-authorizing once it is stale.
    async fn access_token(&self) -> Result<String, FormsError> {
        let mut session = self.session.lock().await;
        let current = session
            .as_ref()
            .filter(|creds| creds.is_valid_at(Utc::now()))
            .and_then(|creds| creds.token.clone());
        if let Some(token) = current {
            return Ok(token);
        }

        debug!("Establishing Forms API session");
        let creds = obtain_credentials(&self.http, &self.config).await?;
        let token = creds
            .token
            .clone()
            .ok_or_else(|| FormsError::Authorization("token endpoint returned no access token".to_string()))?;
        *session = Some(creds);
        Ok(token)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, FormsError> {
        let token = self.access_token().await?;
        let response = request
            .bearer_auth(token)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    /// `POST /forms`. Returns the new form resource (`formId`, `responderUri`, ...).
    pub async fn create_form(&self, title: &str) -> Result<Value, FormsError> {
        let body = CreateFormRequest {
            info: FormInfo {
                title: title.to_string(),
            },
        };
        let url = format!("{}/forms", self.api_root);
        self.send(self.http.post(url).json(&body)).await
    }

    /// `POST /forms/{formId}:batchUpdate`.
    pub async fn batch_update(
        &self,
        form_id: &str,
        requests: &BatchUpdateRequest,
    ) -> Result<Value, FormsError> {
        let url = format!("{}/forms/{}:batchUpdate", self.api_root, form_id);
        self.send(self.http.post(url).json(requests)).await
    }

    /// `GET /forms/{formId}`.
    pub async fn get_form(&self, form_id: &str) -> Result<Value, FormsError> {
        let url = format!("{}/forms/{}", self.api_root, form_id);
        self.send(self.http.get(url)).await
    }
}

impl fmt::Display for FormsApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FormsApiClient(token={}, secrets={})",
            self.config.token_path.display(),
            self.config.client_secrets_path.display()
        )
    }
}

impl fmt::Debug for FormsApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_to_the_forms_body_scope() {
        let config = FormsApiConfig::new("token.json", "credentials.json");
        assert_eq!(config.scopes, vec![FORMS_BODY_SCOPE.to_string()]);

        let app = AppConfig::from_lookup(|_| None);
        assert_eq!(
            FormsApiConfig::from_app_config(&app),
            FormsApiConfig::new("token.json", "credentials.json")
        );
    }

    #[test]
    fn display_names_the_credential_files() {
        let client = FormsApiClient::new(FormsApiConfig::new("token.json", "credentials.json"))
            .with_api_root("http://127.0.0.1:9/v1/");

        assert_eq!(
            client.to_string(),
            "FormsApiClient(token=token.json, secrets=credentials.json)"
        );
        assert_eq!(client.api_root, "http://127.0.0.1:9/v1");
    }
}
