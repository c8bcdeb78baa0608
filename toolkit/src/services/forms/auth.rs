use super::api_client::FormsApiConfig;
use super::FormsError;
use actix_web::{web, App, HttpResponse, HttpServer};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::net::TcpListener;
use std::path::Path;
use tokio::sync::mpsc;
use uuid::Uuid;

pub const AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
pub const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens this close to their expiry are treated as expired.
const EXPIRY_SKEW_SECS: i64 = 225;

const CALLBACK_PAGE: &str = "<html><body><p>The authentication flow has completed. \
You may close this window.</p></body></html>";

fn default_token_uri() -> String {
    TOKEN_URI.to_string()
}

fn default_auth_uri() -> String {
    AUTH_URI.to_string()
}

/// Contents of the authorized-user token file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizedUser {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

impl AuthorizedUser {
    pub fn from_file(path: &Path) -> Result<Self, FormsError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), FormsError> {
        fs::write(path, serde_json::to_string(self)?)?;
        Ok(())
    }

    /// A token without an expiry never expires.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => now >= expiry - Duration::seconds(EXPIRY_SKEW_SECS),
            None => false,
        }
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.token.is_some() && !self.is_expired_at(now)
    }

    fn apply(&mut self, response: TokenResponse, now: DateTime<Utc>) {
        self.token = Some(response.access_token);
        self.expiry = response
            .expires_in
            .map(|secs| now + Duration::seconds(secs));
        if response.refresh_token.is_some() {
            self.refresh_token = response.refresh_token;
        }
        if let Some(scope) = response.scope {
            self.scopes = scope.split_whitespace().map(str::to_string).collect();
        }
    }
}

/// OAuth client registration downloaded from the cloud console.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    /// Reads the `installed` (or, failing that, `web`) client of a secrets file.
    pub fn from_file(path: &Path) -> Result<Self, FormsError> {
        let file: ClientSecretsFile = serde_json::from_str(&fs::read_to_string(path)?)?;
        file.installed
            .or(file.web)
            .ok_or_else(|| FormsError::ClientSecrets(path.to_path_buf()))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// PKCE verifier and its S256 challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkceChallenge {
    pub verifier: String,
    pub challenge: String,
}

impl PkceChallenge {
    pub fn new() -> Self {
        let verifier = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        Self::from_verifier(verifier)
    }

    pub fn from_verifier(verifier: impl Into<String>) -> Self {
        let verifier = verifier.into();
        let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
        PkceChallenge {
            verifier,
            challenge,
        }
    }
}

impl Default for PkceChallenge {
    fn default() -> Self {
        Self::new()
    }
}

/// Consent URL for the installed-app flow.
pub fn authorization_url(
    secrets: &ClientSecrets,
    scopes: &[String],
    redirect_uri: &str,
    state: &str,
    pkce: &PkceChallenge,
) -> String {
    let scope = scopes.join(" ");
    let params = [
        ("response_type", "code"),
        ("client_id", secrets.client_id.as_str()),
        ("redirect_uri", redirect_uri),
        ("scope", scope.as_str()),
        ("state", state),
        ("code_challenge", pkce.challenge.as_str()),
        ("code_challenge_method", "S256"),
        ("access_type", "offline"),
    ];
    let query = params
        .iter()
        .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&");
    format!("{}?{}", secrets.auth_uri, query)
}

/// Credentials for `config`: the token file when still valid, a refreshed
/// token when it has expired, or a fresh consent otherwise. New credentials
/// are written back to the token file.
pub async fn obtain_credentials(
    http: &reqwest::Client,
    config: &FormsApiConfig,
) -> Result<AuthorizedUser, FormsError> {
    let stored = if config.token_path.exists() {
        Some(AuthorizedUser::from_file(&config.token_path)?)
    } else {
        None
    };

    let user = match stored {
        Some(mut user) => {
            user.scopes = config.scopes.clone();
            if user.is_valid_at(Utc::now()) {
                return Ok(user);
            }
            if user.refresh_token.is_some() {
                debug!("Refreshing expired Forms API token");
                refresh(http, &mut user).await?;
                user
            } else {
                run_local_server(http, config).await?
            }
        }
        None => run_local_server(http, config).await?,
    };

    user.save(&config.token_path)?;
    info!("Saved Forms API credentials to {}", config.token_path.display());
    Ok(user)
}

/// Exchanges the refresh token for a new access token.
pub async fn refresh(http: &reqwest::Client, user: &mut AuthorizedUser) -> Result<(), FormsError> {
    let refresh_token = user
        .refresh_token
        .clone()
        .ok_or_else(|| FormsError::Authorization("no refresh token".to_string()))?;

    let response: TokenResponse = http
        .post(&user.token_uri)
        .form(&[
            ("client_id", user.client_id.as_str()),
            ("client_secret", user.client_secret.as_str()),
            ("refresh_token", refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    user.apply(response, Utc::now());
    Ok(())
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

async fn oauth_callback(
    query: web::Query<CallbackParams>,
    tx: web::Data<mpsc::Sender<CallbackParams>>,
) -> HttpResponse {
    let params = query.into_inner();
    // browsers also ask for /favicon.ico and the like
    if params.code.is_none() && params.error.is_none() {
        return HttpResponse::NotFound().finish();
    }
    if let Err(err) = tx.try_send(params) {
        debug!("Ignoring duplicate authorization callback: {}", err);
    }
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(CALLBACK_PAGE)
}

/// Installed-app consent flow: serves the redirect on a loopback port, opens
/// the consent page and trades the returned code for tokens.
async fn run_local_server(
    http: &reqwest::Client,
    config: &FormsApiConfig,
) -> Result<AuthorizedUser, FormsError> {
    let secrets = ClientSecrets::from_file(&config.client_secrets_path)?;

    let listener = TcpListener::bind(("127.0.0.1", 0))?;
    let redirect_uri = format!("http://localhost:{}/", listener.local_addr()?.port());
    let state = Uuid::new_v4().simple().to_string();
    let pkce = PkceChallenge::new();
    let url = authorization_url(&secrets, &config.scopes, &redirect_uri, &state, &pkce);

    let (tx, mut rx) = mpsc::channel::<CallbackParams>(1);
    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(tx.clone()))
            .default_service(web::route().to(oauth_callback))
    })
    .workers(1)
    .listen(listener)?
    .run();
    let handle = server.handle();
    let server_task = actix_web::rt::spawn(server);

    info!("Please visit this URL to authorize this application: {}", url);
    if let Err(err) = webbrowser::open(&url) {
        warn!("Could not open a browser ({}); open the URL above manually", err);
    }

    let params = rx.recv().await;
    handle.stop(true).await;
    if let Ok(Err(err)) = server_task.await {
        warn!("Authorization callback server stopped with an error: {}", err);
    }

    let params = params.ok_or(FormsError::AuthorizationAborted)?;
    let code = check_callback(params, &state)?;
    let response = exchange_code(http, &secrets, &code, &redirect_uri, &pkce).await?;

    let mut user = AuthorizedUser {
        token: None,
        refresh_token: None,
        token_uri: secrets.token_uri.clone(),
        client_id: secrets.client_id.clone(),
        client_secret: secrets.client_secret.clone(),
        scopes: config.scopes.clone(),
        expiry: None,
    };
    user.apply(response, Utc::now());
    Ok(user)
}

fn check_callback(params: CallbackParams, expected_state: &str) -> Result<String, FormsError> {
    if let Some(error) = params.error {
        return Err(FormsError::Authorization(error));
    }
    if params.state.as_deref() != Some(expected_state) {
        return Err(FormsError::Authorization(
            "state mismatch in authorization response".to_string(),
        ));
    }
    params.code.ok_or(FormsError::AuthorizationAborted)
}

async fn exchange_code(
    http: &reqwest::Client,
    secrets: &ClientSecrets,
    code: &str,
    redirect_uri: &str,
    pkce: &PkceChallenge,
) -> Result<TokenResponse, FormsError> {
    let response = http
        .post(&secrets.token_uri)
        .form(&[
            ("client_id", secrets.client_id.as_str()),
            ("client_secret", secrets.client_secret.as_str()),
            ("code", code),
            ("code_verifier", pkce.verifier.as_str()),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    Ok(response)
}
