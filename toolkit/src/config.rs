//! Environment-derived configuration.
//!
//! Every value is read from the process environment, after loading a `.env`
//! file from the working directory when one exists. Missing variables fall
//! back to empty strings (or a conventional file name for paths); emptiness
//! is checked by the component that needs the value, so a command that does
//! not send mail never fails because the SMTP password is unset.

use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const SENDER_EMAIL_ADDRESS: &str = "ODYSSEY_EMAIL_ADDRESS";
pub const GOOGLE_SMTP_APP_PASS: &str = "GOOGLE_SMTP_APP_PASS";
pub const SECRET_KEY: &str = "SECRET_KEY";
pub const BASE_URL: &str = "BASE_URL";
pub const FORMS_TOKEN_PATH: &str = "FORMS_TOKEN_PATH";
pub const FORMS_CLIENT_SECRETS_PATH: &str = "FORMS_CLIENT_SECRETS_PATH";
pub const QR_LOGO_PATH: &str = "QR_LOGO_PATH";

const DEFAULT_TOKEN_PATH: &str = "token.json";
const DEFAULT_CLIENT_SECRETS_PATH: &str = "credentials.json";
const DEFAULT_LOGO_PATH: &str = "static/Odyssey_Logo.png";

/// Errors raised when a component is constructed from incomplete settings.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("base URL is empty; set {BASE_URL} or pass --base-url")]
    MissingBaseUrl,
    #[error("secret key is empty; set {SECRET_KEY} or pass --secret-key")]
    MissingSecretKey,
    #[error("sender email address is empty; set {SENDER_EMAIL_ADDRESS}")]
    MissingSenderAddress,
    #[error("SMTP app password is empty; set {GOOGLE_SMTP_APP_PASS}")]
    MissingAppPassword,
    #[error("unknown timezone '{0}'")]
    UnknownTimezone(String),
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Loads `.env` from the working directory into the process environment.
///
/// Variables already set are kept. A missing file is not an error; an
/// unreadable one is returned so the caller can report it once logging is up.
pub fn load_dotenv() -> Option<dotenvy::Error> {
    keep_unexpected(dotenvy::dotenv().map(|_| ()))
}

/// Same as `load_dotenv`, for an explicit file.
pub fn load_dotenv_from(path: &Path) -> Option<dotenvy::Error> {
    keep_unexpected(dotenvy::from_path(path))
}

fn keep_unexpected(result: Result<(), dotenvy::Error>) -> Option<dotenvy::Error> {
    match result {
        Err(err) if !err.not_found() => Some(err),
        _ => None,
    }
}

/// Raw settings shared by all commands.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppConfig {
    pub sender_email_address: String,
    pub smtp_app_password: String,
    pub qr_secret_key: String,
    pub qr_base_url: String,
    pub forms_token_path: PathBuf,
    pub forms_client_secrets_path: PathBuf,
    pub logo_path: PathBuf,
}

impl AppConfig {
    /// Loads `.env` (if present) and reads the process environment.
    pub fn from_env() -> Self {
        if let Some(err) = load_dotenv() {
            log::warn!("Ignoring unreadable .env file: {}", err);
        }
        Self::from_process_env()
    }

    /// Reads the process environment as it is, without touching `.env`.
    pub fn from_process_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let string = |key: &str| lookup(key).unwrap_or_default();
        let path = |key: &str, default: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(default))
        };

        AppConfig {
            sender_email_address: string(SENDER_EMAIL_ADDRESS),
            smtp_app_password: string(GOOGLE_SMTP_APP_PASS),
            qr_secret_key: string(SECRET_KEY),
            qr_base_url: string(BASE_URL),
            forms_token_path: path(FORMS_TOKEN_PATH, DEFAULT_TOKEN_PATH),
            forms_client_secrets_path: path(FORMS_CLIENT_SECRETS_PATH, DEFAULT_CLIENT_SECRETS_PATH),
            logo_path: path(QR_LOGO_PATH, DEFAULT_LOGO_PATH),
        }
    }
}
