//! # Google Forms
//!
//! Creates and reads the troupe's attendance forms through the Forms REST API.
//!
//! ## Workflow:
//!
//! 1.  **Credentials**: an authorized-user token file is reused while valid,
//!     refreshed with its refresh token once expired, and otherwise obtained
//!     through the installed-app consent flow (loopback redirect, PKCE). The
//!     token file is rewritten whenever new credentials are obtained.
//!
//! 2.  **Client**: `FormsApiClient` acquires its session on the first request
//!     (or eagerly with `FormsApiClient::auto_session`). Every request has a
//!     30 second timeout and any non-2xx status is returned as an error.
//!
//! 3.  **Forms**: `GoogleForm` pairs a client with a `GoogleFormTemplate`.
//!     Only the title can be set when a form is created; everything else in
//!     the template is applied afterwards with a single `batchUpdate`.

mod api_client;
mod auth;
mod form;
mod template;
mod workflow;

pub use api_client::{FormsApiClient, FormsApiConfig, FORMS_API_ROOT, FORMS_BODY_SCOPE};
pub use auth::{
    authorization_url, obtain_credentials, AuthorizedUser, ClientSecrets, PkceChallenge,
    TokenResponse,
};
pub use form::{items_to_batch_requests, GoogleForm};
pub use template::GoogleFormTemplate;
pub use workflow::{
    create_form_from_template, create_practice_form, export_form_json, get_google_form_json,
    PRACTICE_FORM_TITLE,
};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormsError {
    #[error("Forms API request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("form has not been created yet")]
    FormNotCreated,
    #[error("{} has no title_header.info.title", .0.display())]
    TemplateMissingTitle(PathBuf),
    #[error("template document has no key '{0}'")]
    MissingTemplateKey(String),
    #[error("{} has neither an 'installed' nor a 'web' client", .0.display())]
    ClientSecrets(PathBuf),
    #[error("authorization failed: {0}")]
    Authorization(String),
    #[error("authorization flow ended before a code was received")]
    AuthorizationAborted,
}
