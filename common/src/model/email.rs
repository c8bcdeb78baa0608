use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Contents of a single outgoing email.
///
/// The HTML body is the preferred rendering; the plain-text body is the
/// fallback for clients that cannot display HTML. All three text fields must
/// be non-empty before the message can be assembled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub destination_email_address: String,
    pub subject: String,
    pub plain_text_body: String,
    pub html_body: String,
    #[serde(default)]
    pub attachments: Vec<PathBuf>,
}
