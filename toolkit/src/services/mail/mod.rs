//! # Attendance emails over SMTP
//!
//! Sends the attendance sheet to a list of recipients through an SMTP
//! submission server (Gmail by default) using implicit TLS on port 465 and an
//! app password.
//!
//! Message assembly is strict: a missing subject, plain-text body or HTML body,
//! an unreadable attachment or an unparsable address is reported as a
//! `MailError` before any connection is opened. Delivery problems on the
//! other hand are logged with their class and turned into `Ok(false)`, so a
//! batch send keeps going after one recipient fails.

mod message;
mod smtp;
mod templates;

pub use message::build_email_message;
pub use smtp::{
    DeliveryError, DeliveryFailure, EmailClient, MailTransport, SecurityContract, SmtpConfig,
    SmtpServer,
};
pub use templates::{render_placeholders, HtmlEmailTemplate, PlainTextTemplate};

use crate::config::ConfigError;
use lettre::address::AddressError;
use lettre::message::header::ContentTypeErr;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("must specify {0} in email contents")]
    MissingField(&'static str),
    #[error("could not find attachment: {}", .0.display())]
    AttachmentNotFound(PathBuf),
    #[error("invalid email address '{address}': {source}")]
    Address {
        address: String,
        #[source]
        source: AddressError,
    },
    #[error("invalid attachment content type: {0}")]
    ContentType(#[from] ContentTypeErr),
    #[error("failed to read attachment: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to assemble message: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("invalid template pattern: {0}")]
    Template(#[from] regex::Error),
    #[error("failed to configure SMTP transport: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}
