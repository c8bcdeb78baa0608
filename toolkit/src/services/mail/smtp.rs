use super::message::build_email_message;
use super::MailError;
use crate::config::{AppConfig, ConfigError};
use common::model::email::EmailMessage;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use log::{error, info};
use std::fmt;
use thiserror::Error;

/// Known SMTP submission servers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SmtpServer {
    #[default]
    Gmail,
}

impl SmtpServer {
    pub fn host(&self) -> &'static str {
        match self {
            SmtpServer::Gmail => "smtp.gmail.com",
        }
    }

    pub fn port(&self) -> u16 {
        match self {
            SmtpServer::Gmail => 465,
        }
    }
}

/// How the connection to the server is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecurityContract {
    /// TLS from the first byte (SMTPS), as opposed to STARTTLS.
    #[default]
    ImplicitTls,
}

impl SecurityContract {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityContract::ImplicitTls => "SSL",
        }
    }
}

/// Sender account and server used for every outgoing message.
#[derive(Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    sender_email_address: String,
    app_password: String,
    server: SmtpServer,
    security: SecurityContract,
}

impl SmtpConfig {
    pub fn new(
        sender_email_address: impl Into<String>,
        app_password: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let sender_email_address = sender_email_address.into();
        let app_password = app_password.into();
        if sender_email_address.trim().is_empty() {
            return Err(ConfigError::MissingSenderAddress);
        }
        if app_password.is_empty() {
            return Err(ConfigError::MissingAppPassword);
        }
        Ok(SmtpConfig {
            sender_email_address,
            app_password,
            server: SmtpServer::default(),
            security: SecurityContract::default(),
        })
    }

    pub fn from_app_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Self::new(
            config.sender_email_address.clone(),
            config.smtp_app_password.clone(),
        )
    }

    /// Reads `ODYSSEY_EMAIL_ADDRESS` and `GOOGLE_SMTP_APP_PASS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_app_config(&AppConfig::from_env())
    }

    pub fn with_server(mut self, server: SmtpServer) -> Self {
        self.server = server;
        self
    }

    pub fn sender_email_address(&self) -> &str {
        &self.sender_email_address
    }

    pub fn server(&self) -> SmtpServer {
        self.server
    }

    pub fn security(&self) -> SecurityContract {
        self.security
    }
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("sender_email_address", &self.sender_email_address)
            .field("app_password", &"<redacted>")
            .field("server", &self.server)
            .field("security", &self.security)
            .finish()
    }
}

/// Class of a failed delivery, mirroring the stages of an SMTP session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryFailure {
    Connect,
    Authentication,
    SenderRefused,
    Smtp,
}

impl DeliveryFailure {
    fn describe(&self) -> &'static str {
        match self {
            DeliveryFailure::Connect => "Error Connecting to server.",
            DeliveryFailure::Authentication => "Error with Server Auth.",
            DeliveryFailure::SenderRefused => "Sender Email Address Refused to comply.",
            DeliveryFailure::Smtp => "Error with SMTP Operation.",
        }
    }
}

impl fmt::Display for DeliveryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeliveryFailure::Connect => "connect",
            DeliveryFailure::Authentication => "authentication",
            DeliveryFailure::SenderRefused => "sender refused",
            DeliveryFailure::Smtp => "smtp",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
#[error("{kind} error: {message}")]
pub struct DeliveryError {
    pub kind: DeliveryFailure,
    pub message: String,
}

impl DeliveryFailure {
    /// Class of a failure from its reply code and text.
    ///
    /// 55x codes answer RCPT TO as well as MAIL FROM, so they only count as a
    /// sender refusal when the reply names the sender. `local` marks errors
    /// raised on our side of the connection.
    pub fn classify(code: Option<&str>, reply: &str, local: bool) -> Self {
        match code {
            Some("530" | "534" | "535" | "538") => DeliveryFailure::Authentication,
            Some("550" | "551" | "553" | "555") if names_sender(reply) => {
                DeliveryFailure::SenderRefused
            }
            Some(_) => DeliveryFailure::Smtp,
            None if local => DeliveryFailure::Smtp,
            // no reply code: the session never got far enough to talk SMTP
            None => DeliveryFailure::Connect,
        }
    }
}

fn names_sender(reply: &str) -> bool {
    let reply = reply.to_ascii_lowercase();
    reply.contains("sender") || reply.contains("mail from")
}

impl From<lettre::transport::smtp::Error> for DeliveryError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        let message = err.to_string();
        let code = err.status().map(|code| code.to_string());
        let kind = DeliveryFailure::classify(
            code.as_deref(),
            &message,
            err.is_timeout() || err.is_client(),
        );
        DeliveryError { kind, message }
    }
}

/// Anything that can put a finished message on the wire.
pub trait MailTransport {
    fn deliver(&self, message: &Message) -> Result<(), DeliveryError>;

    /// Opens a session and checks the server answers.
    fn ping(&self) -> Result<bool, DeliveryError>;
}

impl MailTransport for SmtpTransport {
    fn deliver(&self, message: &Message) -> Result<(), DeliveryError> {
        self.send(message).map(|_| ()).map_err(DeliveryError::from)
    }

    fn ping(&self) -> Result<bool, DeliveryError> {
        self.test_connection().map_err(DeliveryError::from)
    }
}

/// Sends `EmailMessage`s from the configured sender account.
pub struct EmailClient<T = SmtpTransport> {
    config: SmtpConfig,
    transport: T,
}

impl EmailClient<SmtpTransport> {
    /// Client for the configured server over implicit TLS. No connection is
    /// opened until the first message is sent.
    pub fn new(config: SmtpConfig) -> Result<Self, MailError> {
        let server = config.server();
        let transport = match config.security() {
            SecurityContract::ImplicitTls => SmtpTransport::relay(server.host())?,
        }
        .port(server.port())
        .credentials(Credentials::new(
            config.sender_email_address.clone(),
            config.app_password.clone(),
        ))
        .build();
        Ok(EmailClient { config, transport })
    }
}

impl<T: MailTransport> EmailClient<T> {
    pub fn with_transport(config: SmtpConfig, transport: T) -> Self {
        EmailClient { config, transport }
    }

    pub fn config(&self) -> &SmtpConfig {
        &self.config
    }

    pub fn build_email_message(&self, contents: &EmailMessage) -> Result<Message, MailError> {
        build_email_message(&self.config.sender_email_address, contents)
    }

    /// Builds and sends one message.
    ///
    /// Incomplete contents are an `Err`; delivery failures are logged and
    /// reported as `Ok(false)`.
    pub fn send_email(&self, contents: &EmailMessage) -> Result<bool, MailError> {
        let message = self.build_email_message(contents)?;

        match self.transport.deliver(&message) {
            Ok(()) => {
                info!("Email sent to {}", contents.destination_email_address);
                Ok(true)
            }
            Err(err) => {
                error!("{} {}: {}", err.kind.describe(), err.kind, err.message);
                Ok(false)
            }
        }
    }

    /// Whether the server accepts a connection with the configured account.
    pub fn test_connection(&self) -> bool {
        match self.transport.ping() {
            Ok(alive) => alive,
            Err(err) => {
                error!("{} {}: {}", err.kind.describe(), err.kind, err.message);
                false
            }
        }
    }
}
