//! # Signed attendance QR codes
//!
//! Produces a PNG QR code that links to the attendance form and carries a
//! tamper-evident token identifying the session it was printed for.
//!
//! ## Workflow:
//!
//! 1.  **Configuration**: `QrCodeConfig` is built once (base URL and secret
//!     key are mandatory) and can be reused for any number of generations.
//!
//! 2.  **Event identifier**: the current instant, seen from the configured
//!     timezone, formatted as `YYYYMMDD-HHmm`. Two generations inside the same
//!     local minute share an identifier and therefore an output file; the last
//!     write wins.
//!
//! 3.  **Signing**: `{event_id, issued_at_utc}` is serialized as compact JSON
//!     and signed by `TokenSigner` (HMAC-SHA256, salted key derivation). The
//!     token never expires.
//!
//! 4.  **Rendering**: the URL is encoded with error-correction level H so the
//!     centered logo can occlude part of the symbol, scaled to the configured
//!     size and, when the logo file exists, overlaid with a rounded white plate
//!     and the rounded logo.
//!
//! 5.  **Output**: the image is written to `QR_<event_id>.png`.

mod config;
mod generator;
mod render;
mod signer;

pub use config::{QrCodeConfig, QrCodeConfigBuilder};
pub use generator::{GeneratedQr, QrCodeGenerator};
pub use signer::TokenSigner;

use crate::config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QrError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to encode QR payload: {0}")]
    Encode(#[from] qrcode::types::QrError),
    #[error("failed to load logo: {0}")]
    Logo(#[from] image::ImageError),
    #[error("failed to write PNG: {0}")]
    Png(#[from] png::EncodingError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("payload serialization failed: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("token is malformed")]
    MalformedToken,
    #[error("token signature does not match")]
    BadSignature,
}
