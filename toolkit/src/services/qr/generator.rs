use super::config::QrCodeConfig;
use super::render::{overlay_logo, render_qr, write_png, LogoStyle};
use super::signer::TokenSigner;
use super::QrError;
use chrono::{DateTime, SecondsFormat, Utc};
use common::model::payload::SignedPayload;
use image::RgbaImage;
use log::{debug, info};
use std::path::PathBuf;

const EVENT_ID_FORMAT: &str = "%Y%m%d-%H%M";

/// Result of a single `QrCodeGenerator::generate` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedQr {
    /// Where the PNG was written.
    pub path: PathBuf,
    pub event_id: String,
    /// The exact string encoded in the QR symbol.
    pub url: String,
    pub payload: SignedPayload,
}

/// Turns a `QrCodeConfig` into signed, logo-branded attendance QR codes.
#[derive(Debug, Clone)]
pub struct QrCodeGenerator {
    config: QrCodeConfig,
    signer: TokenSigner,
}

impl QrCodeGenerator {
    pub fn new(config: QrCodeConfig) -> Self {
        let signer = TokenSigner::new(config.secret_key(), config.sign_salt());
        QrCodeGenerator { config, signer }
    }

    pub fn config(&self) -> &QrCodeConfig {
        &self.config
    }

    /// Event identifier for the current local minute.
    ///
    /// Calls within the same minute return the same identifier.
    pub fn new_event_id(&self) -> String {
        self.event_id_at(Utc::now())
    }

    /// Event identifier for `instant`, as seen from the configured timezone.
    pub fn event_id_at(&self, instant: DateTime<Utc>) -> String {
        instant
            .with_timezone(&self.config.timezone())
            .format(EVENT_ID_FORMAT)
            .to_string()
    }

    /// Signed attendance URL for `event_id`, issued now.
    pub fn build_signed_url(&self, event_id: &str) -> Result<(String, SignedPayload), QrError> {
        self.build_signed_url_at(event_id, Utc::now())
    }

    /// Signed attendance URL for `event_id`, issued at `issued_at`.
    ///
    /// Same event id, issue instant, secret and salt always give the same URL.
    pub fn build_signed_url_at(
        &self,
        event_id: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<(String, SignedPayload), QrError> {
        let payload = SignedPayload {
            event_id: event_id.to_string(),
            issued_at_utc: issued_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        };
        let token = self.signer.sign(&payload)?;
        let url = format!(
            "{}/?event={}&sig={}",
            self.config.normalized_base_url(),
            urlencoding::encode(event_id),
            urlencoding::encode(&token),
        );
        Ok((url, payload))
    }

    /// Checks a `sig` value produced with this generator's secret and salt.
    pub fn verify_token(&self, token: &str) -> Result<SignedPayload, QrError> {
        self.signer.verify(token)
    }

    /// Renders `url` as a `qr_size` x `qr_size` image.
    ///
    /// The logo is composited only when the configured logo file exists; a
    /// missing file yields the plain QR code.
    pub fn render(&self, url: &str) -> Result<RgbaImage, QrError> {
        let mut qr = render_qr(url, self.config.qr_size())?;

        match self.config.logo_path() {
            Some(path) if path.is_file() => {
                let logo = image::open(path)?.to_rgba8();
                let style = LogoStyle {
                    max_side: (self.config.qr_size() as f32 * self.config.logo_scale()) as u32,
                    border_frac: self.config.border_frac(),
                    corner_radius: self.config.corner_radius(),
                };
                overlay_logo(&mut qr, &logo, style);
            }
            Some(path) => debug!("Logo {} not found, rendering plain QR code", path.display()),
            None => {}
        }

        Ok(qr)
    }

    /// File the QR code for `event_id` is written to.
    pub fn output_path(&self, event_id: &str) -> PathBuf {
        self.config.output_dir().join(format!("QR_{event_id}.png"))
    }

    /// Generates, renders and writes the QR code for the current minute.
    pub fn generate(&self) -> Result<GeneratedQr, QrError> {
        self.generate_at(Utc::now())
    }

    /// Same as `generate`, with the clock fixed at `now`.
    pub fn generate_at(&self, now: DateTime<Utc>) -> Result<GeneratedQr, QrError> {
        let event_id = self.event_id_at(now);
        let (url, payload) = self.build_signed_url_at(&event_id, now)?;

        let image = self.render(&url)?;
        let path = self.output_path(&event_id);
        write_png(&image, &path)?;

        info!("Event:    {}", event_id);
        info!("Issued:   {}", payload.issued_at_utc);
        info!("URL:      {}", url);
        info!("QR saved: {}", path.display());

        Ok(GeneratedQr {
            path,
            event_id,
            url,
            payload,
        })
    }
}
