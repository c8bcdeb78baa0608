use crate::config::ConfigError;
use chrono_tz::Tz;
use std::path::{Path, PathBuf};

pub const DEFAULT_LOGO_PATH: &str = "static/Odyssey_Logo.png";
pub const DEFAULT_QR_SIZE: u32 = 800;
/// Largest side length accepted for the rendered PNG.
pub const MAX_QR_SIZE: u32 = 4096;
pub const DEFAULT_LOGO_SCALE: f32 = 0.25;
pub const DEFAULT_BORDER_FRAC: f32 = 0.03;
pub const DEFAULT_CORNER_RADIUS: u32 = 18;
pub const DEFAULT_SIGN_SALT: &str = "attendance-token";
pub const DEFAULT_TIMEZONE: &str = "America/Toronto";

/// Immutable settings for `QrCodeGenerator`.
///
/// Built through `QrCodeConfig::builder`; `build` fails fast when the base URL
/// or the secret key is empty, so no generation ever runs with a placeholder
/// secret.
#[derive(Debug, Clone)]
pub struct QrCodeConfig {
    base_url: String,
    secret_key: String,
    logo_path: Option<PathBuf>,
    qr_size: u32,
    logo_scale: f32,
    border_frac: f32,
    corner_radius: u32,
    sign_salt: String,
    timezone: Tz,
    output_dir: PathBuf,
}

impl QrCodeConfig {
    /// Config with every optional field at its default.
    pub fn new(
        base_url: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        Self::builder(base_url, secret_key).build()
    }

    pub fn builder(
        base_url: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> QrCodeConfigBuilder {
        QrCodeConfigBuilder {
            base_url: base_url.into(),
            secret_key: secret_key.into(),
            logo_path: Some(PathBuf::from(DEFAULT_LOGO_PATH)),
            qr_size: DEFAULT_QR_SIZE,
            logo_scale: DEFAULT_LOGO_SCALE,
            border_frac: DEFAULT_BORDER_FRAC,
            corner_radius: DEFAULT_CORNER_RADIUS,
            sign_salt: DEFAULT_SIGN_SALT.to_string(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            output_dir: PathBuf::from("."),
        }
    }

    /// Base URL without trailing slashes, ready for `{base}/?event=...`.
    pub fn normalized_base_url(&self) -> &str {
        &self.base_url
    }

    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }

    pub fn logo_path(&self) -> Option<&Path> {
        self.logo_path.as_deref()
    }

    pub fn qr_size(&self) -> u32 {
        self.qr_size
    }

    pub fn logo_scale(&self) -> f32 {
        self.logo_scale
    }

    pub fn border_frac(&self) -> f32 {
        self.border_frac
    }

    pub fn corner_radius(&self) -> u32 {
        self.corner_radius
    }

    pub fn sign_salt(&self) -> &str {
        &self.sign_salt
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

#[derive(Debug, Clone)]
pub struct QrCodeConfigBuilder {
    base_url: String,
    secret_key: String,
    logo_path: Option<PathBuf>,
    qr_size: u32,
    logo_scale: f32,
    border_frac: f32,
    corner_radius: u32,
    sign_salt: String,
    timezone: String,
    output_dir: PathBuf,
}

impl QrCodeConfigBuilder {
    pub fn logo_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.logo_path = Some(path.into());
        self
    }

    /// Never composite a logo, even if the default logo file exists.
    pub fn without_logo(mut self) -> Self {
        self.logo_path = None;
        self
    }

    pub fn qr_size(mut self, pixels: u32) -> Self {
        self.qr_size = pixels;
        self
    }

    pub fn logo_scale(mut self, fraction: f32) -> Self {
        self.logo_scale = fraction;
        self
    }

    pub fn border_frac(mut self, fraction: f32) -> Self {
        self.border_frac = fraction;
        self
    }

    pub fn corner_radius(mut self, pixels: u32) -> Self {
        self.corner_radius = pixels;
        self
    }

    pub fn sign_salt(mut self, salt: impl Into<String>) -> Self {
        self.sign_salt = salt.into();
        self
    }

    pub fn timezone(mut self, name: impl Into<String>) -> Self {
        self.timezone = name.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn build(self) -> Result<QrCodeConfig, ConfigError> {
        let base_url = self.base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ConfigError::MissingBaseUrl);
        }
        if self.secret_key.is_empty() {
            return Err(ConfigError::MissingSecretKey);
        }
        if self.qr_size == 0 {
            return Err(ConfigError::Invalid {
                field: "qr_size",
                reason: "must be at least 1 pixel".to_string(),
            });
        }
        if self.qr_size > MAX_QR_SIZE {
            return Err(ConfigError::Invalid {
                field: "qr_size",
                reason: format!("{} is above the {} pixel limit", self.qr_size, MAX_QR_SIZE),
            });
        }
        if !(self.logo_scale > 0.0 && self.logo_scale <= 1.0) {
            return Err(ConfigError::Invalid {
                field: "logo_scale",
                reason: format!("{} is outside (0, 1]", self.logo_scale),
            });
        }
        if !(0.0..=1.0).contains(&self.border_frac) {
            return Err(ConfigError::Invalid {
                field: "border_frac",
                reason: format!("{} is outside [0, 1]", self.border_frac),
            });
        }
        let timezone: Tz = self
            .timezone
            .parse()
            .map_err(|_| ConfigError::UnknownTimezone(self.timezone.clone()))?;

        Ok(QrCodeConfig {
            base_url,
            secret_key: self.secret_key,
            logo_path: self.logo_path,
            qr_size: self.qr_size,
            logo_scale: self.logo_scale,
            border_frac: self.border_frac,
            corner_radius: self.corner_radius,
            sign_salt: self.sign_salt,
            timezone,
            output_dir: self.output_dir,
        })
    }
}
