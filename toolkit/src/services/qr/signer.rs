use super::QrError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as BASE64_URL;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

const SEPARATOR: char = '.';

/// Signs serializable payloads into URL-safe tokens.
///
/// Token layout: `base64url(json) "." base64url(mac)`, unpadded. The MAC key
/// is `SHA256(salt || "signer" || secret)` ("django-concat" derivation), so
/// any validator using that scheme with SHA-256 accepts these tokens.
///
/// Tokens carry no timestamp of their own and never expire.
#[derive(Clone)]
pub struct TokenSigner {
    key: Vec<u8>,
}

impl TokenSigner {
    pub fn new(secret_key: &str, salt: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(salt.as_bytes());
        hasher.update(b"signer");
        hasher.update(secret_key.as_bytes());
        TokenSigner {
            key: hasher.finalize().to_vec(),
        }
    }

    /// Serializes `payload` as compact JSON and appends its signature.
    pub fn sign<T: Serialize>(&self, payload: &T) -> Result<String, QrError> {
        let json = serde_json::to_vec(payload)?;
        let body = BASE64_URL.encode(json);
        let signature = BASE64_URL.encode(self.mac(body.as_bytes())?.finalize().into_bytes());
        Ok(format!("{body}{SEPARATOR}{signature}"))
    }

    /// Checks the signature of `token` and decodes its payload.
    pub fn verify<T: DeserializeOwned>(&self, token: &str) -> Result<T, QrError> {
        let (body, signature) = token.rsplit_once(SEPARATOR).ok_or(QrError::MalformedToken)?;
        let signature = BASE64_URL
            .decode(signature)
            .map_err(|_| QrError::MalformedToken)?;

        self.mac(body.as_bytes())?
            .verify_slice(&signature)
            .map_err(|_| QrError::BadSignature)?;

        let json = BASE64_URL.decode(body).map_err(|_| QrError::MalformedToken)?;
        Ok(serde_json::from_slice(&json)?)
    }

    fn mac(&self, value: &[u8]) -> Result<HmacSha256, QrError> {
        // HMAC accepts keys of any length; this only fails on a broken digest.
        let mut mac = HmacSha256::new_from_slice(&self.key).map_err(|_| QrError::BadSignature)?;
        mac.update(value);
        Ok(mac)
    }
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::model::payload::SignedPayload;

    fn payload() -> SignedPayload {
        SignedPayload {
            event_id: "20250106-1915".to_string(),
            issued_at_utc: "2025-01-07T00:15:00Z".to_string(),
        }
    }

    #[test]
    fn signing_is_deterministic() {
        let a = TokenSigner::new("test-secret", "attendance-token");
        let b = TokenSigner::new("test-secret", "attendance-token");

        assert_eq!(a.sign(&payload()).unwrap(), b.sign(&payload()).unwrap());
    }

    #[test]
    fn body_is_compact_json_in_field_order() {
        let token = TokenSigner::new("test-secret", "attendance-token")
            .sign(&payload())
            .unwrap();
        let (body, _) = token.rsplit_once('.').unwrap();
        let json = String::from_utf8(BASE64_URL.decode(body).unwrap()).unwrap();

        assert_eq!(
            json,
            r#"{"event_id":"20250106-1915","issued_at_utc":"2025-01-07T00:15:00Z"}"#
        );
        assert!(!token.contains('='));
    }

    #[test]
    fn verify_returns_the_signed_payload() {
        let signer = TokenSigner::new("test-secret", "attendance-token");
        let token = signer.sign(&payload()).unwrap();

        let decoded: SignedPayload = signer.verify(&token).unwrap();
        assert_eq!(decoded, payload());
    }

    #[test]
    fn other_secret_or_salt_cannot_verify() {
        let token = TokenSigner::new("test-secret", "attendance-token")
            .sign(&payload())
            .unwrap();

        let wrong_secret = TokenSigner::new("other-secret", "attendance-token");
        let wrong_salt = TokenSigner::new("test-secret", "other-salt");

        assert!(matches!(
            wrong_secret.verify::<SignedPayload>(&token),
            Err(QrError::BadSignature)
        ));
        assert!(matches!(
            wrong_salt.verify::<SignedPayload>(&token),
            Err(QrError::BadSignature)
        ));
    }

    #[test]
    fn tampered_body_is_rejected() {
        let signer = TokenSigner::new("test-secret", "attendance-token");
        let token = signer.sign(&payload()).unwrap();
        let (_, signature) = token.rsplit_once('.').unwrap();

        let forged_body = BASE64_URL.encode(
            br#"{"event_id":"20991231-2359","issued_at_utc":"2025-01-07T00:15:00Z"}"#,
        );
        let forged = format!("{forged_body}.{signature}");

        assert!(matches!(
            signer.verify::<SignedPayload>(&forged),
            Err(QrError::BadSignature)
        ));
        assert!(matches!(
            signer.verify::<SignedPayload>("no-separator"),
            Err(QrError::MalformedToken)
        ));
    }
}
