use serde::{Deserialize, Serialize};

/// Claims embedded in the `sig` query parameter of an attendance link.
///
/// Field order is part of the wire format: the payload is serialized as
/// compact JSON before signing, so reordering the fields changes every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedPayload {
    /// Minute-granularity session identifier, `YYYYMMDD-HHmm`.
    pub event_id: String,
    /// RFC 3339 timestamp in UTC (`2025-01-06T23:15:00Z`).
    pub issued_at_utc: String,
}
