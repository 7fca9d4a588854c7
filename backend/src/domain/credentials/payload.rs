//! Transport payload encoded into the scannable credential.
//!
//! Timestamps travel as `YYYY-MM-DDTHH:MM:SS.mmmZ`, the exact text the
//! checksum was computed over, so a verifier can recompute it from the
//! payload alone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::resident::VerificationStatus;

/// Scannable form of a session credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCredentialPayload {
    pub resident_id: String,
    pub qr_code_id: String,
    pub unique_session_id: Uuid,
    pub security: SecurityBlock,
    pub verification: VerificationBlock,
}

/// Issue window, version label, and checksum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityBlock {
    #[serde(with = "iso_millis")]
    pub generated_at: DateTime<Utc>,
    #[serde(with = "iso_millis")]
    pub expires_at: DateTime<Utc>,
    pub version: String,
    pub checksum: String,
}

/// Resident status as of payload generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationBlock {
    pub is_verified: bool,
    pub verification_level: VerificationStatus,
    #[serde(with = "iso_millis")]
    pub last_updated: DateTime<Utc>,
}

mod iso_millis {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::domain::credentials::format_timestamp;

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_timestamp(*value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
