//! Credential issuance: permanent IDs and short-lived session credentials.
//!
//! The permanent ID is derived once from the resident id and registration
//! date, then cached on the resident for good. Session credentials live for
//! exactly 24 hours and carry a checksum any verifier can recompute from the
//! credential's own fields.

use chrono::{DateTime, SecondsFormat, SubsecRound, TimeDelta, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::config::CredentialSettings;

use super::resident::{PermanentId, Resident, ResidentId, VerificationStatus};

mod payload;
mod session;

pub use payload::{SecurityBlock, SessionCredentialPayload, VerificationBlock};
pub use session::{SessionCredential, ValidationOutcome, ValidationReport, validate_session};

/// Lifetime of a session credential in hours.
pub const SESSION_TTL_HOURS: i64 = 24;

/// Lifetime of a session credential.
pub fn session_ttl() -> TimeDelta {
    TimeDelta::hours(SESSION_TTL_HOURS)
}

/// Render a timestamp the way it enters the checksum:
/// `YYYY-MM-DDTHH:MM:SS.mmmZ`.
///
/// # Examples
/// ```
/// use chrono::{TimeZone, Utc};
/// use resident_id::domain::format_timestamp;
///
/// let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// assert_eq!(format_timestamp(t), "2024-01-01T00:00:00.000Z");
/// ```
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Build `<prefix>_<resident id>_<YYYYMMDD>` from the registration date.
///
/// # Examples
/// ```
/// use chrono::{TimeZone, Utc};
/// use resident_id::domain::{ResidentId, derive_permanent_id};
///
/// let registered = Utc.with_ymd_and_hms(2024, 1, 1, 15, 45, 0).unwrap();
/// let id = derive_permanent_id("BRG", &ResidentId::new("R1").unwrap(), registered);
/// assert_eq!(id.as_str(), "BRG_R1_20240101");
/// ```
pub fn derive_permanent_id(
    prefix: &str,
    resident_id: &ResidentId,
    date_registered: DateTime<Utc>,
) -> PermanentId {
    PermanentId::from_raw(format!(
        "{prefix}_{resident_id}_{}",
        date_registered.format("%Y%m%d")
    ))
}

/// Errors raised while issuing credentials.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    /// Sessions are only issued to verified residents.
    #[error("session credentials require a verified resident (status is {status})")]
    NotVerified { status: VerificationStatus },
}

/// Issues permanent IDs and session credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialIssuer {
    permanent_id_prefix: String,
    payload_version: String,
}

impl CredentialIssuer {
    /// Create an issuer from loaded settings.
    pub fn new(settings: &CredentialSettings) -> Self {
        Self {
            permanent_id_prefix: settings.permanent_id_prefix().to_owned(),
            payload_version: settings.payload_version().to_owned(),
        }
    }

    /// Version label written into transport payloads.
    pub fn payload_version(&self) -> &str {
        self.payload_version.as_str()
    }

    /// Return the resident's permanent ID, deriving and caching it on first
    /// use.
    ///
    /// Once cached the value is returned as-is; later edits to the resident
    /// (including the registration date) cannot change it.
    pub fn permanent_id(&self, resident: &mut Resident) -> PermanentId {
        if let Some(existing) = resident.qr_code.as_ref() {
            return existing.clone();
        }
        let derived = derive_permanent_id(
            &self.permanent_id_prefix,
            &resident.id,
            resident.date_registered,
        );
        resident.qr_code = Some(derived.clone());
        derived
    }

    /// Issue a 24-hour session credential for a verified resident.
    ///
    /// Rejected residents are left untouched. The issue time is truncated to
    /// whole milliseconds so the checksum input survives transport.
    pub fn issue_session(
        &self,
        resident: &mut Resident,
        now: DateTime<Utc>,
    ) -> Result<SessionCredential, CredentialError> {
        let status = resident.verification_status;
        if status != VerificationStatus::Verified {
            return Err(CredentialError::NotVerified { status });
        }
        let qr_code_id = self.permanent_id(resident);
        let issued_at = now.trunc_subsecs(3);
        Ok(SessionCredential::issue(
            resident.id.clone(),
            qr_code_id,
            Uuid::new_v4(),
            issued_at,
        ))
    }

    /// Render the transport payload for a credential.
    pub fn to_payload(
        &self,
        credential: &SessionCredential,
        resident: &Resident,
    ) -> SessionCredentialPayload {
        let status = resident.verification_status;
        let last_updated = resident
            .audit_trail
            .last()
            .map_or(credential.issued_at(), |entry| entry.timestamp());
        SessionCredentialPayload {
            resident_id: credential.resident_id().to_string(),
            qr_code_id: credential.qr_code_id().to_string(),
            unique_session_id: credential.unique_session_id(),
            security: SecurityBlock {
                generated_at: credential.issued_at(),
                expires_at: credential.expires_at(),
                version: self.payload_version.clone(),
                checksum: credential.checksum().to_owned(),
            },
            verification: VerificationBlock {
                is_verified: status == VerificationStatus::Verified,
                verification_level: status,
                last_updated,
            },
        }
    }
}
