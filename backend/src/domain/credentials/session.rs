//! Session credential entity and scan-time validation.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{SessionCredentialPayload, format_timestamp, session_ttl};
use crate::domain::checksum::{checksum, checksum_matches};
use crate::domain::resident::{PermanentId, Resident, ResidentId, ResidentValidationError};

/// A time-boxed, checksum-protected credential presented at a scan point.
///
/// ## Invariants
/// - `expires_at == issued_at + 24h` for issued credentials.
/// - `checksum` depends only on `resident_id`, `issued_at`, and `qr_code_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCredential {
    resident_id: ResidentId,
    qr_code_id: PermanentId,
    unique_session_id: Uuid,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    checksum: String,
    scan_count: u32,
}

impl SessionCredential {
    pub(super) fn issue(
        resident_id: ResidentId,
        qr_code_id: PermanentId,
        unique_session_id: Uuid,
        issued_at: DateTime<Utc>,
    ) -> Self {
        let checksum = checksum(
            resident_id.as_str(),
            &format_timestamp(issued_at),
            qr_code_id.as_str(),
        );
        Self {
            resident_id,
            qr_code_id,
            unique_session_id,
            issued_at,
            expires_at: issued_at + session_ttl(),
            checksum,
            scan_count: 0,
        }
    }

    /// Rebuild a credential from a scanned payload.
    ///
    /// Nothing is trusted here: the caller runs [`validate_session`] on the
    /// result. The scan count starts from zero on the verifier side.
    pub fn from_payload(payload: &SessionCredentialPayload) -> Result<Self, ResidentValidationError> {
        Ok(Self {
            resident_id: ResidentId::new(payload.resident_id.clone())?,
            qr_code_id: PermanentId::from_raw(payload.qr_code_id.clone()),
            unique_session_id: payload.unique_session_id,
            issued_at: payload.security.generated_at,
            expires_at: payload.security.expires_at,
            checksum: payload.security.checksum.clone(),
            scan_count: 0,
        })
    }

    pub fn resident_id(&self) -> &ResidentId {
        &self.resident_id
    }

    pub fn qr_code_id(&self) -> &PermanentId {
        &self.qr_code_id
    }

    pub fn unique_session_id(&self) -> Uuid {
        self.unique_session_id
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn checksum(&self) -> &str {
        self.checksum.as_str()
    }

    /// Scans recorded so far. Informational only; never enforced.
    pub fn scan_count(&self) -> u32 {
        self.scan_count
    }

    /// Count one more scan and return the new total.
    pub fn record_scan(&mut self) -> u32 {
        self.scan_count = self.scan_count.saturating_add(1);
        self.scan_count
    }
}

/// Independent validation results for one credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationReport {
    /// Checksum recomputes and the expiry window is exactly 24 hours.
    pub integrity_ok: bool,
    /// The check ran strictly before `expires_at`.
    pub not_expired: bool,
    /// The credential names the resident it was checked against.
    pub resident_matches: bool,
}

/// Single-word summary of a [`ValidationReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid,
    Tampered,
    Expired,
    WrongResident,
}

impl ValidationReport {
    /// All three checks passed.
    pub fn is_valid(&self) -> bool {
        self.integrity_ok && self.not_expired && self.resident_matches
    }

    /// Classify the report; tampering outranks expiry, expiry outranks a
    /// resident mismatch.
    pub fn outcome(&self) -> ValidationOutcome {
        if !self.integrity_ok {
            ValidationOutcome::Tampered
        } else if !self.not_expired {
            ValidationOutcome::Expired
        } else if !self.resident_matches {
            ValidationOutcome::WrongResident
        } else {
            ValidationOutcome::Valid
        }
    }
}

/// Check a credential against a resident at `now` without mutating either.
pub fn validate_session(
    credential: &SessionCredential,
    resident: &Resident,
    now: DateTime<Utc>,
) -> ValidationReport {
    let checksum_ok = checksum_matches(
        &credential.checksum,
        credential.resident_id.as_str(),
        &format_timestamp(credential.issued_at),
        credential.qr_code_id.as_str(),
    );
    let window_ok = credential.expires_at == credential.issued_at + session_ttl();
    ValidationReport {
        integrity_ok: checksum_ok && window_ok,
        not_expired: now < credential.expires_at,
        resident_matches: credential.resident_id == resident.id,
    }
}
