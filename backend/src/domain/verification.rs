//! Four-stage verification state machine.
//!
//! ```text
//! non-verified -> details-updated -> semi-verified -> verified
//! ```
//!
//! The first two edges are computed from resident facts by [`evaluate`].
//! The last edge is never automatic: it needs an official's [`approve`].
//! Every advance appends exactly one audit entry; a rejected append leaves
//! the status where it was.

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::audit::{AuditAction, AuditEntry, AuditError};
use super::resident::{Resident, VerificationStatus};

/// Errors raised by explicit state machine actions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// The action is not available from the resident's current status.
    #[error("cannot approve a resident whose status is {from}")]
    InvalidTransition { from: VerificationStatus },
    /// Approval requires a named official.
    #[error("approval requires a non-empty approver")]
    MissingApprover,
    /// The audit trail rejected the entry because of clock skew.
    #[error(transparent)]
    OutOfOrderAudit(#[from] AuditError),
}

/// A guard input that is still missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Requirement {
    Phone,
    Address,
    Email,
    VerifiedGovernmentId,
    HouseLocation,
    OfficialApproval,
}

/// One applied status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: VerificationStatus,
    pub to: VerificationStatus,
    pub entry: AuditEntry,
}

/// Guard inputs missing for the resident's next step.
///
/// An empty list means the next automatic step would be taken; a fully
/// verified resident has nothing pending.
///
/// # Examples
/// ```
/// use chrono::Utc;
/// use resident_id::domain::{Requirement, Resident, ResidentDraft, ResidentId, pending_requirements};
///
/// let resident = Resident::new(ResidentDraft {
///     id: ResidentId::new("R1").unwrap(),
///     name: "Juan".into(),
///     email: "a@b.com".into(),
///     phone: String::new(),
///     address: String::new(),
///     date_registered: Utc::now(),
/// });
/// assert_eq!(
///     pending_requirements(&resident),
///     vec![Requirement::Phone, Requirement::Address]
/// );
/// ```
pub fn pending_requirements(resident: &Resident) -> Vec<Requirement> {
    match resident.verification_status {
        VerificationStatus::NonVerified => [
            (Requirement::Phone, resident.phone.as_str()),
            (Requirement::Address, resident.address.as_str()),
            (Requirement::Email, resident.email.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(requirement, _)| requirement)
        .collect(),
        VerificationStatus::DetailsUpdated => {
            let mut missing = Vec::new();
            if !resident.has_verified_government_id() {
                missing.push(Requirement::VerifiedGovernmentId);
            }
            if resident.house_location.is_none() {
                missing.push(Requirement::HouseLocation);
            }
            missing
        }
        VerificationStatus::SemiVerified => vec![Requirement::OfficialApproval],
        VerificationStatus::Verified => Vec::new(),
    }
}

fn automatic_guard_holds(resident: &Resident) -> bool {
    match resident.verification_status {
        VerificationStatus::NonVerified | VerificationStatus::DetailsUpdated => {
            pending_requirements(resident).is_empty()
        }
        VerificationStatus::SemiVerified | VerificationStatus::Verified => false,
    }
}

/// Check the guard for the current status and advance at most one step.
///
/// Returns `Ok(None)` when the guard is not yet satisfied; that is the
/// normal mid-process state and leaves the resident untouched. Calling it
/// again without new facts never produces a second audit entry.
pub fn evaluate(
    resident: &mut Resident,
    now: DateTime<Utc>,
) -> Result<Option<Transition>, VerificationError> {
    if !automatic_guard_holds(resident) {
        return Ok(None);
    }
    let from = resident.verification_status;
    let Some(to) = from.next() else {
        return Ok(None);
    };
    let Some(action) = AuditAction::for_status(to) else {
        return Ok(None);
    };
    let entry = AuditEntry::transition(now, action, from, to);
    advance(resident, entry).map(Some)
}

/// Move a `semi-verified` resident to `verified` on an official's say-so.
///
/// The status check runs before the approver check, so a repeated approval
/// reports [`VerificationError::InvalidTransition`] whatever the actor.
pub fn approve(
    resident: &mut Resident,
    actor: &str,
    now: DateTime<Utc>,
) -> Result<Transition, VerificationError> {
    let from = resident.verification_status;
    if from != VerificationStatus::SemiVerified {
        return Err(VerificationError::InvalidTransition { from });
    }
    let actor = actor.trim();
    if actor.is_empty() {
        return Err(VerificationError::MissingApprover);
    }
    let entry = AuditEntry::transition(
        now,
        AuditAction::Approved,
        from,
        VerificationStatus::Verified,
    )
    .with_approver(actor);
    advance(resident, entry)
}

fn advance(resident: &mut Resident, entry: AuditEntry) -> Result<Transition, VerificationError> {
    let from = resident.verification_status;
    let to = entry.new_status().unwrap_or(from);
    resident.audit_trail.append(entry.clone())?;
    resident.verification_status = to;
    Ok(Transition { from, to, entry })
}

#[cfg(test)]
mod tests;
