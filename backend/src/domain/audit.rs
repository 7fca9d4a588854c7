//! Append-only audit trail of verification status changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::resident::VerificationStatus;

/// What an audit entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuditAction {
    /// Contact details became complete.
    DetailsUpdated,
    /// A verified government ID and a household pin were both present.
    SemiVerified,
    /// An official approved the resident.
    Approved,
}

impl AuditAction {
    /// The action recorded when a resident reaches `status`.
    pub fn for_status(status: VerificationStatus) -> Option<Self> {
        match status {
            VerificationStatus::NonVerified => None,
            VerificationStatus::DetailsUpdated => Some(Self::DetailsUpdated),
            VerificationStatus::SemiVerified => Some(Self::SemiVerified),
            VerificationStatus::Verified => Some(Self::Approved),
        }
    }
}

/// One immutable audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    timestamp: DateTime<Utc>,
    action: AuditAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    previous_status: Option<VerificationStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    new_status: Option<VerificationStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    approved_by: Option<String>,
}

impl AuditEntry {
    /// Entry describing a status change.
    pub fn transition(
        timestamp: DateTime<Utc>,
        action: AuditAction,
        previous_status: VerificationStatus,
        new_status: VerificationStatus,
    ) -> Self {
        Self {
            timestamp,
            action,
            previous_status: Some(previous_status),
            new_status: Some(new_status),
            approved_by: None,
        }
    }

    /// Attach the approving official.
    pub fn with_approver(mut self, approved_by: impl Into<String>) -> Self {
        self.approved_by = Some(approved_by.into());
        self
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn action(&self) -> AuditAction {
        self.action
    }

    pub fn previous_status(&self) -> Option<VerificationStatus> {
        self.previous_status
    }

    pub fn new_status(&self) -> Option<VerificationStatus> {
        self.new_status
    }

    pub fn approved_by(&self) -> Option<&str> {
        self.approved_by.as_deref()
    }
}

/// Rejections raised by [`AuditTrail::append`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuditError {
    /// The new entry predates the last recorded entry.
    #[error("audit entry at {attempted} precedes last entry at {last}")]
    OutOfOrder {
        last: DateTime<Utc>,
        attempted: DateTime<Utc>,
    },
}

/// Ordered, append-only list of [`AuditEntry`] values.
///
/// Deserialisation re-checks ordering, so a corrupted stored trail is
/// rejected rather than silently accepted.
///
/// # Examples
/// ```
/// use chrono::{Duration, Utc};
/// use resident_id::domain::{AuditAction, AuditEntry, AuditTrail, VerificationStatus};
///
/// let now = Utc::now();
/// let mut trail = AuditTrail::default();
/// trail
///     .append(AuditEntry::transition(
///         now,
///         AuditAction::DetailsUpdated,
///         VerificationStatus::NonVerified,
///         VerificationStatus::DetailsUpdated,
///     ))
///     .expect("first entry");
///
/// let stale = AuditEntry::transition(
///     now - Duration::seconds(5),
///     AuditAction::SemiVerified,
///     VerificationStatus::DetailsUpdated,
///     VerificationStatus::SemiVerified,
/// );
/// assert!(trail.append(stale).is_err());
/// assert_eq!(trail.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<AuditEntry>", into = "Vec<AuditEntry>")]
pub struct AuditTrail(Vec<AuditEntry>);

impl AuditTrail {
    /// Check whether an entry stamped at `timestamp` could be appended.
    pub fn check_order(&self, timestamp: DateTime<Utc>) -> Result<(), AuditError> {
        match self.last() {
            Some(last) if timestamp < last.timestamp => Err(AuditError::OutOfOrder {
                last: last.timestamp,
                attempted: timestamp,
            }),
            _ => Ok(()),
        }
    }

    /// Append `entry`, rejecting it if it predates the last entry.
    ///
    /// Equal timestamps are accepted.
    pub fn append(&mut self, entry: AuditEntry) -> Result<(), AuditError> {
        self.check_order(entry.timestamp)?;
        self.0.push(entry);
        Ok(())
    }

    pub fn entries(&self) -> &[AuditEntry] {
        self.0.as_slice()
    }

    pub fn last(&self) -> Option<&AuditEntry> {
        self.0.last()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AuditEntry> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a AuditTrail {
    type Item = &'a AuditEntry;
    type IntoIter = std::slice::Iter<'a, AuditEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl TryFrom<Vec<AuditEntry>> for AuditTrail {
    type Error = AuditError;

    fn try_from(value: Vec<AuditEntry>) -> Result<Self, Self::Error> {
        let mut trail = Self::default();
        for entry in value {
            trail.append(entry)?;
        }
        Ok(trail)
    }
}

impl From<AuditTrail> for Vec<AuditEntry> {
    fn from(value: AuditTrail) -> Self {
        value.0
    }
}
