//! Resident aggregate: identity, profile, and verification facts.
//!
//! The aggregate is the unit the state machine, location binding, and
//! credential issuer operate on. Profile edits flow through
//! [`ProfileUpdate`] so they can never reach the verification status, the
//! cached permanent ID, or the audit trail.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::audit::AuditTrail;
use super::location::HouseLocation;

/// Validation errors raised by resident constructors and mutators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResidentValidationError {
    EmptyId,
    IdContainsWhitespace,
    EmptyGovernmentIdKind,
    EmptyGovernmentIdNumber,
    UnknownGovernmentId { kind: String },
    InvalidMonthlyIncome,
}

impl fmt::Display for ResidentValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyId => write!(f, "resident id must not be empty"),
            Self::IdContainsWhitespace => {
                write!(f, "resident id must not contain whitespace")
            }
            Self::EmptyGovernmentIdKind => write!(f, "government id kind must not be empty"),
            Self::EmptyGovernmentIdNumber => {
                write!(f, "government id number must not be empty")
            }
            Self::UnknownGovernmentId { kind } => {
                write!(f, "no government id of kind {kind} has been submitted")
            }
            Self::InvalidMonthlyIncome => {
                write!(f, "monthly income must be finite and non-negative")
            }
        }
    }
}

impl std::error::Error for ResidentValidationError {}

/// Stable resident identifier.
///
/// Permanent IDs embed this value, so it may not contain whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResidentId(String);

impl ResidentId {
    /// Validate and construct a [`ResidentId`].
    ///
    /// # Examples
    /// ```
    /// use resident_id::domain::ResidentId;
    ///
    /// let id = ResidentId::new("R1").expect("valid id");
    /// assert_eq!(id.as_str(), "R1");
    /// assert!(ResidentId::new("  ").is_err());
    /// ```
    pub fn new(id: impl Into<String>) -> Result<Self, ResidentValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ResidentValidationError::EmptyId);
        }
        if id.chars().any(char::is_whitespace) {
            return Err(ResidentValidationError::IdContainsWhitespace);
        }
        Ok(Self(id))
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for ResidentId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ResidentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ResidentId> for String {
    fn from(value: ResidentId) -> Self {
        value.0
    }
}

impl TryFrom<String> for ResidentId {
    type Error = ResidentValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Permanent credential identifier, assigned at most once per resident.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermanentId(String);

impl PermanentId {
    pub(crate) fn from_raw(value: String) -> Self {
        Self(value)
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for PermanentId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for PermanentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position in the four-stage verification progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerificationStatus {
    #[default]
    NonVerified,
    DetailsUpdated,
    SemiVerified,
    Verified,
}

impl VerificationStatus {
    /// All statuses in progression order.
    pub const ALL: [Self; 4] = [
        Self::NonVerified,
        Self::DetailsUpdated,
        Self::SemiVerified,
        Self::Verified,
    ];

    /// The status one step further along, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::NonVerified => Some(Self::DetailsUpdated),
            Self::DetailsUpdated => Some(Self::SemiVerified),
            Self::SemiVerified => Some(Self::Verified),
            Self::Verified => None,
        }
    }

    /// Stable wire label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NonVerified => "non-verified",
            Self::DetailsUpdated => "details-updated",
            Self::SemiVerified => "semi-verified",
            Self::Verified => "verified",
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown status label.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown verification status: {0}")]
pub struct ParseVerificationStatusError(String);

impl FromStr for VerificationStatus {
    type Err = ParseVerificationStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseVerificationStatusError(s.to_owned()))
    }
}

/// A submitted government-issued ID and its review state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GovernmentId {
    number: String,
    verified: bool,
    upload_date: DateTime<Utc>,
}

impl GovernmentId {
    /// ID number as printed on the document.
    pub fn number(&self) -> &str {
        self.number.as_str()
    }

    /// Whether an official has checked the document.
    pub fn is_verified(&self) -> bool {
        self.verified
    }

    /// When the document scan was submitted.
    pub fn upload_date(&self) -> DateTime<Utc> {
        self.upload_date
    }
}

/// Input payload for [`Resident::new`].
#[derive(Debug, Clone)]
pub struct ResidentDraft {
    pub id: ResidentId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub date_registered: DateTime<Utc>,
}

/// Optional profile edits applied by [`Resident::apply_profile_update`].
///
/// Fields left as `None` keep their current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<String>,
    pub civil_status: Option<String>,
    pub nationality: Option<String>,
    pub occupation: Option<String>,
    pub monthly_income: Option<f64>,
    pub date_registered: Option<DateTime<Utc>>,
}

/// Identity and profile aggregate for one portal resident.
///
/// ## Invariants
/// - `qr_code` is assigned at most once and never changes afterwards.
/// - `verification_status` only moves forward, one step at a time, and only
///   through the verification state machine.
/// - `audit_trail` is append-only and non-decreasing in time.
#[derive(Debug, Clone, PartialEq)]
pub struct Resident {
    pub(crate) id: ResidentId,
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) phone: String,
    pub(crate) address: String,
    pub(crate) birth_date: Option<NaiveDate>,
    pub(crate) gender: Option<String>,
    pub(crate) civil_status: Option<String>,
    pub(crate) nationality: Option<String>,
    pub(crate) occupation: Option<String>,
    pub(crate) monthly_income: Option<f64>,
    pub(crate) government_ids: BTreeMap<String, GovernmentId>,
    pub(crate) house_location: Option<HouseLocation>,
    pub(crate) verification_status: VerificationStatus,
    pub(crate) qr_code: Option<PermanentId>,
    pub(crate) audit_trail: AuditTrail,
    pub(crate) date_registered: DateTime<Utc>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) revision: u32,
}

impl Resident {
    /// Create a freshly registered, unsaved resident at `non-verified`.
    pub fn new(draft: ResidentDraft) -> Self {
        let ResidentDraft {
            id,
            name,
            email,
            phone,
            address,
            date_registered,
        } = draft;
        Self {
            id,
            name,
            email: normalize_email(&email),
            phone,
            address,
            birth_date: None,
            gender: None,
            civil_status: None,
            nationality: None,
            occupation: None,
            monthly_income: None,
            government_ids: BTreeMap::new(),
            house_location: None,
            verification_status: VerificationStatus::NonVerified,
            qr_code: None,
            audit_trail: AuditTrail::default(),
            date_registered,
            created_at: date_registered,
            updated_at: date_registered,
            revision: 0,
        }
    }

    pub fn id(&self) -> &ResidentId {
        &self.id
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Normalised (trimmed, lowercase) email address.
    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    pub fn phone(&self) -> &str {
        self.phone.as_str()
    }

    pub fn address(&self) -> &str {
        self.address.as_str()
    }

    pub fn birth_date(&self) -> Option<NaiveDate> {
        self.birth_date
    }

    pub fn gender(&self) -> Option<&str> {
        self.gender.as_deref()
    }

    pub fn civil_status(&self) -> Option<&str> {
        self.civil_status.as_deref()
    }

    pub fn nationality(&self) -> Option<&str> {
        self.nationality.as_deref()
    }

    pub fn occupation(&self) -> Option<&str> {
        self.occupation.as_deref()
    }

    pub fn monthly_income(&self) -> Option<f64> {
        self.monthly_income
    }

    /// Submitted government IDs keyed by document kind.
    pub fn government_ids(&self) -> &BTreeMap<String, GovernmentId> {
        &self.government_ids
    }

    /// Whether any submitted government ID has been verified by an official.
    pub fn has_verified_government_id(&self) -> bool {
        self.government_ids.values().any(GovernmentId::is_verified)
    }

    /// The authoritative household pin, if one has been placed.
    pub fn house_location(&self) -> Option<&HouseLocation> {
        self.house_location.as_ref()
    }

    pub fn verification_status(&self) -> VerificationStatus {
        self.verification_status
    }

    /// The cached permanent ID; `None` until first derived.
    pub fn qr_code(&self) -> Option<&PermanentId> {
        self.qr_code.as_ref()
    }

    pub fn audit_trail(&self) -> &AuditTrail {
        &self.audit_trail
    }

    pub fn date_registered(&self) -> DateTime<Utc> {
        self.date_registered
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Storage revision this snapshot was read at; `0` when never saved.
    pub fn revision(&self) -> u32 {
        self.revision
    }

    /// Apply profile edits.
    ///
    /// Never touches the verification status, the cached permanent ID, or
    /// the audit trail. Guards are re-checked on the next evaluation. A
    /// rejected update leaves every field as it was.
    pub fn apply_profile_update(
        &mut self,
        update: ProfileUpdate,
    ) -> Result<(), ResidentValidationError> {
        if update
            .monthly_income
            .is_some_and(|income| !income.is_finite() || income < 0.0)
        {
            return Err(ResidentValidationError::InvalidMonthlyIncome);
        }
        let ProfileUpdate {
            name,
            email,
            phone,
            address,
            birth_date,
            gender,
            civil_status,
            nationality,
            occupation,
            monthly_income,
            date_registered,
        } = update;

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(email) = email {
            self.email = normalize_email(&email);
        }
        if let Some(phone) = phone {
            self.phone = phone;
        }
        if let Some(address) = address {
            self.address = address;
        }
        if birth_date.is_some() {
            self.birth_date = birth_date;
        }
        if gender.is_some() {
            self.gender = gender;
        }
        if civil_status.is_some() {
            self.civil_status = civil_status;
        }
        if nationality.is_some() {
            self.nationality = nationality;
        }
        if occupation.is_some() {
            self.occupation = occupation;
        }
        if monthly_income.is_some() {
            self.monthly_income = monthly_income;
        }
        if let Some(date_registered) = date_registered {
            self.date_registered = date_registered;
        }
        Ok(())
    }

    /// Record a government ID submission.
    ///
    /// Resubmitting a kind replaces the previous entry and resets its review
    /// state.
    pub fn submit_government_id(
        &mut self,
        kind: &str,
        number: &str,
        uploaded_at: DateTime<Utc>,
    ) -> Result<(), ResidentValidationError> {
        let kind = normalize_government_id_kind(kind)?;
        let number = number.trim();
        if number.is_empty() {
            return Err(ResidentValidationError::EmptyGovernmentIdNumber);
        }
        self.government_ids.insert(
            kind,
            GovernmentId {
                number: number.to_owned(),
                verified: false,
                upload_date: uploaded_at,
            },
        );
        Ok(())
    }

    /// Mark a previously submitted government ID as checked by an official.
    pub fn mark_government_id_verified(&mut self, kind: &str) -> Result<(), ResidentValidationError> {
        let kind = normalize_government_id_kind(kind)?;
        match self.government_ids.get_mut(&kind) {
            Some(entry) => {
                entry.verified = true;
                Ok(())
            }
            None => Err(ResidentValidationError::UnknownGovernmentId { kind }),
        }
    }
}

/// Normalise an email for lookups: trimmed and lowercased.
///
/// # Examples
/// ```
/// use resident_id::domain::normalize_email;
///
/// assert_eq!(normalize_email("  Juan@Example.PH "), "juan@example.ph");
/// ```
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn normalize_government_id_kind(kind: &str) -> Result<String, ResidentValidationError> {
    let kind = kind.trim().to_lowercase();
    if kind.is_empty() {
        return Err(ResidentValidationError::EmptyGovernmentIdKind);
    }
    Ok(kind)
}

#[cfg(test)]
mod tests;
