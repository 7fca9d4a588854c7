//! Reconciles the identity table and the resident profile table.
//!
//! Accounts live in two independently owned tables: the identity record
//! every account has, and the domain profile record only residents have.
//! [`ProfileMerger::load`] reads both by email and folds them into a single
//! [`Resident`]. Merge rules:
//!
//! - email lookups are case-insensitive on both sides;
//! - `official` and `admin` accounts never consult the profile table;
//! - non-empty profile text wins over the identity value;
//! - verification facts and the revision come only from the profile;
//! - an identity and a profile with different ids are never merged.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::audit::AuditTrail;
use super::location::HouseLocation;
use super::ports::{
    IdentityDirectory, IdentityDirectoryError, ResidentProfileRepository,
    ResidentProfileRepositoryError,
};
use super::resident::{
    GovernmentId, PermanentId, Resident, ResidentId, VerificationStatus, normalize_email,
};

/// Account role held in the identity table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountRole {
    #[default]
    Resident,
    Official,
    Admin,
}

impl AccountRole {
    /// Only resident accounts carry a domain profile.
    pub fn has_profile(self) -> bool {
        matches!(self, Self::Resident)
    }
}

/// Row from the identity/auth table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub id: ResidentId,
    pub email: String,
    pub name: String,
    pub role: AccountRole,
    pub created_at: DateTime<Utc>,
}

/// Row from the resident profile table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidentProfileRecord {
    pub id: ResidentId,
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub civil_status: Option<String>,
    #[serde(default)]
    pub nationality: Option<String>,
    #[serde(default)]
    pub occupation: Option<String>,
    #[serde(default)]
    pub monthly_income: Option<f64>,
    #[serde(default)]
    pub verification_status: VerificationStatus,
    #[serde(default)]
    pub qr_code: Option<PermanentId>,
    #[serde(default)]
    pub house_location: Option<HouseLocation>,
    #[serde(default)]
    pub government_ids: BTreeMap<String, GovernmentId>,
    #[serde(default)]
    pub audit_trail: AuditTrail,
    pub date_registered: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub revision: u32,
}

impl From<&Resident> for ResidentProfileRecord {
    fn from(resident: &Resident) -> Self {
        Self {
            id: resident.id.clone(),
            email: resident.email.clone(),
            name: resident.name.clone(),
            phone: resident.phone.clone(),
            address: resident.address.clone(),
            birth_date: resident.birth_date,
            gender: resident.gender.clone(),
            civil_status: resident.civil_status.clone(),
            nationality: resident.nationality.clone(),
            occupation: resident.occupation.clone(),
            monthly_income: resident.monthly_income,
            verification_status: resident.verification_status,
            qr_code: resident.qr_code.clone(),
            house_location: resident.house_location.clone(),
            government_ids: resident.government_ids.clone(),
            audit_trail: resident.audit_trail.clone(),
            date_registered: resident.date_registered,
            created_at: resident.created_at,
            updated_at: resident.updated_at,
            revision: resident.revision,
        }
    }
}

/// Where a resident's data came from.
#[derive(Debug, Clone, PartialEq)]
pub enum ResidentSource {
    /// An account with no profile row yet, or a non-resident account.
    IdentityOnly(IdentityRecord),
    /// Both halves, with the profile winning on conflict.
    Merged {
        identity: IdentityRecord,
        profile: ResidentProfileRecord,
    },
}

impl ResidentSource {
    /// Classify the lookup results for `email`.
    ///
    /// A profile without an identity row gets a minimal identity view
    /// synthesised from the profile itself. Rows that belong to different
    /// accounts are never combined.
    pub fn resolve(
        email: &str,
        identity: Option<IdentityRecord>,
        profile: Option<ResidentProfileRecord>,
    ) -> Result<Self, ProfileMergeError> {
        match (identity, profile) {
            (None, None) => Err(ProfileMergeError::ProfileNotFound {
                email: email.to_owned(),
            }),
            (Some(identity), None) => Ok(Self::IdentityOnly(identity)),
            (Some(identity), Some(profile)) if identity.id != profile.id => {
                Err(ProfileMergeError::AccountMismatch {
                    email: email.to_owned(),
                    identity_id: identity.id,
                    profile_id: profile.id,
                })
            }
            (identity, Some(profile)) => {
                let identity = identity.unwrap_or_else(|| synthesise_identity(&profile));
                Ok(Self::Merged { identity, profile })
            }
        }
    }

    /// Fold the source into a single aggregate.
    pub fn into_resident(self) -> Resident {
        match self {
            Self::IdentityOnly(identity) => identity_only(identity),
            Self::Merged { identity, profile } => merged(identity, profile),
        }
    }
}

fn synthesise_identity(profile: &ResidentProfileRecord) -> IdentityRecord {
    IdentityRecord {
        id: profile.id.clone(),
        email: profile.email.clone(),
        name: profile.name.clone(),
        role: AccountRole::Resident,
        created_at: profile.created_at,
    }
}

fn identity_only(identity: IdentityRecord) -> Resident {
    Resident {
        id: identity.id,
        name: identity.name,
        email: normalize_email(&identity.email),
        phone: String::new(),
        address: String::new(),
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
        date_registered: identity.created_at,
        created_at: identity.created_at,
        updated_at: identity.created_at,
        revision: 0,
    }
}

fn prefer_profile(profile: String, identity: String) -> String {
    if profile.trim().is_empty() {
        identity
    } else {
        profile
    }
}

fn merged(identity: IdentityRecord, profile: ResidentProfileRecord) -> Resident {
    let email = prefer_profile(profile.email, identity.email);
    Resident {
        id: profile.id,
        name: prefer_profile(profile.name, identity.name),
        email: normalize_email(&email),
        phone: profile.phone,
        address: profile.address,
        birth_date: profile.birth_date,
        gender: profile.gender,
        civil_status: profile.civil_status,
        nationality: profile.nationality,
        occupation: profile.occupation,
        monthly_income: profile.monthly_income,
        government_ids: profile.government_ids,
        house_location: profile.house_location,
        verification_status: profile.verification_status,
        qr_code: profile.qr_code,
        audit_trail: profile.audit_trail,
        date_registered: profile.date_registered,
        created_at: profile.created_at,
        updated_at: profile.updated_at,
        revision: profile.revision,
    }
}

/// Errors raised while loading a merged resident.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileMergeError {
    /// Neither table has a row for the email.
    #[error("no resident profile found for {email}")]
    ProfileNotFound { email: String },
    /// The identity and the profile stored under one email belong to
    /// different accounts.
    #[error("{email} maps to identity {identity_id} but profile {profile_id}")]
    AccountMismatch {
        email: String,
        identity_id: ResidentId,
        profile_id: ResidentId,
    },
    #[error(transparent)]
    Identity(#[from] IdentityDirectoryError),
    #[error(transparent)]
    Profile(#[from] ResidentProfileRepositoryError),
}

/// Loads residents from the identity directory and the profile repository.
pub struct ProfileMerger<I, P> {
    identities: Arc<I>,
    profiles: Arc<P>,
}

impl<I, P> Clone for ProfileMerger<I, P> {
    fn clone(&self) -> Self {
        Self {
            identities: Arc::clone(&self.identities),
            profiles: Arc::clone(&self.profiles),
        }
    }
}

impl<I, P> ProfileMerger<I, P> {
    /// Create a merger over the given ports.
    pub fn new(identities: Arc<I>, profiles: Arc<P>) -> Self {
        Self {
            identities,
            profiles,
        }
    }
}

impl<I, P> ProfileMerger<I, P>
where
    I: IdentityDirectory,
    P: ResidentProfileRepository,
{
    /// Read both halves for `email` and classify them.
    pub async fn source(&self, email: &str) -> Result<ResidentSource, ProfileMergeError> {
        let email = normalize_email(email);
        let identity = self.identities.find_by_email(&email).await?;
        let wants_profile = identity
            .as_ref()
            .is_none_or(|record| record.role.has_profile());
        let profile = if wants_profile {
            self.profiles.find_by_email(&email).await?
        } else {
            None
        };
        ResidentSource::resolve(&email, identity, profile)
    }

    /// Load the merged resident for `email`.
    pub async fn load(&self, email: &str) -> Result<Resident, ProfileMergeError> {
        self.source(email).await.map(ResidentSource::into_resident)
    }
}
