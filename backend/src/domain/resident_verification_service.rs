//! Resident verification domain service.
//!
//! Wires the merger, state machine, location binding, and credential issuer
//! to the repository ports. Every mutation is a read-check-write cycle: load
//! the merged resident, apply the operation, then save with the revision
//! that was read. When another writer got there first the cycle restarts
//! from a fresh load, so the operation is re-checked against the new state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mockable::Clock;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::CredentialSettings;
use crate::domain::credentials;
use crate::domain::ports::{
    IdentityDirectory, IdentityDirectoryError, ResidentProfileRepository,
    ResidentProfileRepositoryError,
};
use crate::domain::{
    CredentialError, CredentialIssuer, Error, LocationError, LocationPin, PermanentId,
    ProfileMergeError, ProfileMerger, ProfileUpdate, Requirement, Resident, ResidentId,
    ResidentProfileRecord, ResidentValidationError, SessionCredential, SessionCredentialPayload,
    Transition, ValidationReport, VerificationError, location, normalize_email, verification,
};

/// A freshly issued session and its transport payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedSession {
    pub credential: SessionCredential,
    pub payload: SessionCredentialPayload,
}

/// Resident verification service over the identity and profile ports.
pub struct ResidentVerificationService<I, P> {
    merger: ProfileMerger<I, P>,
    identities: Arc<I>,
    profiles: Arc<P>,
    issuer: CredentialIssuer,
    clock: Arc<dyn Clock>,
    max_write_attempts: u8,
}

impl<I, P> Clone for ResidentVerificationService<I, P> {
    fn clone(&self) -> Self {
        Self {
            merger: self.merger.clone(),
            identities: Arc::clone(&self.identities),
            profiles: Arc::clone(&self.profiles),
            issuer: self.issuer.clone(),
            clock: Arc::clone(&self.clock),
            max_write_attempts: self.max_write_attempts,
        }
    }
}

impl<I, P> ResidentVerificationService<I, P> {
    /// Create a new service with the given ports, clock, and settings.
    pub fn new(
        identities: Arc<I>,
        profiles: Arc<P>,
        clock: Arc<dyn Clock>,
        settings: &CredentialSettings,
    ) -> Self {
        Self {
            merger: ProfileMerger::new(Arc::clone(&identities), Arc::clone(&profiles)),
            identities,
            profiles,
            issuer: CredentialIssuer::new(settings),
            clock,
            max_write_attempts: settings.max_write_attempts(),
        }
    }
}

impl<I, P> ResidentVerificationService<I, P>
where
    I: IdentityDirectory,
    P: ResidentProfileRepository,
{
    fn map_identity_error(error: IdentityDirectoryError) -> Error {
        match error {
            IdentityDirectoryError::Connection { message } => {
                Error::service_unavailable(format!("identity directory unavailable: {message}"))
            }
            IdentityDirectoryError::Query { message } => {
                Error::internal(format!("identity directory error: {message}"))
            }
        }
    }

    fn map_profile_error(error: ResidentProfileRepositoryError) -> Error {
        match error {
            ResidentProfileRepositoryError::Connection { message } => Error::service_unavailable(
                format!("resident profile repository unavailable: {message}"),
            ),
            ResidentProfileRepositoryError::Query { message } => {
                Error::internal(format!("resident profile repository error: {message}"))
            }
            ResidentProfileRepositoryError::RevisionMismatch { expected, actual } => {
                Self::revision_conflict(Some(expected), actual)
            }
        }
    }

    fn map_merge_error(error: ProfileMergeError) -> Error {
        match error {
            ProfileMergeError::ProfileNotFound { email } => {
                Error::profile_not_found(format!("no resident profile found for {email}"))
                    .with_details(json!({ "email": email }))
            }
            ProfileMergeError::AccountMismatch {
                ref email,
                ref identity_id,
                ref profile_id,
            } => {
                warn!(
                    %email,
                    %identity_id,
                    %profile_id,
                    "identity and profile rows disagree on the account"
                );
                Error::conflict(error.to_string()).with_details(json!({
                    "email": email,
                    "code": "account_mismatch",
                }))
            }
            ProfileMergeError::Identity(inner) => Self::map_identity_error(inner),
            ProfileMergeError::Profile(inner) => Self::map_profile_error(inner),
        }
    }

    fn map_verification_error(error: VerificationError) -> Error {
        match error {
            VerificationError::InvalidTransition { from } => {
                Error::invalid_transition(error.to_string())
                    .with_details(json!({ "status": from }))
            }
            VerificationError::MissingApprover => Error::missing_approver(error.to_string()),
            VerificationError::OutOfOrderAudit(ref inner) => {
                warn!(error = %inner, "audit append rejected");
                Error::out_of_order_audit(error.to_string())
            }
        }
    }

    fn map_location_error(error: LocationError) -> Error {
        if error.is_invalid_location() {
            Error::invalid_location(error.to_string())
        } else {
            Error::missing_approver(error.to_string())
        }
    }

    fn map_credential_error(error: CredentialError) -> Error {
        match error {
            CredentialError::NotVerified { status } => {
                Error::not_verified(error.to_string()).with_details(json!({ "status": status }))
            }
        }
    }

    fn map_validation_error(error: ResidentValidationError) -> Error {
        Error::invalid_request(error.to_string())
    }

    fn email_taken(email: &str) -> Error {
        Error::conflict(format!("{email} already belongs to another account"))
            .with_details(json!({ "email": email, "code": "email_taken" }))
    }

    /// Fail unless `email` is free or already belongs to `owner`.
    async fn ensure_email_available(&self, email: &str, owner: &ResidentId) -> Result<(), Error> {
        let email = normalize_email(email);
        let identity = self
            .identities
            .find_by_email(&email)
            .await
            .map_err(Self::map_identity_error)?;
        if identity.is_some_and(|record| record.id != *owner) {
            return Err(Self::email_taken(&email));
        }
        let profile = self
            .profiles
            .find_by_email(&email)
            .await
            .map_err(Self::map_profile_error)?;
        if profile.is_some_and(|record| record.id != *owner) {
            return Err(Self::email_taken(&email));
        }
        Ok(())
    }

    fn revision_conflict(expected: Option<u32>, actual: u32) -> Error {
        Error::conflict("revision mismatch").with_details(json!({
            "expectedRevision": expected,
            "actualRevision": actual,
            "code": "revision_mismatch",
        }))
    }

    /// Run `apply` against a freshly loaded resident and persist the result.
    ///
    /// Unchanged residents are not written. A revision mismatch reloads and
    /// re-applies, up to the configured attempt budget.
    async fn mutate<T, F>(&self, email: &str, mut apply: F) -> Result<(Resident, T), Error>
    where
        F: FnMut(&mut Resident, DateTime<Utc>) -> Result<T, Error>,
    {
        let mut last_mismatch = None;
        for attempt in 1..=self.max_write_attempts {
            let mut resident = self.load_resident(email).await?;
            let before = resident.clone();
            let now = self.clock.utc();
            let outcome = apply(&mut resident, now)?;
            if resident == before {
                return Ok((resident, outcome));
            }

            let expected = (before.revision > 0).then_some(before.revision);
            resident.revision = before.revision.saturating_add(1);
            resident.updated_at = now;
            let record = ResidentProfileRecord::from(&resident);
            match self.profiles.save(&record, expected).await {
                Ok(()) => return Ok((resident, outcome)),
                Err(ResidentProfileRepositoryError::RevisionMismatch { expected, actual }) => {
                    debug!(
                        resident_id = %resident.id(),
                        attempt,
                        expected,
                        actual,
                        "resident changed concurrently; reloading"
                    );
                    last_mismatch = Some((expected, actual));
                }
                Err(other) => return Err(Self::map_profile_error(other)),
            }
        }
        let (expected, actual) = last_mismatch.unwrap_or_default();
        Err(Self::revision_conflict(Some(expected), actual))
    }

    /// Load the merged resident for `email`.
    pub async fn load_resident(&self, email: &str) -> Result<Resident, Error> {
        self.merger.load(email).await.map_err(Self::map_merge_error)
    }

    /// Guard inputs still missing for the resident's next step.
    pub async fn pending_requirements(&self, email: &str) -> Result<Vec<Requirement>, Error> {
        let resident = self.load_resident(email).await?;
        Ok(verification::pending_requirements(&resident))
    }

    /// Apply profile edits.
    ///
    /// A new email must not belong to any other account.
    pub async fn update_profile(
        &self,
        email: &str,
        update: ProfileUpdate,
    ) -> Result<Resident, Error> {
        if let Some(new_email) = update.email.as_deref() {
            let current = self.load_resident(email).await?;
            self.ensure_email_available(new_email, current.id()).await?;
        }
        let (resident, ()) = self
            .mutate(email, |resident, _| {
                resident
                    .apply_profile_update(update.clone())
                    .map_err(Self::map_validation_error)
            })
            .await?;
        Ok(resident)
    }

    /// Record a government ID submission awaiting review.
    pub async fn submit_government_id(
        &self,
        email: &str,
        kind: &str,
        number: &str,
    ) -> Result<Resident, Error> {
        let (resident, ()) = self
            .mutate(email, |resident, now| {
                resident
                    .submit_government_id(kind, number, now)
                    .map_err(Self::map_validation_error)
            })
            .await?;
        Ok(resident)
    }

    /// Mark a submitted government ID as checked by an official.
    pub async fn verify_government_id(&self, email: &str, kind: &str) -> Result<Resident, Error> {
        let (resident, ()) = self
            .mutate(email, |resident, _| {
                resident
                    .mark_government_id_verified(kind)
                    .map_err(Self::map_validation_error)
            })
            .await?;
        Ok(resident)
    }

    /// Pin the household location.
    pub async fn pin_location(&self, email: &str, pin: LocationPin) -> Result<Resident, Error> {
        let (resident, _signal) = self
            .mutate(email, |resident, now| {
                location::pin_location(resident, pin.clone(), now)
                    .map_err(Self::map_location_error)
            })
            .await?;
        Ok(resident)
    }

    /// Record an official's confirmation of the current pin.
    pub async fn confirm_location(&self, email: &str, official: &str) -> Result<Resident, Error> {
        let (resident, ()) = self
            .mutate(email, |resident, now| {
                location::confirm_location(resident, official, now)
                    .map_err(Self::map_location_error)
            })
            .await?;
        Ok(resident)
    }

    /// Advance the resident one step if the current guard holds.
    pub async fn evaluate(&self, email: &str) -> Result<Option<Transition>, Error> {
        let (resident, transition) = self
            .mutate(email, |resident, now| {
                verification::evaluate(resident, now).map_err(Self::map_verification_error)
            })
            .await?;
        if let Some(applied) = &transition {
            info!(
                resident_id = %resident.id(),
                from = %applied.from,
                to = %applied.to,
                "verification status advanced"
            );
        }
        Ok(transition)
    }

    /// Approve a `semi-verified` resident on behalf of `actor`.
    pub async fn approve(&self, email: &str, actor: &str) -> Result<Transition, Error> {
        let (resident, transition) = self
            .mutate(email, |resident, now| {
                verification::approve(resident, actor, now).map_err(Self::map_verification_error)
            })
            .await?;
        info!(
            resident_id = %resident.id(),
            approved_by = actor.trim(),
            "resident approved"
        );
        Ok(transition)
    }

    /// Return the resident's permanent ID, assigning it on first use.
    pub async fn permanent_id(&self, email: &str) -> Result<PermanentId, Error> {
        let (_, permanent_id) = self
            .mutate(email, |resident, _| Ok(self.issuer.permanent_id(resident)))
            .await?;
        Ok(permanent_id)
    }

    /// Issue a 24-hour session credential for a verified resident.
    pub async fn issue_session(&self, email: &str) -> Result<IssuedSession, Error> {
        let (resident, credential) = self
            .mutate(email, |resident, now| {
                self.issuer
                    .issue_session(resident, now)
                    .map_err(Self::map_credential_error)
            })
            .await?;
        info!(
            resident_id = %resident.id(),
            session_id = %credential.unique_session_id(),
            expires_at = %credential.expires_at(),
            "session credential issued"
        );
        let payload = self.issuer.to_payload(&credential, &resident);
        Ok(IssuedSession {
            credential,
            payload,
        })
    }

    /// Check a scanned payload against the resident registered under `email`.
    pub async fn validate_session(
        &self,
        email: &str,
        payload: &SessionCredentialPayload,
    ) -> Result<ValidationReport, Error> {
        let credential =
            SessionCredential::from_payload(payload).map_err(Self::map_validation_error)?;
        let resident = self.load_resident(email).await?;
        let report = credentials::validate_session(&credential, &resident, self.clock.utc());
        if !report.integrity_ok {
            warn!(
                resident_id = %credential.resident_id(),
                session_id = %credential.unique_session_id(),
                "session credential failed integrity check"
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
#[path = "resident_verification_service_tests.rs"]
mod tests;
