//! Domain primitives, aggregates, and services.
//!
//! Purpose: Model resident identity verification without any knowledge of
//! transport or storage. Document invariants and serialisation contracts
//! (serde) in each type's Rustdoc.
//!
//! Public surface:
//! - Error (alias to `error::Error`): transport-agnostic error payload.
//! - Resident (alias to `resident::Resident`): identity and profile
//!   aggregate.
//! - CredentialIssuer (alias to `credentials::CredentialIssuer`): permanent
//!   IDs and session credentials.
//! - ResidentVerificationService: driving service over the ports.

pub mod audit;
pub mod checksum;
pub mod credentials;
pub mod error;
pub mod location;
pub mod ports;
pub mod profile_merge;
pub mod resident;
pub mod resident_verification_service;
pub mod verification;

pub use self::audit::{AuditAction, AuditEntry, AuditError, AuditTrail};
pub use self::checksum::{checksum, checksum_matches};
pub use self::credentials::{
    CredentialError, CredentialIssuer, SESSION_TTL_HOURS, SecurityBlock, SessionCredential,
    SessionCredentialPayload, ValidationOutcome, ValidationReport, VerificationBlock,
    derive_permanent_id, format_timestamp, session_ttl, validate_session,
};
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::location::{
    GuardSignal, HouseLocation, LocationError, LocationPin, confirm_location, pin_location,
};
pub use self::profile_merge::{
    AccountRole, IdentityRecord, ProfileMergeError, ProfileMerger, ResidentProfileRecord,
    ResidentSource,
};
pub use self::resident::{
    GovernmentId, ParseVerificationStatusError, PermanentId, ProfileUpdate, Resident,
    ResidentDraft, ResidentId, ResidentValidationError, VerificationStatus, normalize_email,
};
pub use self::resident_verification_service::{IssuedSession, ResidentVerificationService};
pub use self::verification::{
    Requirement, Transition, VerificationError, approve, evaluate, pending_requirements,
};

/// Convenient service result alias.
///
/// # Examples
/// ```
/// use resident_id::domain::{Error, ServiceResult};
///
/// fn lookup() -> ServiceResult<()> {
///     Err(Error::profile_not_found("no such resident"))
/// }
/// ```
pub type ServiceResult<T> = Result<T, Error>;
