//! Port for resident profile persistence.
//!
//! The [`ResidentProfileRepository`] trait defines the contract for storing
//! and retrieving resident profile rows. Writes carry an expected revision so
//! concurrent read-check-write cycles on the same resident cannot both land.

use async_trait::async_trait;

use crate::domain::ResidentProfileRecord;

use super::define_port_error;

define_port_error! {
    /// Errors raised by resident profile repository adapters.
    pub enum ResidentProfileRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "resident profile repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "resident profile repository query failed: {message}",
        /// Optimistic concurrency check failed.
        RevisionMismatch { expected: u32, actual: u32 } =>
            "revision mismatch: expected {expected}, found {actual}",
    }
}

/// Port for resident profile storage and retrieval.
///
/// # Revision Semantics
///
/// - New profiles are saved at revision 1.
/// - Each successful update increments the revision.
/// - Updates that specify `expected_revision` fail with
///   [`ResidentProfileRepositoryError::RevisionMismatch`] if the stored
///   revision differs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResidentProfileRepository: Send + Sync {
    /// Fetch the profile row for a normalised (trimmed, lowercase) email.
    async fn find_by_email(
        &self,
        email: &str,
    ) -> Result<Option<ResidentProfileRecord>, ResidentProfileRepositoryError>;

    /// Save a profile row with an optimistic concurrency check.
    ///
    /// # Revision Check
    ///
    /// - `expected_revision == None` inserts a new row; an existing row for
    ///   the same email is reported as a mismatch against its revision.
    /// - `expected_revision == Some(n)` only succeeds while the stored
    ///   revision is `n`.
    ///
    /// The caller sets `record.revision` to the new value before calling.
    async fn save(
        &self,
        record: &ResidentProfileRecord,
        expected_revision: Option<u32>,
    ) -> Result<(), ResidentProfileRepositoryError>;
}

/// Fixture implementation for testing without a real store.
///
/// Lookups return `None` and saves are discarded.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureResidentProfileRepository;

#[async_trait]
impl ResidentProfileRepository for FixtureResidentProfileRepository {
    async fn find_by_email(
        &self,
        _email: &str,
    ) -> Result<Option<ResidentProfileRecord>, ResidentProfileRepositoryError> {
        Ok(None)
    }

    async fn save(
        &self,
        _record: &ResidentProfileRecord,
        _expected_revision: Option<u32>,
    ) -> Result<(), ResidentProfileRepositoryError> {
        Ok(())
    }
}
