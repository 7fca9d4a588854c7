//! Read-side port for the identity/auth table.
use async_trait::async_trait;

use crate::domain::IdentityRecord;

use super::define_port_error;

define_port_error! {
    /// Errors raised by identity directory adapters.
    pub enum IdentityDirectoryError {
        /// Directory connection could not be established.
        Connection { message: String } =>
            "identity directory connection failed: {message}",
        /// Lookup failed during execution or row conversion.
        Query { message: String } =>
            "identity directory query failed: {message}",
    }
}

/// Port for looking up account identities.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    /// Fetch the identity record for a normalised (trimmed, lowercase) email.
    ///
    /// Returns `None` when no account uses the address.
    async fn find_by_email(
        &self,
        email: &str,
    ) -> Result<Option<IdentityRecord>, IdentityDirectoryError>;
}

/// Fixture implementation for tests that do not exercise identity lookups.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureIdentityDirectory;

#[async_trait]
impl IdentityDirectory for FixtureIdentityDirectory {
    async fn find_by_email(
        &self,
        _email: &str,
    ) -> Result<Option<IdentityRecord>, IdentityDirectoryError> {
        Ok(None)
    }
}
