//! Process-local implementation of the identity and resident profile ports.
//!
//! Both tables sit behind one mutex so a save observes every earlier save.
//! Revision checks follow the same rules a database adapter would apply.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::debug;

use crate::domain::ports::{
    IdentityDirectory, IdentityDirectoryError, ResidentProfileRepository,
    ResidentProfileRepositoryError,
};
use crate::domain::{IdentityRecord, ResidentId, ResidentProfileRecord, normalize_email};

#[derive(Debug, Default)]
struct Tables {
    identities: BTreeMap<String, IdentityRecord>,
    profiles: BTreeMap<ResidentId, ResidentProfileRecord>,
}

/// In-memory identity directory and resident profile repository.
#[derive(Debug, Default)]
pub struct InMemoryResidentStore {
    tables: Mutex<Tables>,
}

const POISONED: &str = "resident store lock poisoned";

impl InMemoryResidentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Option<MutexGuard<'_, Tables>> {
        match self.tables.lock() {
            Ok(guard) => Some(guard),
            Err(_) => {
                debug!("{POISONED}");
                None
            }
        }
    }

    /// Register an account in the identity table, replacing any account with
    /// the same email.
    pub fn insert_identity(&self, record: IdentityRecord) -> Result<(), IdentityDirectoryError> {
        let mut tables = self
            .lock()
            .ok_or_else(|| IdentityDirectoryError::query(POISONED))?;
        tables
            .identities
            .insert(normalize_email(&record.email), record);
        Ok(())
    }

    /// Number of stored profile rows.
    pub fn profile_count(&self) -> usize {
        self.lock().map_or(0, |tables| tables.profiles.len())
    }
}

#[async_trait]
impl IdentityDirectory for InMemoryResidentStore {
    async fn find_by_email(
        &self,
        email: &str,
    ) -> Result<Option<IdentityRecord>, IdentityDirectoryError> {
        let tables = self
            .lock()
            .ok_or_else(|| IdentityDirectoryError::query(POISONED))?;
        Ok(tables.identities.get(&normalize_email(email)).cloned())
    }
}

#[async_trait]
impl ResidentProfileRepository for InMemoryResidentStore {
    async fn find_by_email(
        &self,
        email: &str,
    ) -> Result<Option<ResidentProfileRecord>, ResidentProfileRepositoryError> {
        let email = normalize_email(email);
        let tables = self
            .lock()
            .ok_or_else(|| ResidentProfileRepositoryError::query(POISONED))?;
        Ok(tables
            .profiles
            .values()
            .find(|record| normalize_email(&record.email) == email)
            .cloned())
    }

    async fn save(
        &self,
        record: &ResidentProfileRecord,
        expected_revision: Option<u32>,
    ) -> Result<(), ResidentProfileRepositoryError> {
        let mut tables = self
            .lock()
            .ok_or_else(|| ResidentProfileRepositoryError::query(POISONED))?;

        let email = normalize_email(&record.email);
        let owned_by_other_identity = tables
            .identities
            .get(&email)
            .is_some_and(|identity| identity.id != record.id);
        let email_taken = owned_by_other_identity
            || tables
                .profiles
                .values()
                .any(|other| other.id != record.id && normalize_email(&other.email) == email);
        if email_taken {
            debug!(resident_id = %record.id, "email already belongs to another account");
            return Err(ResidentProfileRepositoryError::query(format!(
                "email {email} already belongs to another account"
            )));
        }

        let stored = tables.profiles.get(&record.id).map(|existing| existing.revision);
        match (stored, expected_revision) {
            (None, None) => {}
            (Some(actual), Some(expected)) if actual == expected => {}
            (stored, expected) => {
                let actual = stored.unwrap_or(0);
                let expected = expected.unwrap_or(0);
                debug!(
                    resident_id = %record.id,
                    expected,
                    actual,
                    "profile revision mismatch"
                );
                return Err(ResidentProfileRepositoryError::revision_mismatch(
                    expected, actual,
                ));
            }
        }

        tables.profiles.insert(record.id.clone(), record.clone());
        Ok(())
    }
}
