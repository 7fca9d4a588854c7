//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Each trait exposes strongly typed errors so adapters map their failures
//! into predictable variants.

mod macros;
pub(crate) use macros::define_port_error;

mod identity_directory;
mod resident_profile_repository;

#[cfg(test)]
pub use identity_directory::MockIdentityDirectory;
pub use identity_directory::{FixtureIdentityDirectory, IdentityDirectory, IdentityDirectoryError};
#[cfg(test)]
pub use resident_profile_repository::MockResidentProfileRepository;
pub use resident_profile_repository::{
    FixtureResidentProfileRepository, ResidentProfileRepository, ResidentProfileRepositoryError,
};
