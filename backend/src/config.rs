//! Credential configuration loaded via OrthoConfig.

use ortho_config::OrthoConfig;
use serde::Deserialize;

const DEFAULT_PERMANENT_ID_PREFIX: &str = "BRG";
const DEFAULT_PAYLOAD_VERSION: &str = "1.0";
const DEFAULT_MAX_WRITE_ATTEMPTS: u8 = 3;
const MAX_WRITE_ATTEMPTS_CEILING: u8 = 10;

/// Settings for permanent IDs, session payloads, and write retries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "RESIDENT_ID")]
pub struct CredentialSettings {
    /// Prefix for permanent resident IDs.
    pub permanent_id_prefix: Option<String>,
    /// Version label written into session payloads.
    pub payload_version: Option<String>,
    /// Attempts per write before a revision conflict is reported.
    pub max_write_attempts: Option<u8>,
}

impl CredentialSettings {
    /// Return the configured prefix, falling back to `BRG`.
    pub fn permanent_id_prefix(&self) -> &str {
        self.permanent_id_prefix
            .as_deref()
            .map(str::trim)
            .filter(|prefix| !prefix.is_empty())
            .unwrap_or(DEFAULT_PERMANENT_ID_PREFIX)
    }

    /// Return the configured payload version, falling back to `1.0`.
    pub fn payload_version(&self) -> &str {
        self.payload_version
            .as_deref()
            .unwrap_or(DEFAULT_PAYLOAD_VERSION)
    }

    /// Return the write attempt budget, clamped to `1..=10`.
    pub fn max_write_attempts(&self) -> u8 {
        self.max_write_attempts
            .unwrap_or(DEFAULT_MAX_WRITE_ATTEMPTS)
            .clamp(1, MAX_WRITE_ATTEMPTS_CEILING)
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for credential configuration parsing.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    fn load_from_empty_args() -> CredentialSettings {
        CredentialSettings::load_from_iter([OsString::from("resident-id")])
            .expect("config should load")
    }

    #[rstest]
    fn default_values_are_used_when_missing() {
        let _guard = lock_env([
            ("RESIDENT_ID_PERMANENT_ID_PREFIX", None::<String>),
            ("RESIDENT_ID_PAYLOAD_VERSION", None::<String>),
            ("RESIDENT_ID_MAX_WRITE_ATTEMPTS", None::<String>),
        ]);

        let settings = load_from_empty_args();
        assert_eq!(settings.permanent_id_prefix(), DEFAULT_PERMANENT_ID_PREFIX);
        assert_eq!(settings.payload_version(), DEFAULT_PAYLOAD_VERSION);
        assert_eq!(settings.max_write_attempts(), DEFAULT_MAX_WRITE_ATTEMPTS);
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env([
            ("RESIDENT_ID_PERMANENT_ID_PREFIX", Some("MNL".to_owned())),
            ("RESIDENT_ID_PAYLOAD_VERSION", Some("2.1".to_owned())),
            ("RESIDENT_ID_MAX_WRITE_ATTEMPTS", Some("5".to_owned())),
        ]);

        let settings = load_from_empty_args();
        assert_eq!(settings.permanent_id_prefix(), "MNL");
        assert_eq!(settings.payload_version(), "2.1");
        assert_eq!(settings.max_write_attempts(), 5);
    }

    #[rstest]
    #[case(Some(0), 1)]
    #[case(Some(50), MAX_WRITE_ATTEMPTS_CEILING)]
    #[case(None, DEFAULT_MAX_WRITE_ATTEMPTS)]
    fn write_attempts_are_clamped(#[case] configured: Option<u8>, #[case] expected: u8) {
        let settings = CredentialSettings {
            max_write_attempts: configured,
            ..CredentialSettings::default()
        };
        assert_eq!(settings.max_write_attempts(), expected);
    }

    #[rstest]
    fn blank_prefix_falls_back_to_default() {
        let settings = CredentialSettings {
            permanent_id_prefix: Some("   ".to_owned()),
            ..CredentialSettings::default()
        };
        assert_eq!(settings.permanent_id_prefix(), DEFAULT_PERMANENT_ID_PREFIX);
    }
}
