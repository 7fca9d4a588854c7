//! Resident identity verification core.
//!
//! Tracks residents from registration to official approval, issues permanent
//! IDs and 24-hour session credentials, and keeps an append-only audit trail
//! of every status change.

pub mod config;
pub mod domain;
pub mod outbound;
