//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! Adapters are thin translators between domain types and a concrete store.
//! They contain no business logic.
//!
//! - **memory**: process-local identity and profile tables, used by tests
//!   and single-process embedders.

pub mod memory;
