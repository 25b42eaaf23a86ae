//! Concrete ledger storage with encryption at rest.
//! Uses AES-256-GCM with a key kept in a local key file (or test doubles).

pub mod key_provider;
pub mod ledger_file;
