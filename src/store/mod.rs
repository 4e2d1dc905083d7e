//! Credential storage.
//!
//! Layers, innermost first:
//! - `Credential` and positional `CredentialId` (`record`)
//! - Sorted in-memory `RecordStore` and its plaintext format (`database`)
//! - `CipherFile` trait and the on-disk `SealedFile` (`file`)
//! - Lock/unlock lifecycle in `EncryptedStore` (`encrypted`)
//! - The `PasswordStore` facade every caller goes through (`facade`)

pub mod database;
pub mod encrypted;
pub mod facade;
pub mod file;
pub mod record;

pub use database::RecordStore;
pub use encrypted::EncryptedStore;
pub use facade::PasswordStore;
pub use file::{CipherFile, FileHeader, SealedFile};
pub use record::{Credential, CredentialId};
