//! Cryptographic primitives for pwstore.
//!
//! This module provides:
//! - AES-256-GCM encryption and decryption (`encryption`)
//! - Argon2id password-based key derivation (`kdf`)
//! - HKDF-based file key derivation (`keys`)
//! - Random password generation (`random`)

pub mod encryption;
pub mod kdf;
pub mod keys;
pub mod random;

pub use encryption::{decrypt, encrypt};
pub use kdf::{derive_master_key, generate_salt, Argon2Params};
pub use keys::MasterKey;
pub use random::{draw, printable_ascii, DEFAULT_PASSWORD_LEN};
