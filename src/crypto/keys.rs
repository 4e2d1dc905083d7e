//! Key derivation helpers using HKDF-SHA256.
//!
//! The Argon2id output is the master key; the key actually handed to
//! AES-256-GCM is expanded from it with a fixed context string so the
//! raw KDF output never touches the cipher directly.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::errors::{PwStoreError, Result};

/// Length of derived sub-keys (256 bits).
pub const KEY_LEN: usize = 32;

/// HKDF context for the database file encryption key.
const FILE_KEY_INFO: &[u8] = b"pwstore-file-key";

/// Internal helper: run HKDF-SHA256 expand with the given `info`.
///
/// The master key already has high entropy (it came from Argon2id), so
/// the extract step runs with HKDF's zero-filled default salt.
fn hkdf_derive(ikm: &[u8], info: &[u8]) -> Result<[u8; KEY_LEN]> {
    let hk = Hkdf::<Sha256>::new(None, ikm);

    let mut okm = [0u8; KEY_LEN];
    hk.expand(info, &mut okm)
        .map_err(|e| PwStoreError::KeyDerivationFailed(format!("HKDF expand failed: {e}")))?;

    Ok(okm)
}

/// A wrapper around a 32-byte master key that automatically zeroes
/// its memory when dropped.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct MasterKey {
    bytes: [u8; KEY_LEN],
}

impl MasterKey {
    /// Create a new `MasterKey` from raw bytes.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Derive the AES key used to seal the database file.
    pub fn derive_file_key(&self) -> Result<[u8; KEY_LEN]> {
        hkdf_derive(&self.bytes, FILE_KEY_INFO)
    }
}
