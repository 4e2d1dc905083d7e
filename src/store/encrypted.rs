//! Passphrase-holding wrapper around a `RecordStore`.
//!
//! An `EncryptedStore` is either unlocked (it holds the passphrase and a
//! decrypted record store) or locked (it holds neither). Construction
//! only succeeds into the unlocked state.

use chrono::{DateTime, Utc};
use zeroize::{Zeroize, Zeroizing};

use super::database::RecordStore;
use super::file::{CipherFile, SealedFile};
use crate::errors::{PwStoreError, Result};

pub struct EncryptedStore<F: CipherFile = SealedFile> {
    file: F,

    /// Zeroed on lock, on replacement and on drop.
    password: Zeroizing<String>,

    /// Present exactly while unlocked.
    records: Option<RecordStore>,
}

impl<F: CipherFile> EncryptedStore<F> {
    /// Decrypt `file` with `password` and parse its records.
    ///
    /// A file that does not exist yet opens as an empty store.
    pub fn open(mut file: F, password: &str) -> Result<Self> {
        let records = load(&mut file, password)?;
        Ok(Self {
            file,
            password: Zeroizing::new(password.to_owned()),
            records: Some(records),
        })
    }

    /// Serialize the records and write them with the current passphrase.
    pub fn sync(&mut self) -> Result<()> {
        let records = self.records.as_mut().ok_or(PwStoreError::Locked)?;
        let plaintext = records.serialize();
        self.file.write(self.password.as_bytes(), plaintext.as_bytes())?;
        tracing::info!(records = records.len(), "database synchronized");
        Ok(())
    }

    /// Replace the passphrase used by the next `sync`.
    pub fn change_password(&mut self, new_password: &str) {
        self.password = Zeroizing::new(new_password.to_owned());
    }

    /// Zero the passphrase and every record, and drop cached file data.
    ///
    /// Unsynced changes are discarded. Locking a locked store is a no-op.
    pub fn lock(&mut self) {
        self.password.zeroize();
        if let Some(mut records) = self.records.take() {
            records.clear();
            tracing::info!("database locked");
        }
        self.file.clear_buffers();
    }

    /// Re-open the file with `password`.
    ///
    /// On failure the store keeps whatever state it had before, so a bad
    /// attempt never discards a good passphrase.
    pub fn unlock(&mut self, password: &str) -> Result<()> {
        match load(&mut self.file, password) {
            Ok(records) => {
                self.records = Some(records);
                self.password = Zeroizing::new(password.to_owned());
                tracing::info!("database unlocked");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "unlock failed");
                Err(e)
            }
        }
    }

    pub fn records(&self) -> Result<&RecordStore> {
        self.records.as_ref().ok_or(PwStoreError::Locked)
    }

    pub fn records_mut(&mut self) -> Result<&mut RecordStore> {
        self.records.as_mut().ok_or(PwStoreError::Locked)
    }

    pub fn is_dirty(&self) -> bool {
        self.records.as_ref().is_some_and(RecordStore::is_dirty)
    }

    pub fn is_locked(&self) -> bool {
        self.records.is_none()
    }

    /// True if locked or if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.as_ref().map_or(true, RecordStore::is_empty)
    }

    pub fn time_of_last_write(&self) -> Option<DateTime<Utc>> {
        self.file.time_of_last_write()
    }

    pub fn file(&self) -> &F {
        &self.file
    }
}

fn load<F: CipherFile>(file: &mut F, password: &str) -> Result<RecordStore> {
    let plaintext = file.read(password.as_bytes())?;
    let text = std::str::from_utf8(&plaintext).map_err(|_| {
        PwStoreError::InvalidFileFormat("decrypted database is not valid UTF-8".into())
    })?;
    RecordStore::from_buffer(text)
}
