//! Encrypted database file.
//!
//! The record store never sees ciphertext. It talks to a `CipherFile`,
//! which turns a passphrase into plaintext bytes and back. `SealedFile`
//! is the on-disk implementation:
//!
//! ```text
//! [PWST: 4 bytes][version: 1 byte][header_len: 4 bytes LE][header JSON][nonce | ciphertext + tag]
//! ```
//!
//! - **Magic** (`PWST`): identifies the file as a pwstore database.
//! - **Version**: format version (currently `1`).
//! - **Header length**: little-endian u32 telling us where the header
//!   JSON ends and the sealed body begins.
//! - **Header JSON**: serialized `FileHeader` (salt, KDF params, dates).
//! - **Body**: AES-256-GCM output with the header bytes as associated
//!   data, so a modified header fails authentication like a wrong key.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::encryption::{decrypt, encrypt, NONCE_LEN};
use crate::crypto::kdf::{derive_master_key, generate_salt, Argon2Params};
use crate::crypto::keys::MasterKey;
use crate::errors::{PwStoreError, Result};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic bytes at the start of every database file.
const MAGIC: &[u8; 4] = b"PWST";

/// Current binary format version.
pub const CURRENT_VERSION: u8 = 1;

/// Fixed-size prefix: 4 (magic) + 1 (version) + 4 (header_len).
const PREFIX_LEN: usize = 9;

/// Size of the AES-GCM authentication tag.
const TAG_LEN: usize = 16;

// ---------------------------------------------------------------------------
// CipherFile
// ---------------------------------------------------------------------------

/// Source and sink of the encrypted database bytes.
///
/// Implementations own every cryptographic detail; callers only hand
/// over a passphrase and plaintext.
pub trait CipherFile {
    /// Decrypt the file with `password`.
    ///
    /// A file that does not exist yet reads as empty plaintext.
    fn read(&mut self, password: &[u8]) -> Result<Zeroizing<Vec<u8>>>;

    /// Encrypt `plaintext` with `password` and replace the file.
    ///
    /// Either the whole file is replaced or the previous one is left
    /// untouched.
    fn write(&mut self, password: &[u8], plaintext: &[u8]) -> Result<()>;

    /// When the file was last written, if known.
    fn time_of_last_write(&self) -> Option<DateTime<Utc>>;

    /// Zero any cached file contents.
    fn clear_buffers(&mut self);
}

// ---------------------------------------------------------------------------
// FileHeader
// ---------------------------------------------------------------------------

/// Metadata stored in clear at the beginning of a database file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileHeader {
    /// Format version.
    pub version: u8,

    /// The salt used for Argon2id key derivation (base64 in JSON).
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub salt: Vec<u8>,

    /// Argon2 params used to derive the key for this file.
    pub argon2_params: Argon2Params,

    /// When this database was first written.
    pub created_at: DateTime<Utc>,

    /// When this database was last written.
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// SealedFile
// ---------------------------------------------------------------------------

/// A database file on disk, encrypted with Argon2id + AES-256-GCM.
pub struct SealedFile {
    /// Path to the database file.
    path: PathBuf,

    /// KDF params for a file that does not exist yet.
    params: Argon2Params,

    /// Header of the last file read or written.
    header: Option<FileHeader>,

    /// Raw file bytes from the last read or write.
    cached: Zeroizing<Vec<u8>>,
}

impl SealedFile {
    pub fn new(path: impl Into<PathBuf>, params: Argon2Params) -> Self {
        Self {
            path: path.into(),
            params,
            header: None,
            cached: Zeroizing::new(Vec::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Header of the last file read or written.
    pub fn header(&self) -> Option<&FileHeader> {
        self.header.as_ref()
    }

    fn file_key(password: &[u8], header: &FileHeader) -> Result<[u8; 32]> {
        let mut master_bytes = derive_master_key(password, &header.salt, &header.argon2_params)?;
        let master_key = MasterKey::new(master_bytes);
        master_bytes.zeroize();
        master_key.derive_file_key()
    }

    /// Write `data` next to the target and rename it into place.
    ///
    /// The temp file is in the same directory so the rename is atomic on
    /// the same filesystem.
    fn replace_atomically(&self, data: &[u8]) -> Result<()> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let tmp_path = parent.join(format!(
            ".{}.tmp",
            self.path.file_name().unwrap_or_default().to_string_lossy()
        ));

        #[cfg(unix)]
        let mut file = {
            use std::os::unix::fs::OpenOptionsExt;
            fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&tmp_path)?
        };

        #[cfg(not(unix))]
        let mut file = fs::File::create(&tmp_path)?;

        let written = file.write_all(data).and_then(|()| file.sync_all());
        drop(file);
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        Ok(())
    }
}

impl CipherFile for SealedFile {
    fn read(&mut self, password: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        if self.cached.is_empty() {
            if !self.path.exists() {
                tracing::debug!(path = %self.path.display(), "database file does not exist yet");
                self.header = None;
                return Ok(Zeroizing::new(Vec::new()));
            }
            self.cached = Zeroizing::new(fs::read(&self.path)?);
        }

        let (header, header_bytes, body) = split_envelope(&self.cached)?;

        let mut file_key = Self::file_key(password, &header)?;
        let plaintext = decrypt(&file_key, body, header_bytes);
        file_key.zeroize();
        let plaintext = plaintext?;

        self.header = Some(header);
        Ok(Zeroizing::new(plaintext))
    }

    fn write(&mut self, password: &[u8], plaintext: &[u8]) -> Result<()> {
        let now = Utc::now();
        let header = match &self.header {
            Some(existing) => FileHeader {
                updated_at: now,
                ..existing.clone()
            },
            None => FileHeader {
                version: CURRENT_VERSION,
                salt: generate_salt().to_vec(),
                argon2_params: self.params,
                created_at: now,
                updated_at: now,
            },
        };

        let header_bytes = serde_json::to_vec(&header)
            .map_err(|e| PwStoreError::SerializationError(format!("header: {e}")))?;
        let header_len = u32::try_from(header_bytes.len()).map_err(|_| {
            PwStoreError::SerializationError(format!(
                "header length {} exceeds u32::MAX",
                header_bytes.len()
            ))
        })?;

        let mut file_key = Self::file_key(password, &header)?;
        let body = encrypt(&file_key, plaintext, &header_bytes);
        file_key.zeroize();
        let body = body?;

        let mut buf = Vec::with_capacity(PREFIX_LEN + header_bytes.len() + body.len());
        buf.extend_from_slice(MAGIC); // 4 bytes
        buf.push(CURRENT_VERSION); // 1 byte
        buf.extend_from_slice(&header_len.to_le_bytes()); // 4 bytes LE
        buf.extend_from_slice(&header_bytes); // header JSON
        buf.extend_from_slice(&body); // nonce + ciphertext + tag

        self.replace_atomically(&buf)?;
        tracing::info!(
            path = %self.path.display(),
            bytes = buf.len(),
            "database file written"
        );

        self.cached = Zeroizing::new(buf);
        self.header = Some(header);
        Ok(())
    }

    fn time_of_last_write(&self) -> Option<DateTime<Utc>> {
        self.header.as_ref().map(|h| h.updated_at)
    }

    fn clear_buffers(&mut self) {
        self.cached.zeroize();
    }
}

/// Split raw file bytes into the parsed header, the raw header bytes and
/// the sealed body.
fn split_envelope(data: &[u8]) -> Result<(FileHeader, &[u8], &[u8])> {
    if data.len() < PREFIX_LEN + NONCE_LEN + TAG_LEN {
        return Err(PwStoreError::InvalidFileFormat(
            "file too small to be a pwstore database".into(),
        ));
    }

    if &data[0..4] != MAGIC {
        return Err(PwStoreError::InvalidFileFormat(
            "missing PWST magic bytes".into(),
        ));
    }

    let version = data[4];
    if version != CURRENT_VERSION {
        return Err(PwStoreError::InvalidFileFormat(format!(
            "unsupported version {version}, expected {CURRENT_VERSION}"
        )));
    }

    let header_len_u32 = u32::from_le_bytes(
        data[5..9]
            .try_into()
            .map_err(|_| PwStoreError::InvalidFileFormat("bad header length".into()))?,
    );
    let header_len = usize::try_from(header_len_u32).map_err(|_| {
        PwStoreError::InvalidFileFormat(format!(
            "header length {header_len_u32} exceeds platform address space"
        ))
    })?;

    let header_end = PREFIX_LEN + header_len;
    if header_end + NONCE_LEN + TAG_LEN > data.len() {
        return Err(PwStoreError::InvalidFileFormat(
            "header length exceeds file size".into(),
        ));
    }

    let header_bytes = &data[PREFIX_LEN..header_end];
    let header: FileHeader = serde_json::from_slice(header_bytes)
        .map_err(|e| PwStoreError::InvalidFileFormat(format!("header JSON: {e}")))?;

    Ok((header, header_bytes, &data[header_end..]))
}

// ---------------------------------------------------------------------------
// Serde helpers for base64-encoded Vec<u8> fields
// ---------------------------------------------------------------------------

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&BASE64.encode(data))
}

fn base64_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    BASE64.decode(&s).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sealed(dir: &TempDir) -> SealedFile {
        SealedFile::new(dir.path().join("db.crypt"), Argon2Params::minimum())
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let mut file = sealed(&dir);
        assert!(file.read(b"pw").unwrap().is_empty());
        assert!(file.time_of_last_write().is_none());
        assert!(!file.exists());
    }

    #[test]
    fn write_then_read_in_fresh_handle() {
        let dir = TempDir::new().unwrap();
        let mut file = sealed(&dir);
        file.write(b"pw", b"a\tb\tc\t\n").unwrap();
        assert!(file.time_of_last_write().is_some());

        let mut reopened = sealed(&dir);
        assert_eq!(reopened.read(b"pw").unwrap().as_slice(), b"a\tb\tc\t\n");
        assert_eq!(
            reopened.time_of_last_write(),
            file.time_of_last_write()
        );
    }

    #[test]
    fn wrong_password_is_reported() {
        let dir = TempDir::new().unwrap();
        let mut file = sealed(&dir);
        file.write(b"pw", b"data").unwrap();

        let mut reopened = sealed(&dir);
        assert!(matches!(
            reopened.read(b"wrong"),
            Err(PwStoreError::WrongPassword)
        ));
    }

    #[test]
    fn rewrite_preserves_created_at_and_salt() {
        let dir = TempDir::new().unwrap();
        let mut file = sealed(&dir);
        file.write(b"pw", b"one").unwrap();
        let first = file.header().unwrap().clone();

        file.write(b"pw", b"two").unwrap();
        let second = file.header().unwrap();
        assert_eq!(first.created_at, second.created_at);
        assert_eq!(first.salt, second.salt);
        assert!(second.updated_at >= first.updated_at);
    }

    #[test]
    fn rewrite_with_new_password() {
        let dir = TempDir::new().unwrap();
        let mut file = sealed(&dir);
        file.write(b"old", b"data").unwrap();
        file.write(b"new", b"data").unwrap();

        let mut reopened = sealed(&dir);
        assert!(reopened.read(b"old").is_err());
        assert_eq!(reopened.read(b"new").unwrap().as_slice(), b"data");
    }

    #[test]
    fn tampered_header_fails_authentication() {
        let dir = TempDir::new().unwrap();
        let mut file = sealed(&dir);
        file.write(b"pw", b"data").unwrap();

        let path = dir.path().join("db.crypt");
        let raw = fs::read(&path).unwrap();
        let year = Utc::now().format("%Y").to_string();
        let pos = raw
            .windows(year.len())
            .position(|w| w == year.as_bytes())
            .unwrap();
        let mut tampered = raw.clone();
        tampered[pos] = if tampered[pos] == b'1' { b'2' } else { b'1' };
        fs::write(&path, &tampered).unwrap();

        let mut reopened = sealed(&dir);
        assert!(reopened.read(b"pw").is_err());
    }

    #[test]
    fn garbage_file_is_invalid_format() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("db.crypt"), b"definitely not a database file").unwrap();
        let mut file = sealed(&dir);
        assert!(matches!(
            file.read(b"pw"),
            Err(PwStoreError::InvalidFileFormat(_))
        ));
    }

    #[test]
    fn no_temp_file_left_behind() {
        let dir = TempDir::new().unwrap();
        let mut file = sealed(&dir);
        file.write(b"pw", b"data").unwrap();
        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["db.crypt".to_string()]);
    }

    #[test]
    fn clear_buffers_forces_reread_from_disk() {
        let dir = TempDir::new().unwrap();
        let mut file = sealed(&dir);
        file.write(b"pw", b"data").unwrap();
        file.clear_buffers();
        assert_eq!(file.read(b"pw").unwrap().as_slice(), b"data");
    }
}
