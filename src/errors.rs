use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in pwstore.
#[derive(Debug, Error)]
pub enum PwStoreError {
    // --- Store errors ---
    #[error("Wrong password or tampered database file")]
    WrongPassword,

    #[error("Corrupt database: line {line} has {fields} field(s), expected 4")]
    CorruptFormat { line: usize, fields: usize },

    #[error("No entry with id {0} (ids change after every add or remove)")]
    InvalidId(usize),

    #[error("Nothing to do: {0}")]
    EmptyOperation(String),

    #[error("Database already exists at {0}")]
    DestinationExists(PathBuf),

    #[error("Database is not usable: {0}")]
    NotUsable(String),

    #[error("Database is locked")]
    Locked,

    #[error("Invalid field: {0}")]
    InvalidField(String),

    // --- File / crypto errors ---
    #[error("Database not found at {0}")]
    DatabaseNotFound(PathBuf),

    #[error("Invalid database file format: {0}")]
    InvalidFileFormat(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- CLI errors ---
    #[error("Clipboard error: {0}")]
    ClipboardError(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("User cancelled operation")]
    UserCancelled,
}

impl PwStoreError {
    /// Whether re-prompting for the passphrase can fix this error.
    pub fn is_wrong_password(&self) -> bool {
        matches!(self, Self::WrongPassword)
    }
}

/// Convenience type alias for pwstore results.
pub type Result<T> = std::result::Result<T, PwStoreError>;
