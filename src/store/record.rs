//! Credential records and their positional ids.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::errors::{PwStoreError, Result};

/// Position of a record inside a `RecordStore`.
///
/// Ids are plain indices into the store's sorted sequence. An id is only
/// valid until the next insert or remove on the same store; never keep
/// one across a mutation.
pub type CredentialId = usize;

/// One (url, username, password) triple.
///
/// The derived ordering compares url, then username, then password, each
/// as raw bytes. This is the total order the record store is sorted by
/// and the order merges compare with. Every field is zeroed on drop.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Zeroize, ZeroizeOnDrop)]
pub struct Credential {
    pub url: String,
    pub username: String,
    pub password: String,
}

impl Credential {
    pub fn new(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Check that no field contains the tab or newline delimiters of
    /// the serialized format.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("url", &self.url),
            ("username", &self.username),
            ("password", &self.password),
        ] {
            if value.contains(|c| c == '\t' || c == '\n') {
                return Err(PwStoreError::InvalidField(format!(
                    "{name} must not contain tab or newline characters"
                )));
            }
        }
        Ok(())
    }

    /// True if `key` is a substring of the url or the username.
    pub fn matches(&self, key: &str) -> bool {
        self.url.contains(key) || self.username.contains(key)
    }
}

/// Shows url and username; the password is always masked.
impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(\"{}\", \"{}\", \"***\")", self.url, self.username)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}
