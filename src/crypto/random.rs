//! Random password generation.
//!
//! Symbols are drawn uniformly from an alphabet using the thread-local
//! CSPRNG (ChaCha, seeded from the operating system).

use rand::Rng;
use zeroize::Zeroizing;

use crate::errors::{PwStoreError, Result};

/// Length of generated passwords.
pub const DEFAULT_PASSWORD_LEN: usize = 12;

/// Every printable ASCII character, space included.
pub fn printable_ascii() -> Vec<u8> {
    (0x20u8..=0x7e).collect()
}

/// Draw `count` symbols from `alphabet`.
///
/// Duplicate symbols in `alphabet` are collapsed first so that every
/// distinct symbol is equally likely. Tab and newline are refused since
/// they cannot be stored in a record field.
pub fn draw(count: usize, alphabet: &[u8]) -> Result<Zeroizing<String>> {
    let mut symbols: Vec<u8> = alphabet.to_vec();
    symbols.sort_unstable();
    symbols.dedup();

    if symbols.is_empty() {
        return Err(PwStoreError::EmptyOperation(
            "password alphabet is empty".into(),
        ));
    }
    if symbols.iter().any(|b| !b.is_ascii() || *b == b'\t' || *b == b'\n') {
        return Err(PwStoreError::InvalidField(
            "password alphabet must be ASCII without tab or newline".into(),
        ));
    }

    let mut rng = rand::rng();
    let mut password = Zeroizing::new(String::with_capacity(count));
    for _ in 0..count {
        let index = rng.random_range(0..symbols.len());
        password.push(char::from(symbols[index]));
    }
    Ok(password)
}
