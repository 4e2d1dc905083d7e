//! `pwstore init` — create a new database, optionally with demo entries.

use crate::cli::output;
use crate::cli::{load_context, prompt_new_password, Cli};
use crate::errors::{PwStoreError, Result};
use crate::store::{Credential, PasswordStore, SealedFile};

/// Demo entries for `init --sample`.
pub const SAMPLE: [(&str, &str, &str); 6] = [
    ("ebay.de", "ebay_user1", "password1"),
    ("ebay", "ebay_user2", "password2"),
    ("amazon.de", "amazon_user", "password3"),
    ("mail.google.de", "gm_user1", "pw4"),
    ("mail.google.de", "gm_user2", "pw5"),
    ("mail.google.de", "gm_user3", "pw6"),
];

/// Execute the `init` command.
pub fn execute(cli: &Cli, sample: bool) -> Result<()> {
    let (settings, path) = load_context(cli)?;

    if path.exists() {
        output::tip("Use `pwstore add` to add entries to the existing database.");
        return Err(PwStoreError::DestinationExists(path));
    }

    let password = prompt_new_password()?;
    let file = SealedFile::new(&path, settings.argon2_params());
    let mut store = PasswordStore::open(file, &password)?;

    if sample {
        for (url, username, pw) in SAMPLE {
            store.add(Credential::new(url, username, pw))?;
        }
    }
    store.sync()?;

    output::success(&format!(
        "Database created at {} with {} entries",
        path.display(),
        store.len()
    ));
    output::tip("Run `pwstore add` to add an entry.");
    output::tip("Run `pwstore lookup -i` to search interactively.");
    Ok(())
}
