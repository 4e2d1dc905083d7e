//! `pwstore change_passwd` — re-encrypt the database under a new password.

use crate::cli::output;
use crate::cli::{load_context, open_store, prompt_new_password, Cli};
use crate::errors::Result;

/// Execute the `change_passwd` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let (settings, path) = load_context(cli)?;
    let mut store = open_store(&settings, &path, true)?;

    let new_password = prompt_new_password()?;
    store.change_password(&new_password)?;
    store.sync()?;

    output::success("Database password changed.");
    Ok(())
}
