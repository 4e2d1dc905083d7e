//! `pwstore dump` — list every entry with passwords masked.

use crate::cli::output;
use crate::cli::{load_context, open_store, Cli};
use crate::errors::Result;

/// Execute the `dump` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let (settings, path) = load_context(cli)?;
    let store = open_store(&settings, &path, true)?;

    let entries = store.dump()?;
    output::print_credentials_table(&entries, "The database is empty.");
    if entries.is_empty() {
        output::tip("Run `pwstore add` to add your first entry.");
    }
    Ok(())
}
