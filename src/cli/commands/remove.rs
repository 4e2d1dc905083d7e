//! `pwstore remove` — delete the entries given with `-n`.

use crate::cli::output;
use crate::cli::{confirm, load_context, open_store, stdin_is_terminal, Cli};
use crate::errors::{PwStoreError, Result};

/// Execute the `remove` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let (settings, path) = load_context(cli)?;
    let mut store = open_store(&settings, &path, true)?;

    // Unless --force is set, show what goes and ask first.
    if !cli.force {
        if !stdin_is_terminal() {
            return Err(PwStoreError::InvalidArguments(
                "not a terminal; pass --force to remove without confirmation".into(),
            ));
        }
        let doomed = store.lookup_with_ids("", &cli.ids)?;
        output::print_credentials_table(&doomed, "None of the given ids exist.");
        if !confirm("Remove these entries from the database?", false)? {
            output::info("Aborted. Nothing removed.");
            return Ok(());
        }
    }

    store.remove(&cli.ids)?;
    store.sync()?;

    output::success(&format!("Removed {} entries.", dedup_count(&cli.ids)));
    Ok(())
}

fn dedup_count(ids: &[usize]) -> usize {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_ids_count_once() {
        assert_eq!(dedup_count(&[2, 0, 2]), 2);
    }
}
