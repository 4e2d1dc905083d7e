//! `pwstore get` — hand one entry's password to the clipboard or stdout.

use crate::cli::output;
use crate::cli::sink::make_sink;
use crate::cli::{load_context, open_store, Cli};
use crate::errors::{PwStoreError, Result};

/// Execute the `get` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let Some(&id) = cli.ids.first() else {
        return Err(PwStoreError::InvalidArguments(
            "`get` needs exactly one -n <id>".into(),
        ));
    };

    let (settings, path) = load_context(cli)?;
    // Set up the sink first: it refuses to run over SSH.
    let mut sink = make_sink(cli.stdout, settings.clipboard_clear())?;
    let store = open_store(&settings, &path, true)?;

    let record = store.get(id)?;
    sink.deliver(&record.password)?;
    if !cli.stdout {
        output::success(&format!("Retrieved value for id {id}."));
    }
    Ok(())
}
