//! `pwstore gen_passwd` — generate a random password, store it, and hand it out.

use dialoguer::Input;

use crate::cli::output;
use crate::cli::sink::make_sink;
use crate::cli::{load_context, open_store, Cli};
use crate::errors::{PwStoreError, Result};

/// Execute the `gen_passwd` command.
pub fn execute(
    cli: &Cli,
    url: Option<&str>,
    username: Option<&str>,
    no_store: bool,
) -> Result<()> {
    let (settings, path) = load_context(cli)?;
    let mut sink = make_sink(cli.stdout, settings.clipboard_clear())?;

    let (url, username) = match (url, username) {
        (None, None) if !no_store => (prompt("Url")?, prompt("User")?),
        (url, username) => (
            url.unwrap_or_default().to_owned(),
            username.unwrap_or_default().to_owned(),
        ),
    };

    let mut store = open_store(&settings, &path, false)?;
    let password = store.gen_password(&username, &url, !no_store, None)?;

    if !no_store {
        store.sync()?;
        output::success(&format!("Generated and stored password for (\"{url}\", \"{username}\")."));
    }
    sink.deliver(&password)?;
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    Input::<String>::new()
        .with_prompt(label)
        .allow_empty(true)
        .interact_text()
        .map_err(|e| PwStoreError::CommandFailed(format!("prompt: {e}")))
}
