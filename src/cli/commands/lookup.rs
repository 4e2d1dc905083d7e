//! `pwstore lookup` — search entries, or run the interactive lookup console.

use std::path::Path;

use crate::cli::output;
use crate::cli::sink::make_sink;
use crate::cli::{load_context, open_store, prompt_password, stdin_is_terminal, Cli};
use crate::config::Settings;
use crate::console::terminal::{AlternateScreen, TerminalKeys};
use crate::console::{self, signal, ConsoleOptions};
use crate::errors::{PwStoreError, Result};

/// Execute the `lookup` command.
pub fn execute(cli: &Cli, key: Option<&str>) -> Result<()> {
    let (settings, path) = load_context(cli)?;

    if cli.interactive {
        return interactive(cli, &settings, &path);
    }

    let store = open_store(&settings, &path, true)?;
    let matches = store.lookup_with_ids(key.unwrap_or(""), &cli.ids)?;
    output::print_credentials_table(&matches, "No matching entries.");
    Ok(())
}

fn interactive(cli: &Cli, settings: &Settings, path: &Path) -> Result<()> {
    if !stdin_is_terminal() {
        return Err(PwStoreError::InvalidArguments(
            "-i needs an interactive terminal".into(),
        ));
    }

    let mut sink = make_sink(cli.stdout, settings.clipboard_clear())?;
    let mut store = open_store(settings, path, true)?;
    let cancel = signal::install_sigint_handler()?;
    let options = ConsoleOptions {
        idle_lock: settings.idle_lock(),
        poll_interval: settings.poll_interval(),
        ids: cli.ids.clone(),
    };

    let result = {
        let mut keys = TerminalKeys::new()?;
        let mut screen = AlternateScreen::enter(std::io::stdout())?;
        console::run(
            &mut store,
            &mut keys,
            &mut sink,
            &mut screen,
            &cancel,
            &options,
            || prompt_password("Database locked after inactivity. Enter password"),
        )
    };
    result?;

    output::info("Terminating by request.");
    Ok(())
}
