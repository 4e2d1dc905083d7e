//! `pwstore add` — add one entry interactively, or import entries from a file.
//!
//! Import files hold one entry per three lines (url, username, password),
//! entries separated by two `###` lines:
//!
//! ```text
//! ebay.de
//! ebay_user1
//! password1
//! ###
//! ###
//! amazon.de
//! amazon_user
//! password3
//! ```

use std::fs;
use std::path::Path;

use dialoguer::{Input, Password};

use crate::cli::output;
use crate::cli::{load_context, open_store, Cli};
use crate::errors::{PwStoreError, Result};
use crate::store::Credential;

const SEPARATOR: &str = "###";

/// Execute the `add` command.
pub fn execute(cli: &Cli, input_file: Option<&Path>) -> Result<()> {
    let (settings, path) = load_context(cli)?;

    // Read everything first so a bad import never touches the database.
    let records = match input_file {
        Some(file) => {
            let text = fs::read_to_string(file)?;
            parse_import(&text)?
        }
        None => vec![prompt_record()?],
    };

    let mut store = open_store(&settings, &path, false)?;
    for record in records.iter().cloned() {
        let summary = record.to_string();
        store.add(record)?;
        tracing::debug!(entry = %summary, "imported");
    }
    store.sync()?;

    match records.as_slice() {
        [single] => output::success(&format!("Added {single}")),
        many => output::success(&format!("Added {} entries", many.len())),
    }
    Ok(())
}

/// Parse an import file. Any malformed or empty entry rejects the file.
pub fn parse_import(text: &str) -> Result<Vec<Credential>> {
    let mut lines = text.lines().peekable();
    let mut records = Vec::new();

    loop {
        let entry = records.len() + 1;
        let (Some(url), Some(username), Some(password)) =
            (lines.next(), lines.next(), lines.next())
        else {
            return Err(PwStoreError::InvalidFileFormat(format!(
                "entry {entry} is incomplete; expected url, username and password lines"
            )));
        };
        if url.is_empty() && username.is_empty() && password.is_empty() {
            return Err(PwStoreError::InvalidFileFormat(format!(
                "entry {entry} is empty"
            )));
        }
        let record = Credential::new(url, username, password);
        record.validate()?;
        records.push(record);

        for _ in 0..2 {
            match lines.next() {
                None => return Ok(records),
                Some(SEPARATOR) => {}
                Some(_) => {
                    return Err(PwStoreError::InvalidFileFormat(format!(
                        "expected two '{SEPARATOR}' lines after entry {entry}"
                    )))
                }
            }
        }
        // A separator at the very end closes the file.
        if lines.peek().is_none() {
            return Ok(records);
        }
    }
}

fn prompt_record() -> Result<Credential> {
    let prompt_err = |e: dialoguer::Error| PwStoreError::CommandFailed(format!("prompt: {e}"));

    let url: String = Input::new()
        .with_prompt("Url")
        .allow_empty(true)
        .interact_text()
        .map_err(prompt_err)?;
    let username: String = Input::new()
        .with_prompt("User")
        .allow_empty(true)
        .interact_text()
        .map_err(prompt_err)?;
    let password = Password::new()
        .with_prompt("Password")
        .allow_empty_password(true)
        .interact()
        .map_err(prompt_err)?;

    Ok(Credential::new(url, username, password))
}
