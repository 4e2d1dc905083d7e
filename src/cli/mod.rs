//! CLI module — Clap argument parser, shared prompts, and command implementations.

pub mod commands;
pub mod output;
pub mod sink;

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use clap::Parser;
use dialoguer::Confirm;
use zeroize::Zeroizing;

use crate::config::Settings;
use crate::errors::{PwStoreError, Result};
use crate::store::{CredentialId, PasswordStore, SealedFile};

/// Minimum password length to prevent trivially weak passwords.
const MIN_PASSWORD_LEN: usize = 8;

/// pwstore: encrypted single-user credential store.
#[derive(Parser)]
#[command(
    name = "pwstore",
    about = "Encrypted credential store with an interactive lookup console",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database file (default: .pwstore.crypt in the working directory)
    #[arg(short = 'f', long = "file", env = "PWSTORE_DB_FILE", global = true)]
    pub file: Option<PathBuf>,

    /// Entry id; repeat for several (lookup, get, remove)
    #[arg(short = 'n', long = "id", global = true)]
    pub ids: Vec<CredentialId>,

    /// Interactive lookup console
    #[arg(short = 'i', long, global = true)]
    pub interactive: bool,

    /// Print secrets to stdout instead of copying them to the clipboard
    #[arg(short = 'o', long = "stdout", global = true)]
    pub stdout: bool,

    /// Remove without asking for confirmation
    #[arg(long, global = true)]
    pub force: bool,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Add an entry, or import entries from a file
    Add {
        /// File of `url\nuser\npassword\n` entries separated by `###\n###\n`
        input_file: Option<PathBuf>,
    },

    /// Find entries whose url or username contains KEY
    Lookup {
        /// Substring to search for
        key: Option<String>,
    },

    /// Retrieve the password of the entry given with -n
    Get,

    /// Remove the entries given with -n
    Remove,

    /// List every entry (passwords masked)
    Dump,

    /// Create a new, empty database
    Init {
        /// Seed the database with a few demo entries
        #[arg(long)]
        sample: bool,
    },

    /// Change the database password
    #[command(name = "change_passwd", alias = "change-passwd")]
    ChangePasswd,

    /// Generate a random password and store it
    #[command(name = "gen_passwd", alias = "gen-passwd")]
    GenPasswd {
        /// Url for the new entry (prompted if neither url nor username is given)
        #[arg(long)]
        url: Option<String>,
        /// Username for the new entry
        #[arg(long)]
        username: Option<String>,
        /// Only print the password; do not store it
        #[arg(long)]
        no_store: bool,
    },

    /// Merge databases A and B into a new database DEST
    Merge {
        /// First source database
        a: PathBuf,
        /// Second source database
        b: PathBuf,
        /// Destination database (must not exist)
        dest: PathBuf,
        /// Take the entries only A has without asking
        #[arg(long)]
        include_a: bool,
        /// Take the entries only B has without asking
        #[arg(long)]
        include_b: bool,
        /// Report identical duplicate entries in each source first
        #[arg(long)]
        report_duplicates: bool,
    },
}

impl Cli {
    /// Reject flag combinations that make no sense for the command.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(PwStoreError::InvalidArguments(msg.to_string()));

        if self.interactive && !matches!(self.command, Commands::Lookup { key: None }) {
            return invalid("-i is only valid with `lookup` and no key");
        }

        let takes_ids = matches!(
            self.command,
            Commands::Lookup { .. } | Commands::Get | Commands::Remove
        );
        if !self.ids.is_empty() && !takes_ids {
            return invalid("-n is only valid with `lookup`, `get` and `remove`");
        }

        if self.force && !matches!(self.command, Commands::Remove) {
            return invalid("--force is only valid with `remove`");
        }

        let emits_secret = matches!(self.command, Commands::Get | Commands::GenPasswd { .. })
            || self.interactive;
        if self.stdout && !emits_secret {
            return invalid("-o is only valid with `get`, `gen_passwd` and `lookup -i`");
        }

        match &self.command {
            Commands::Get if self.ids.len() != 1 => invalid("`get` needs exactly one -n <id>"),
            Commands::Remove if self.ids.is_empty() => {
                invalid("`remove` needs at least one -n <id>")
            }
            Commands::Lookup { key: None } if !self.interactive && self.ids.is_empty() => {
                invalid("`lookup` needs a key, -n <id> or -i")
            }
            _ => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Get the database password, trying in order:
/// 1. `PWSTORE_PASSWORD` env var (scripting)
/// 2. Interactive prompt
///
/// Returns `Zeroizing<String>` so the password is wiped from memory on drop.
pub fn prompt_password(prompt: &str) -> Result<Zeroizing<String>> {
    if let Some(pw) = env_password("PWSTORE_PASSWORD") {
        return Ok(pw);
    }

    let pw = dialoguer::Password::new()
        .with_prompt(prompt)
        .interact()
        .map_err(|e| PwStoreError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Prompt for a new password with confirmation.
///
/// `PWSTORE_NEW_PASSWORD`, then `PWSTORE_PASSWORD`, are used instead
/// when set. Enforces a minimum password length.
pub fn prompt_new_password() -> Result<Zeroizing<String>> {
    if let Some(pw) =
        env_password("PWSTORE_NEW_PASSWORD").or_else(|| env_password("PWSTORE_PASSWORD"))
    {
        if pw.len() < MIN_PASSWORD_LEN {
            return Err(PwStoreError::CommandFailed(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        return Ok(pw);
    }

    loop {
        let password = dialoguer::Password::new()
            .with_prompt("Choose database password")
            .with_confirmation(
                "Confirm database password",
                "Passwords do not match, try again",
            )
            .interact()
            .map_err(|e| PwStoreError::CommandFailed(format!("password prompt: {e}")))?;

        if password.len() < MIN_PASSWORD_LEN {
            output::warning(&format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters. Try again."
            ));
            continue;
        }

        return Ok(Zeroizing::new(password));
    }
}

fn env_password(var: &str) -> Option<Zeroizing<String>> {
    std::env::var(var)
        .ok()
        .filter(|pw| !pw.is_empty())
        .map(Zeroizing::new)
}

/// Ask a yes/no question; `default` is used for a bare Enter.
pub fn confirm(prompt: &str, default: bool) -> Result<bool> {
    Confirm::new()
        .with_prompt(prompt)
        .default(default)
        .interact()
        .map_err(|e| PwStoreError::CommandFailed(format!("confirm prompt: {e}")))
}

/// Whether stdin is attached to a terminal.
pub fn stdin_is_terminal() -> bool {
    std::io::stdin().is_terminal()
}

/// Load settings from the working directory and resolve the database path.
pub fn load_context(cli: &Cli) -> Result<(Settings, PathBuf)> {
    let cwd = std::env::current_dir()?;
    let settings = Settings::load(&cwd)?;
    let path = settings.db_path(&cwd, cli.file.as_deref());
    Ok((settings, path))
}

/// Open the database at `path`.
///
/// With `must_exist`, a missing file is an error; otherwise a missing
/// file is created on the next sync with a newly chosen password. After
/// opening a non-empty database the last modification date is shown
/// and, on a terminal, must be confirmed.
pub fn open_store(settings: &Settings, path: &Path, must_exist: bool) -> Result<PasswordStore> {
    let exists = path.exists();
    if must_exist && !exists {
        return Err(PwStoreError::DatabaseNotFound(path.to_path_buf()));
    }

    let password = if exists {
        prompt_password("Enter database password")?
    } else {
        output::info(&format!("Creating new database at {}", path.display()));
        prompt_new_password()?
    };

    let file = SealedFile::new(path, settings.argon2_params());
    let store = PasswordStore::open(file, &password)?;
    tracing::debug!(path = %path.display(), records = store.len(), "database opened");

    if !store.is_empty() {
        confirm_last_write(settings, &store)?;
    }
    Ok(store)
}

fn confirm_last_write(settings: &Settings, store: &PasswordStore) -> Result<()> {
    let Some(when) = store.time_of_last_write() else {
        return Ok(());
    };
    let when = when.format("%Y-%m-%d %H:%M:%S UTC");

    if !settings.confirm_last_write || !stdin_is_terminal() {
        output::info(&format!("Last modified: {when}"));
        return Ok(());
    }

    let prompt = format!("Authenticity verified. Last modified {when}. Is this date right?");
    if confirm(&prompt, true)? {
        Ok(())
    } else {
        Err(PwStoreError::UserCancelled)
    }
}
