//! `pwstore merge` — combine two databases into a new third one.

use std::path::Path;

use console::style;

use crate::cli::output;
use crate::cli::{confirm, prompt_new_password, prompt_password, stdin_is_terminal};
use crate::config::Settings;
use crate::errors::{PwStoreError, Result};
use crate::merge::{self, Complement, MergeCaller, MergePlan};
use crate::store::{Credential, CredentialId, PasswordStore, SealedFile};

/// Answers merge questions from flags, or by asking on a terminal.
struct CliMergeCaller<'a> {
    settings: &'a Settings,
    include_a: bool,
    include_b: bool,
    interactive: bool,
}

impl MergeCaller for CliMergeCaller<'_> {
    type File = SealedFile;

    fn present(&mut self, plan: &MergePlan) {
        show("A", &plan.a);
        show("B", &plan.b);
        show("Intersection of A and B", &plan.intersection);
        show("Complement of A in B (only in A)", &plan.complement_a_in_b);
        show("Complement of B in A (only in B)", &plan.complement_b_in_a);
    }

    fn accept(
        &mut self,
        complement: Complement,
        entries: &[(CredentialId, Credential)],
    ) -> Result<bool> {
        let (preset, prompt) = match complement {
            Complement::AInB => (self.include_a, "Use complement of A in B?"),
            Complement::BInA => (self.include_b, "Use complement of B in A?"),
        };
        if preset || entries.is_empty() {
            return Ok(preset);
        }
        if !self.interactive {
            output::info(&format!("{prompt} No (not a terminal)."));
            return Ok(false);
        }
        confirm(prompt, false)
    }

    fn open_destination(&mut self, path: &Path) -> Result<PasswordStore<SealedFile>> {
        output::info(&format!("Creating merged database at {}", path.display()));
        let password = prompt_new_password()?;
        PasswordStore::open(SealedFile::new(path, self.settings.argon2_params()), &password)
    }
}

fn show(title: &str, entries: &[(CredentialId, Credential)]) {
    println!("{}", style(format!("{title}:")).bold());
    if entries.is_empty() {
        println!("  (none)");
    } else {
        println!("{}", output::credentials_table(entries));
    }
    println!();
}

fn open_source(settings: &Settings, path: &Path) -> Result<PasswordStore> {
    if !path.exists() {
        return Err(PwStoreError::DatabaseNotFound(path.to_path_buf()));
    }
    let password = prompt_password(&format!("Password for {}", path.display()))?;
    PasswordStore::open(SealedFile::new(path, settings.argon2_params()), &password)
}

fn report_duplicates(name: &str, store: &PasswordStore) -> Result<()> {
    let dump = store.dump()?;
    let pairs = merge::duplicates(&dump);
    if pairs.is_empty() {
        output::info(&format!("{name}: no duplicate entries."));
    }
    for (first, second) in pairs {
        output::warning(&format!(
            "{name}: entries {first} and {second} are identical; the merge report may attribute them to different sets."
        ));
    }
    Ok(())
}

/// Execute the `merge` command.
pub fn execute(
    a: &Path,
    b: &Path,
    dest: &Path,
    include_a: bool,
    include_b: bool,
    duplicates: bool,
) -> Result<()> {
    merge::ensure_destination_free(dest).map_err(|e| {
        output::tip("To merge into an existing database, merge into a new one and replace it.");
        e
    })?;

    let settings = Settings::load(&std::env::current_dir()?)?;
    let source_a = open_source(&settings, a)?;
    let source_b = open_source(&settings, b)?;

    if duplicates {
        report_duplicates("A", &source_a)?;
        report_duplicates("B", &source_b)?;
    }

    let mut caller = CliMergeCaller {
        settings: &settings,
        include_a,
        include_b,
        interactive: stdin_is_terminal(),
    };
    let outcome = merge::merge(&source_a, &source_b, dest, &mut caller)?;

    output::success(&format!(
        "Merged {} entries into {}",
        outcome.inserted,
        dest.display()
    ));
    Ok(())
}
