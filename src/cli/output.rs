//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::store::{Credential, CredentialId};

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Build a table of entries (Id, Url, Username). Passwords are never shown.
pub fn credentials_table(entries: &[(CredentialId, Credential)]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Id", "Url", "Username"]);

    for (id, record) in entries {
        table.add_row(vec![
            id.to_string(),
            record.url.clone(),
            record.username.clone(),
        ]);
    }
    table
}

/// Print a table of entries, or a hint when there are none.
pub fn print_credentials_table(entries: &[(CredentialId, Credential)], empty_msg: &str) {
    if entries.is_empty() {
        info(empty_msg);
        return;
    }
    println!("{}", credentials_table(entries));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_lists_ids_and_hides_passwords() {
        let entries = vec![
            (0, Credential::new("amazon.de", "amazon_user", "password3")),
            (1, Credential::new("ebay", "ebay_user2", "password2")),
        ];
        let rendered = credentials_table(&entries).to_string();
        assert!(rendered.contains("amazon_user"));
        assert!(rendered.contains("ebay_user2"));
        assert!(!rendered.contains("password3"));
    }
}
