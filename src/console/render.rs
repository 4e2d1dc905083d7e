//! Screen contents for the retrieval console.
//!
//! Rendering is a pure function of a `View`; it never touches the store.

use std::fmt::Write as _;

use super::Mode;
use crate::store::{Credential, CredentialId};

const SEPARATOR: &str = "_________________________________________\n\n";

const HELP_HEADER: &str = "\
Type to filter by url or username. Enter switches to command mode.
Commands: q quit | k clear filter | h help | l list all | <digits> Enter retrieve id
";

const HELP_DETAIL: &str = "\
C-g cancels (closes help and list, drops a pending id).
C-x quits from any mode. C-c quits once in command mode.
";

/// Everything one frame shows.
pub struct View<'a> {
    pub mode: Mode,
    pub filter: &'a str,
    pub ticket: &'a str,
    pub show_help: bool,
    pub matches: &'a [(CredentialId, Credential)],
    pub dump: Option<&'a [(CredentialId, Credential)]>,
    pub status: Option<&'a str>,
}

/// Render a full frame, passwords masked.
pub fn render(view: &View<'_>) -> String {
    let mut out = String::new();
    out.push_str(HELP_HEADER);
    out.push_str(SEPARATOR);

    if view.show_help {
        out.push_str(HELP_DETAIL);
        out.push_str(SEPARATOR);
    }

    match view.mode {
        Mode::Normal => {
            let _ = writeln!(out, "filter> {}", view.filter);
        }
        Mode::Command => {
            let _ = writeln!(out, "command [{}]> ", view.filter);
        }
        Mode::Accumulate => {
            let _ = writeln!(out, "id> {}", view.ticket);
        }
    }
    out.push_str(SEPARATOR);

    if let Some(status) = view.status {
        let _ = writeln!(out, "{status}");
        out.push_str(SEPARATOR);
    }

    if !view.matches.is_empty() {
        push_entries(&mut out, view.matches);
        out.push_str(SEPARATOR);
    }

    if let Some(dump) = view.dump {
        push_entries(&mut out, dump);
    }

    out
}

fn push_entries(out: &mut String, entries: &[(CredentialId, Credential)]) {
    for (id, record) in entries {
        let _ = writeln!(out, "{id:>4}  {record}");
    }
}
