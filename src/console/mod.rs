//! Interactive retrieval console.
//!
//! A single-threaded polling loop over three modes:
//!
//! - `Normal`: typed characters build a live filter on url/username.
//! - `Command`: one keystroke is one command (quit, clear filter, help,
//!   list all) or a digit that starts an id.
//! - `Accumulate`: digits build an id; Enter retrieves that record's
//!   password and hands it to a `SecretSink`.
//!
//! The key handling in `Console` is pure state; `run` drives it against
//! a store, a key source and a screen. Nothing here blocks on input: when
//! no key is pending the loop sleeps for the poll interval.

pub mod render;
pub mod signal;
pub mod terminal;

use std::io::Write;
use std::time::{Duration, Instant};

use zeroize::Zeroizing;

use crate::errors::Result;
use crate::store::{CipherFile, Credential, CredentialId, PasswordStore};

pub use render::{render, View};
pub use signal::CancelToken;

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Command,
    Accumulate,
}

/// One decoded keystroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// A printable, non-space ASCII character.
    Char(char),
    Enter,
    Backspace,
    /// Ctrl-G
    Cancel,
    /// Ctrl-X
    Abort,
    Other,
}

impl Key {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            b'\n' | b'\r' => Key::Enter,
            0x7f | 0x08 => Key::Backspace,
            0x07 => Key::Cancel,
            0x18 => Key::Abort,
            b if b.is_ascii_graphic() => Key::Char(b as char),
            _ => Key::Other,
        }
    }
}

/// Where keystrokes come from.
pub trait KeySource {
    /// The next pending key, or `None` if there is none right now.
    /// Must not block.
    fn poll_key(&mut self) -> Result<Option<Key>>;

    /// Release the terminal for a line-oriented prompt.
    fn suspend(&mut self) -> Result<()> {
        Ok(())
    }

    /// Take the terminal back after `suspend`.
    fn resume(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Where a retrieved password goes.
pub trait SecretSink {
    fn deliver(&mut self, secret: &str) -> Result<()>;
}

/// What a keystroke asks the driver to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    Retrieve(CredentialId),
    Quit,
}

/// Result of feeding one key to the `Console`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// Whether the screen needs redrawing.
    pub changed: bool,
    pub action: Action,
}

impl Step {
    fn unchanged() -> Self {
        Self {
            changed: false,
            action: Action::None,
        }
    }

    fn changed() -> Self {
        Self {
            changed: true,
            action: Action::None,
        }
    }

    fn action(action: Action) -> Self {
        Self {
            changed: false,
            action,
        }
    }
}

/// Key-driven console state.
#[derive(Debug)]
pub struct Console {
    mode: Mode,
    filter: String,
    ticket: String,
    show_help: bool,
    show_dump: bool,
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

impl Console {
    pub fn new() -> Self {
        Self {
            mode: Mode::Normal,
            filter: String::new(),
            ticket: String::new(),
            show_help: false,
            show_dump: false,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Digits typed so far in `Accumulate` mode.
    pub fn ticket(&self) -> &str {
        &self.ticket
    }

    pub fn show_help(&self) -> bool {
        self.show_help
    }

    pub fn show_dump(&self) -> bool {
        self.show_dump
    }

    pub fn handle_key(&mut self, key: Key) -> Step {
        if key == Key::Abort {
            return Step::action(Action::Quit);
        }
        match self.mode {
            Mode::Normal => self.normal(key),
            Mode::Command => self.command(key),
            Mode::Accumulate => self.accumulate(key),
        }
    }

    fn normal(&mut self, key: Key) -> Step {
        match key {
            Key::Char(c) => {
                self.filter.push(c);
                Step::changed()
            }
            Key::Backspace => {
                if self.filter.pop().is_some() {
                    Step::changed()
                } else {
                    Step::unchanged()
                }
            }
            Key::Enter => {
                self.mode = Mode::Command;
                Step::changed()
            }
            Key::Cancel => {
                self.close_panels();
                Step::changed()
            }
            _ => Step::unchanged(),
        }
    }

    fn command(&mut self, key: Key) -> Step {
        match key {
            Key::Char('q') => return Step::action(Action::Quit),
            Key::Char(d) if d.is_ascii_digit() => {
                self.filter.clear();
                self.ticket.clear();
                self.ticket.push(d);
                self.mode = Mode::Accumulate;
                return Step::changed();
            }
            Key::Char('k') => self.filter.clear(),
            Key::Char('h') => self.show_help = true,
            Key::Char('l') => self.show_dump = true,
            Key::Cancel => self.close_panels(),
            _ => {}
        }
        self.mode = Mode::Normal;
        Step::changed()
    }

    fn accumulate(&mut self, key: Key) -> Step {
        match key {
            Key::Char(d) if d.is_ascii_digit() => {
                self.ticket.push(d);
                Step::changed()
            }
            Key::Enter => {
                self.mode = Mode::Normal;
                let ticket = std::mem::take(&mut self.ticket);
                match ticket.parse::<CredentialId>() {
                    Ok(id) => Step::action(Action::Retrieve(id)),
                    Err(_) => Step::changed(),
                }
            }
            Key::Cancel => {
                self.ticket.clear();
                self.mode = Mode::Normal;
                Step::changed()
            }
            _ => Step::unchanged(),
        }
    }

    fn close_panels(&mut self) {
        self.show_help = false;
        self.show_dump = false;
    }
}

/// Timing and lookup parameters for `run`.
#[derive(Debug, Clone)]
pub struct ConsoleOptions {
    /// Inactivity after which the store is locked and the password asked
    /// again.
    pub idle_lock: Duration,
    /// Sleep between polls when nothing happened.
    pub poll_interval: Duration,
    /// Ids always listed next to the filter matches.
    pub ids: Vec<CredentialId>,
}

/// Run the console until the user quits or cancels.
///
/// `reprompt` is asked for the password after an idle lock; if it fails
/// or the password is wrong, `run` returns that error. The store is
/// synced on exit if anything changed it.
pub fn run<F, K, S, W, P>(
    store: &mut PasswordStore<F>,
    keys: &mut K,
    sink: &mut S,
    screen: &mut W,
    cancel: &CancelToken,
    options: &ConsoleOptions,
    mut reprompt: P,
) -> Result<()>
where
    F: CipherFile,
    K: KeySource,
    S: SecretSink,
    W: Write,
    P: FnMut() -> Result<Zeroizing<String>>,
{
    let mut console = Console::new();
    let mut matches: Vec<(CredentialId, Credential)> = Vec::new();
    let mut status: Option<String> = None;
    let mut last_change = Instant::now();
    let mut changed = true;
    let mut quit = false;

    loop {
        if quit || (console.mode() == Mode::Command && cancel.take()) {
            tracing::debug!("console terminated by request");
            break;
        }

        if last_change.elapsed() >= options.idle_lock {
            store.lock();
            writeln!(
                screen,
                "{CLEAR_SCREEN}Database locked after {} seconds of inactivity.",
                options.idle_lock.as_secs()
            )?;
            screen.flush()?;
            keys.suspend()?;
            let password = reprompt();
            keys.resume()?;
            store.unlock(&password?)?;
            last_change = Instant::now();
            changed = true;
        }

        while let Some(key) = keys.poll_key()? {
            let step = console.handle_key(key);
            changed |= step.changed;
            match step.action {
                Action::None => {}
                Action::Quit => {
                    quit = true;
                    break;
                }
                Action::Retrieve(id) => match store.get(id) {
                    Ok(record) => {
                        sink.deliver(&record.password)?;
                        writeln!(screen, "Retrieved value for id {id}.")?;
                        screen.flush()?;
                    }
                    Err(e) => {
                        status = Some(e.to_string());
                        changed = true;
                    }
                },
            }
        }
        if quit {
            continue;
        }

        if !changed {
            std::thread::sleep(options.poll_interval);
            continue;
        }

        last_change = Instant::now();
        changed = false;

        if console.filter().is_empty() && options.ids.is_empty() {
            matches.clear();
        } else {
            matches = store.lookup_with_ids(console.filter(), &options.ids)?;
        }
        let dump = if console.show_dump() {
            Some(store.dump()?)
        } else {
            None
        };

        let frame = render(&View {
            mode: console.mode(),
            filter: console.filter(),
            ticket: console.ticket(),
            show_help: console.show_help(),
            matches: &matches,
            dump: dump.as_deref(),
            status: status.as_deref(),
        });
        status = None;
        write!(screen, "{CLEAR_SCREEN}{frame}")?;
        screen.flush()?;
    }

    if store.is_dirty() {
        store.sync()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(console: &mut Console, keys: &str) {
        for c in keys.chars() {
            console.handle_key(Key::Char(c));
        }
    }

    #[test]
    fn from_byte_decodes_controls() {
        assert_eq!(Key::from_byte(b'\r'), Key::Enter);
        assert_eq!(Key::from_byte(b'\n'), Key::Enter);
        assert_eq!(Key::from_byte(127), Key::Backspace);
        assert_eq!(Key::from_byte(0x07), Key::Cancel);
        assert_eq!(Key::from_byte(0x18), Key::Abort);
        assert_eq!(Key::from_byte(b'x'), Key::Char('x'));
        assert_eq!(Key::from_byte(b' '), Key::Other);
        assert_eq!(Key::from_byte(0xc3), Key::Other);
    }

    #[test]
    fn normal_mode_builds_filter() {
        let mut console = Console::new();
        feed(&mut console, "ebx");
        assert_eq!(console.handle_key(Key::Backspace), Step::changed());
        assert_eq!(console.filter(), "eb");
        assert_eq!(console.mode(), Mode::Normal);
    }

    #[test]
    fn backspace_on_empty_filter_is_no_change() {
        let mut console = Console::new();
        assert_eq!(console.handle_key(Key::Backspace), Step::unchanged());
    }

    #[test]
    fn enter_then_digit_starts_ticket() {
        let mut console = Console::new();
        feed(&mut console, "eb");
        console.handle_key(Key::Enter);
        assert_eq!(console.mode(), Mode::Command);
        console.handle_key(Key::Char('3'));
        assert_eq!(console.mode(), Mode::Accumulate);
        assert_eq!(console.ticket(), "3");
        assert_eq!(console.filter(), "");
        console.handle_key(Key::Char('1'));
        assert_eq!(
            console.handle_key(Key::Enter),
            Step::action(Action::Retrieve(31))
        );
        assert_eq!(console.mode(), Mode::Normal);
        assert_eq!(console.ticket(), "");
    }

    #[test]
    fn cancel_drops_ticket() {
        let mut console = Console::new();
        console.handle_key(Key::Enter);
        console.handle_key(Key::Char('4'));
        console.handle_key(Key::Cancel);
        assert_eq!(console.mode(), Mode::Normal);
        assert_eq!(console.ticket(), "");
    }

    #[test]
    fn command_keys() {
        let mut console = Console::new();
        feed(&mut console, "abc");

        console.handle_key(Key::Enter);
        console.handle_key(Key::Char('h'));
        assert!(console.show_help());
        assert_eq!(console.mode(), Mode::Normal);

        console.handle_key(Key::Enter);
        console.handle_key(Key::Char('l'));
        assert!(console.show_dump());

        console.handle_key(Key::Enter);
        console.handle_key(Key::Char('k'));
        assert_eq!(console.filter(), "");

        console.handle_key(Key::Cancel);
        assert!(!console.show_help());
        assert!(!console.show_dump());

        console.handle_key(Key::Enter);
        assert_eq!(
            console.handle_key(Key::Char('q')),
            Step::action(Action::Quit)
        );
    }

    #[test]
    fn unknown_command_returns_to_normal() {
        let mut console = Console::new();
        feed(&mut console, "ab");
        console.handle_key(Key::Enter);
        assert_eq!(console.handle_key(Key::Char('z')), Step::changed());
        assert_eq!(console.mode(), Mode::Normal);
        assert_eq!(console.filter(), "ab");
    }

    #[test]
    fn abort_quits_from_every_mode() {
        let mut console = Console::new();
        assert_eq!(console.handle_key(Key::Abort).action, Action::Quit);
        console.handle_key(Key::Enter);
        assert_eq!(console.handle_key(Key::Abort).action, Action::Quit);
        console.handle_key(Key::Char('1'));
        assert_eq!(console.handle_key(Key::Abort).action, Action::Quit);
    }

    #[test]
    fn overlong_ticket_is_not_retrieved() {
        let mut console = Console::new();
        console.handle_key(Key::Enter);
        for _ in 0..40 {
            console.handle_key(Key::Char('9'));
        }
        assert_eq!(console.handle_key(Key::Enter), Step::changed());
    }
}
