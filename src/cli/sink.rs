//! Where retrieved passwords go: the clipboard or stdout.

use std::io::Write;
use std::time::Duration;

use zeroize::Zeroizing;

use crate::cli::output;
use crate::console::SecretSink;
use crate::errors::{PwStoreError, Result};

/// Whether we are running inside an SSH session.
pub fn in_ssh_session() -> bool {
    std::env::var_os("SSH_CLIENT").is_some() && std::env::var_os("SSH_CONNECTION").is_some()
}

/// Prints the secret on its own line.
pub struct StdoutSink<W: Write> {
    out: W,
}

impl<W: Write> StdoutSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> SecretSink for StdoutSink<W> {
    fn deliver(&mut self, secret: &str) -> Result<()> {
        writeln!(self.out, "{secret}")?;
        self.out.flush()?;
        Ok(())
    }
}

/// Copies the secret to the clipboard and clears it again after a delay.
///
/// `deliver` blocks until the clipboard has been cleared.
pub struct ClipboardSink {
    clear_after: Duration,
}

impl ClipboardSink {
    /// Fails inside an SSH session, where the clipboard would be the
    /// remote machine's.
    pub fn new(clear_after: Duration) -> Result<Self> {
        if in_ssh_session() {
            return Err(PwStoreError::ClipboardError(
                "refusing to use the clipboard over SSH; pass -o to print to stdout".into(),
            ));
        }
        Ok(Self { clear_after })
    }
}

impl SecretSink for ClipboardSink {
    fn deliver(&mut self, secret: &str) -> Result<()> {
        let mut clipboard =
            arboard::Clipboard::new().map_err(|e| PwStoreError::ClipboardError(e.to_string()))?;
        clipboard
            .set_text(secret)
            .map_err(|e| PwStoreError::ClipboardError(e.to_string()))?;

        output::info(&format!(
            "Copied to clipboard; clearing in {} seconds.",
            self.clear_after.as_secs()
        ));
        std::thread::sleep(self.clear_after);

        // Leave the clipboard alone if something else was copied meanwhile.
        let still_ours = holds_secret(clipboard.get_text(), secret);
        if still_ours {
            clipboard
                .clear()
                .map_err(|e| PwStoreError::ClipboardError(e.to_string()))?;
        }
        tracing::debug!(cleared = still_ours, "clipboard timeout elapsed");
        Ok(())
    }
}

/// Whether the clipboard contents read back equal `secret`. The copy
/// read back is zeroed before returning.
fn holds_secret(contents: std::result::Result<String, arboard::Error>, secret: &str) -> bool {
    match contents {
        Ok(text) => Zeroizing::new(text).as_str() == secret,
        Err(_) => false,
    }
}

/// Pick the sink the flags ask for.
pub fn make_sink(stdout: bool, clear_after: Duration) -> Result<Box<dyn SecretSink>> {
    if stdout {
        Ok(Box::new(StdoutSink::new(std::io::stdout())))
    } else {
        Ok(Box::new(ClipboardSink::new(clear_after)?))
    }
}

impl<S: SecretSink + ?Sized> SecretSink for Box<S> {
    fn deliver(&mut self, secret: &str) -> Result<()> {
        (**self).deliver(secret)
    }
}
