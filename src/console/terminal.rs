//! Non-blocking keyboard input on a Unix terminal.

use std::io::{self, Write};
#[cfg(unix)]
use std::os::unix::io::RawFd;

use super::{Key, KeySource};
use crate::errors::Result;

/// Switches a terminal to non-canonical, no-echo mode until dropped.
///
/// Signal generation stays on, so Ctrl-C still raises SIGINT.
#[cfg(unix)]
pub struct RawMode {
    original: libc::termios,
    fd: RawFd,
}

#[cfg(unix)]
impl RawMode {
    pub fn enable(fd: RawFd) -> io::Result<Self> {
        // SAFETY: termios is plain data; tcgetattr fully initialises it.
        let mut termios: libc::termios = unsafe { std::mem::zeroed() };
        if unsafe { libc::tcgetattr(fd, &mut termios) } != 0 {
            return Err(io::Error::last_os_error());
        }

        let original = termios;
        termios.c_lflag &= !(libc::ICANON | libc::ECHO);
        termios.c_cc[libc::VMIN] = 1;
        termios.c_cc[libc::VTIME] = 0;

        if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &termios) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(Self { original, fd })
    }
}

#[cfg(unix)]
impl Drop for RawMode {
    fn drop(&mut self) {
        // SAFETY: restores the attributes read in `enable`.
        unsafe {
            libc::tcsetattr(self.fd, libc::TCSANOW, &self.original);
        }
    }
}

/// Whether `fd` has a byte ready, without waiting.
#[cfg(unix)]
fn input_ready(fd: RawFd) -> io::Result<bool> {
    let mut fds = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    // SAFETY: one valid pollfd, zero timeout.
    let n = unsafe { libc::poll(&mut fds, 1, 0) };
    if n < 0 {
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::Interrupted {
            return Ok(false);
        }
        return Err(err);
    }
    Ok(n > 0 && fds.revents & libc::POLLIN != 0)
}

#[cfg(unix)]
fn read_byte(fd: RawFd) -> io::Result<Option<u8>> {
    let mut byte = 0u8;
    // SAFETY: reads at most one byte into a local.
    let n = unsafe { libc::read(fd, (&mut byte as *mut u8).cast(), 1) };
    match n {
        1 => Ok(Some(byte)),
        0 => Ok(None),
        _ => Err(io::Error::last_os_error()),
    }
}

/// Keys from a terminal, held in raw mode for as long as this value
/// lives.
///
/// Keys typed between polls are neither echoed nor line-edited by the
/// kernel. `suspend` hands the terminal back for a password prompt.
#[cfg(unix)]
pub struct TerminalKeys {
    fd: RawFd,
    raw: Option<RawMode>,
    closed: bool,
}

#[cfg(unix)]
impl TerminalKeys {
    /// Raw keys from stdin.
    pub fn new() -> Result<Self> {
        Self::from_fd(libc::STDIN_FILENO)
    }

    pub fn from_fd(fd: RawFd) -> Result<Self> {
        let raw = RawMode::enable(fd)?;
        Ok(Self {
            fd,
            raw: Some(raw),
            closed: false,
        })
    }

    pub fn is_raw(&self) -> bool {
        self.raw.is_some()
    }
}

#[cfg(unix)]
impl KeySource for TerminalKeys {
    fn poll_key(&mut self) -> Result<Option<Key>> {
        if self.closed {
            return Ok(Some(Key::Abort));
        }
        if !input_ready(self.fd)? {
            return Ok(None);
        }
        match read_byte(self.fd)? {
            Some(byte) => Ok(Some(Key::from_byte(byte))),
            None => {
                // EOF; nothing more will ever arrive.
                self.closed = true;
                Ok(Some(Key::Abort))
            }
        }
    }

    fn suspend(&mut self) -> Result<()> {
        self.raw = None;
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        if self.raw.is_none() {
            self.raw = Some(RawMode::enable(self.fd)?);
        }
        Ok(())
    }
}

#[cfg(not(unix))]
pub struct TerminalKeys {
    _private: (),
}

#[cfg(not(unix))]
impl TerminalKeys {
    pub fn new() -> Result<Self> {
        Err(crate::errors::PwStoreError::CommandFailed(
            "interactive lookup needs a Unix terminal".into(),
        ))
    }
}

#[cfg(not(unix))]
impl KeySource for TerminalKeys {
    fn poll_key(&mut self) -> Result<Option<Key>> {
        Ok(Some(Key::Abort))
    }
}

/// Shows the terminal's alternate screen until dropped.
pub struct AlternateScreen<W: Write> {
    out: W,
}

impl<W: Write> AlternateScreen<W> {
    pub fn enter(mut out: W) -> io::Result<Self> {
        out.write_all(b"\x1b[?1049h")?;
        out.flush()?;
        Ok(Self { out })
    }
}

impl<W: Write> Write for AlternateScreen<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.out.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

impl<W: Write> Drop for AlternateScreen<W> {
    fn drop(&mut self) {
        let _ = self.out.write_all(b"\x1b[?1049l");
        let _ = self.out.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[cfg(unix)]
    use std::time::{Duration, Instant};

    /// A pseudo-terminal pair; the test types on the master side.
    #[cfg(unix)]
    struct Pty {
        master: RawFd,
        slave: RawFd,
    }

    #[cfg(unix)]
    impl Pty {
        fn open() -> Self {
            let (mut master, mut slave) = (-1, -1);
            let rc = unsafe {
                libc::openpty(
                    &mut master,
                    &mut slave,
                    std::ptr::null_mut(),
                    std::ptr::null_mut(),
                    std::ptr::null_mut(),
                )
            };
            assert_eq!(rc, 0, "openpty failed");
            Self { master, slave }
        }

        fn type_bytes(&self, bytes: &[u8]) {
            let n = unsafe { libc::write(self.master, bytes.as_ptr().cast(), bytes.len()) };
            assert_eq!(n, bytes.len() as isize);
        }

        /// Whatever the slave side echoed back, after giving the line
        /// discipline time to run.
        fn echoed(&self) -> Vec<u8> {
            std::thread::sleep(Duration::from_millis(50));
            let mut out = Vec::new();
            while input_ready(self.master).unwrap() {
                let mut buf = [0u8; 64];
                let n = unsafe { libc::read(self.master, buf.as_mut_ptr().cast(), buf.len()) };
                if n <= 0 {
                    break;
                }
                out.extend_from_slice(&buf[..n as usize]);
            }
            out
        }

        fn lflag(&self) -> libc::tcflag_t {
            let mut termios: libc::termios = unsafe { std::mem::zeroed() };
            assert_eq!(unsafe { libc::tcgetattr(self.slave, &mut termios) }, 0);
            termios.c_lflag
        }
    }

    #[cfg(unix)]
    impl Drop for Pty {
        fn drop(&mut self) {
            unsafe {
                libc::close(self.slave);
                libc::close(self.master);
            }
        }
    }

    /// Poll until `count` keys arrived or two seconds passed.
    #[cfg(unix)]
    fn collect(keys: &mut TerminalKeys, count: usize) -> Vec<Key> {
        let deadline = Instant::now() + Duration::from_secs(2);
        let mut got = Vec::new();
        while got.len() < count && Instant::now() < deadline {
            match keys.poll_key().unwrap() {
                Some(key) => got.push(key),
                None => std::thread::sleep(Duration::from_millis(5)),
            }
        }
        got
    }

    #[cfg(unix)]
    #[test]
    fn keys_typed_between_polls_arrive_raw_and_unechoed() {
        let pty = Pty::open();
        let mut keys = TerminalKeys::from_fd(pty.slave).unwrap();

        assert_eq!(keys.poll_key().unwrap(), None);
        std::thread::sleep(Duration::from_millis(20));
        pty.type_bytes(b"a");
        assert_eq!(collect(&mut keys, 1), vec![Key::Char('a')]);

        // Typed while the console sleeps between polls.
        pty.type_bytes(b"b\x7f");
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(collect(&mut keys, 2), vec![Key::Char('b'), Key::Backspace]);
        assert!(pty.echoed().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn suspend_restores_line_mode_until_resume() {
        let pty = Pty::open();
        let cooked = pty.lflag();
        assert_ne!(cooked & libc::ICANON, 0);

        let mut keys = TerminalKeys::from_fd(pty.slave).unwrap();
        assert_eq!(pty.lflag() & (libc::ICANON | libc::ECHO), 0);
        assert_ne!(pty.lflag() & libc::ISIG, 0);

        keys.suspend().unwrap();
        assert!(!keys.is_raw());
        assert_eq!(pty.lflag(), cooked);

        keys.resume().unwrap();
        assert!(keys.is_raw());
        assert_eq!(pty.lflag() & (libc::ICANON | libc::ECHO), 0);

        drop(keys);
        assert_eq!(pty.lflag(), cooked);
    }

    #[test]
    fn alternate_screen_is_left_on_drop() {
        let mut buf = Vec::new();
        {
            let mut screen = AlternateScreen::enter(&mut buf).unwrap();
            screen.write_all(b"hi").unwrap();
        }
        assert_eq!(buf, b"\x1b[?1049hhi\x1b[?1049l");
    }
}
