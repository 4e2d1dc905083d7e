//! Cooperative cancellation for the retrieval console.
//!
//! `CancelToken` is a shared flag that the console polls at fixed
//! points. `install_sigint_handler` routes SIGINT into such a token
//! instead of terminating the process.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use crate::errors::Result;

/// A shared "interrupt requested" flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Safe to call from a signal handler.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Consume a pending request, resetting the flag.
    pub fn take(&self) -> bool {
        self.flag.swap(false, Ordering::SeqCst)
    }
}

static SIGINT_FLAG: OnceLock<Arc<AtomicBool>> = OnceLock::new();

/// Route SIGINT into a `CancelToken`.
///
/// Installing twice returns a token sharing the first one's flag.
#[cfg(unix)]
pub fn install_sigint_handler() -> Result<CancelToken> {
    extern "C" fn on_sigint(_: libc::c_int) {
        if let Some(flag) = SIGINT_FLAG.get() {
            flag.store(true, Ordering::SeqCst);
        }
    }

    let flag = SIGINT_FLAG.get_or_init(|| Arc::new(AtomicBool::new(false)));
    let handler = on_sigint as extern "C" fn(libc::c_int) as libc::sighandler_t;
    // SAFETY: the handler only performs an atomic store.
    if unsafe { libc::signal(libc::SIGINT, handler) } == libc::SIG_ERR {
        return Err(std::io::Error::last_os_error().into());
    }
    tracing::debug!("SIGINT handler installed");

    Ok(CancelToken {
        flag: Arc::clone(flag),
    })
}

#[cfg(not(unix))]
pub fn install_sigint_handler() -> Result<CancelToken> {
    let flag = SIGINT_FLAG.get_or_init(|| Arc::new(AtomicBool::new(false)));
    Ok(CancelToken {
        flag: Arc::clone(flag),
    })
}
