//! Cleanup on abnormal termination.
//!
//! While a session owns the staging slot, fatal signals unlink the staged
//! file and then terminate the process with the signal's default action.
//! Terminal-generated signals are ignored so the operator's keystrokes
//! reach the editor instead of killing the session; children get them back
//! at their default disposition.
//!
//! The handler only touches a pre-built C string through an atomic pointer
//! and calls async-signal-safe `unlink(2)` and `raise(3)`.

use std::ffi::CString;
use std::io;
use std::os::raw::{c_char, c_int};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

use nix::errno::Errno;
use nix::sys::signal::{
    SaFlags, SigAction, SigHandler, SigSet, SigmaskHow, Signal, sigaction, sigprocmask,
};
use thiserror::Error;
use tracing::debug;

const SIGNALS_TARGET: &str = "vigil::signals";

/// Signals that remove the staged file before the process dies.
pub const FATAL_SIGNALS: [Signal; 5] = [
    Signal::SIGILL,
    Signal::SIGTRAP,
    Signal::SIGBUS,
    Signal::SIGSEGV,
    Signal::SIGTERM,
];

/// Signals ignored by the session and restored to default in children.
pub const DEFERRED_SIGNALS: [Signal; 3] = [Signal::SIGHUP, Signal::SIGINT, Signal::SIGQUIT];

/// Staged path visible to the handler. Null when no session is armed.
static ARMED_PATH: AtomicPtr<c_char> = AtomicPtr::new(ptr::null_mut());

/// Errors raised while arming the guard.
#[derive(Debug, Error)]
pub enum SignalError {
    /// A guard is already armed in this process.
    #[error("a staging cleanup guard is already installed")]
    AlreadyInstalled,
    /// The staged path cannot be represented as a C string.
    #[error("staging path contains an interior NUL byte")]
    InvalidPath,
    /// `sigaction(2)` rejected a disposition change.
    #[error("failed to install handler for {signal}: {source}")]
    Install {
        /// Signal being configured.
        signal: Signal,
        /// Underlying errno.
        #[source]
        source: Errno,
    },
}

extern "C" fn unlink_staged_and_reraise(signal: c_int) {
    let path = ARMED_PATH.swap(ptr::null_mut(), Ordering::SeqCst);
    if !path.is_null() {
        // SAFETY: the pointer came from `CString::into_raw` in `install` and
        // is never freed while it can still be observed here.
        unsafe {
            libc::unlink(path);
        }
    }
    // SA_RESETHAND restored the default action, so the pending signal
    // terminates the process once this handler returns.
    // SAFETY: raise is async-signal-safe.
    unsafe {
        libc::raise(signal);
    }
}

/// Armed cleanup handlers for one staged path.
///
/// Dropping the guard restores the previous dispositions and forgets the
/// staged path; it does not remove the file.
#[derive(Debug)]
pub struct SignalGuard {
    path: *mut c_char,
    previous: Vec<(Signal, SigAction)>,
}

impl SignalGuard {
    /// Arms cleanup of `staged` for every signal in [`FATAL_SIGNALS`] and
    /// ignores [`DEFERRED_SIGNALS`].
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::AlreadyInstalled`] when another guard is armed
    /// and [`SignalError::Install`] when a disposition cannot be changed.
    pub fn install(staged: &Path) -> Result<Self, SignalError> {
        let path = CString::new(staged.as_os_str().as_bytes())
            .map_err(|_| SignalError::InvalidPath)?
            .into_raw();
        if ARMED_PATH
            .compare_exchange(ptr::null_mut(), path, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            // SAFETY: `path` was produced by `into_raw` above and never shared.
            drop(unsafe { CString::from_raw(path) });
            return Err(SignalError::AlreadyInstalled);
        }

        let mut guard = Self {
            path,
            previous: Vec::with_capacity(FATAL_SIGNALS.len() + DEFERRED_SIGNALS.len()),
        };
        let cleanup = SigAction::new(
            SigHandler::Handler(unlink_staged_and_reraise),
            SaFlags::SA_RESETHAND,
            SigSet::empty(),
        );
        let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());
        for signal in FATAL_SIGNALS {
            guard.replace(signal, &cleanup)?;
        }
        for signal in DEFERRED_SIGNALS {
            guard.replace(signal, &ignore)?;
        }
        debug!(
            target: SIGNALS_TARGET,
            path = %staged.display(),
            "cleanup handlers armed"
        );
        Ok(guard)
    }

    fn replace(&mut self, signal: Signal, action: &SigAction) -> Result<(), SignalError> {
        // SAFETY: the installed handler only performs async-signal-safe work.
        let previous = unsafe { sigaction(signal, action) }
            .map_err(|source| SignalError::Install { signal, source })?;
        self.previous.push((signal, previous));
        Ok(())
    }

    /// Runs the final unlink or rename with fatal signals blocked, then
    /// disarms the guard.
    ///
    /// A signal arriving during `finish` is held until the staged path has
    /// been forgotten, so the handler can never unlink a path that has
    /// already become the committed target or a new session's slot.
    pub fn disarm_with<T>(self, finish: impl FnOnce() -> T) -> T {
        let mut blocked = SigSet::empty();
        for signal in FATAL_SIGNALS {
            blocked.add(signal);
        }
        let mut original = SigSet::empty();
        let masked =
            sigprocmask(SigmaskHow::SIG_BLOCK, Some(&blocked), Some(&mut original)).is_ok();

        let result = finish();
        drop(self);

        if masked && let Err(error) = sigprocmask(SigmaskHow::SIG_SETMASK, Some(&original), None)
        {
            debug!(target: SIGNALS_TARGET, %error, "failed to restore signal mask");
        }
        result
    }
}

impl Drop for SignalGuard {
    fn drop(&mut self) {
        // The handler may already have claimed the path; nothing to undo then.
        if ARMED_PATH
            .compare_exchange(self.path, ptr::null_mut(), Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!(target: SIGNALS_TARGET, "staged path already released by handler");
        }
        for (signal, action) in self.previous.drain(..).rev() {
            // SAFETY: restores a disposition previously returned by sigaction.
            if let Err(error) = unsafe { sigaction(signal, &action) } {
                debug!(target: SIGNALS_TARGET, %signal, %error, "failed to restore handler");
            }
        }
        // SAFETY: the pointer is no longer reachable from the handler.
        drop(unsafe { CString::from_raw(self.path) });
        debug!(target: SIGNALS_TARGET, "cleanup handlers disarmed");
    }
}

/// Resets [`DEFERRED_SIGNALS`] to their default action.
///
/// Intended for `CommandExt::pre_exec`, so it only calls `sigaction(2)`.
///
/// # Errors
///
/// Returns the OS error when a disposition cannot be reset.
pub fn restore_child_dispositions() -> io::Result<()> {
    let default = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
    for signal in DEFERRED_SIGNALS {
        // SAFETY: installing SIG_DFL runs no code in the child.
        unsafe { sigaction(signal, &default) }.map_err(io::Error::from)?;
    }
    Ok(())
}
