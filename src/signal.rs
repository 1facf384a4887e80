//! Cooperative shutdown signalling for the subscriber loop.
//!
//! The actual OS-level handler only sets two atomics — signal numbers are
//! stored instead of dispatched through a channel, since the subscriber loop
//! already polls on a short interval and has no need of a background thread.
//! [`SignalGuard`] additionally remembers whatever handler was previously
//! installed for `SIGTERM`/`SIGINT`, so it can be restored — and, if it fired
//! during the guard's lifetime, re-raised — once the loop exits.

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);
static FIRED_SIGNAL: AtomicI32 = AtomicI32::new(0);

/// Async-signal-safe: stores the signal number and flips the shutdown flag.
extern "C" fn handler(sig: libc::c_int) {
    FIRED_SIGNAL.store(sig, Ordering::SeqCst);
    SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
}

/// Installs handlers for `SIGTERM` and `SIGINT` for the lifetime of the
/// guard, restoring (and forwarding, if fired) whatever was there before.
pub struct SignalGuard {
    prev_term: libc::sigaction,
    prev_int: libc::sigaction,
}

impl SignalGuard {
    pub fn install() -> std::io::Result<Self> {
        SHUTDOWN_REQUESTED.store(false, Ordering::SeqCst);
        FIRED_SIGNAL.store(0, Ordering::SeqCst);

        let mut sa: libc::sigaction = unsafe { std::mem::zeroed() };
        sa.sa_sigaction = handler as *const () as libc::sighandler_t;
        sa.sa_flags = libc::SA_RESTART;
        unsafe { libc::sigemptyset(&mut sa.sa_mask) };

        let mut prev_term: libc::sigaction = unsafe { std::mem::zeroed() };
        // SAFETY: `sa` is a fully initialized sigaction with an
        // async-signal-safe handler; `prev_term`/`prev_int` are valid
        // out-pointers sized for `sigaction(2)`.
        if unsafe { libc::sigaction(libc::SIGTERM, &sa, &mut prev_term) } != 0 {
            return Err(std::io::Error::last_os_error());
        }

        let mut prev_int: libc::sigaction = unsafe { std::mem::zeroed() };
        if unsafe { libc::sigaction(libc::SIGINT, &sa, &mut prev_int) } != 0 {
            let err = std::io::Error::last_os_error();
            unsafe { libc::sigaction(libc::SIGTERM, &prev_term, std::ptr::null_mut()) };
            return Err(err);
        }

        Ok(Self { prev_term, prev_int })
    }

    pub fn shutdown_requested(&self) -> bool {
        SHUTDOWN_REQUESTED.load(Ordering::SeqCst)
    }

    /// Restores the previously installed handlers. If `SIGTERM`/`SIGINT`
    /// fired while this guard was active, re-raises it once the original
    /// disposition is back in place.
    pub fn restore_and_forward(self) {
        let fired = FIRED_SIGNAL.load(Ordering::SeqCst);
        unsafe {
            libc::sigaction(libc::SIGTERM, &self.prev_term, std::ptr::null_mut());
            libc::sigaction(libc::SIGINT, &self.prev_int, std::ptr::null_mut());
        }
        if fired != 0 {
            unsafe {
                libc::raise(fired);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_and_restore_round_trips_without_error() {
        let guard = SignalGuard::install().unwrap();
        assert!(!guard.shutdown_requested());
        guard.restore_and_forward();
    }

    #[test]
    fn sigint_sets_shutdown_requested() {
        let guard = SignalGuard::install().unwrap();
        unsafe {
            libc::raise(libc::SIGINT);
        }
        assert!(guard.shutdown_requested());
        // No previous handler was installed for this test process, so
        // forwarding SIGINT here would just re-raise with the default
        // disposition (terminate). Drop the guard's handlers without forwarding.
        let _ = guard;
    }
}
