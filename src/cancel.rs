//! Process-wide cancellation (§4.10, §5).
//!
//! Exactly one cross-thread interaction exists in this crate: a background
//! thread, or the process's own SIGINT/SIGTERM handler, calls
//! [`CancellationToken::stop`], a relaxed atomic store. Every inner-solver
//! iteration polls [`CancellationToken::is_stopped`] (acquire ordering) at
//! the top of the loop; between polls cancellation is deferred, and there is
//! no rollback — the solver simply returns the current iterate with
//! `SolverStatus::Interrupted`.
//!
//! Installing an OS signal handler is process-global state, so it is
//! encapsulated behind an RAII guard ([`SignalGuard`]) that enforces
//! one-at-a-time attachment rather than exposing a bare `install()` free
//! function.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

/// A cheap, `Clone`-able, wait-free stop flag shared between a solver and
/// whichever thread (or signal handler) decides to cancel it.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Idempotent, wait-free, safe to call from a signal handler.
    pub fn stop(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Polled once per iteration at the top of every inner-solver loop.
    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    pub fn reset(&self) {
        self.flag.store(false, Ordering::Relaxed);
    }
}

static SIGNAL_SLOT: OnceLock<Mutex<Option<CancellationToken>>> = OnceLock::new();

fn signal_slot() -> &'static Mutex<Option<CancellationToken>> {
    SIGNAL_SLOT.get_or_init(|| Mutex::new(None))
}

extern "C" fn on_signal(_signum: libc::c_int) {
    if let Ok(guard) = signal_slot().lock() {
        if let Some(token) = guard.as_ref() {
            token.stop();
        }
    }
}

/// RAII guard installing `token` as the target of SIGINT/SIGTERM for as long
/// as the guard is alive. Only one guard may be installed at a time; a
/// second call to [`SignalGuard::install`] while one is live returns `None`.
pub struct SignalGuard {
    previous_sigint: libc::sighandler_t,
    previous_sigterm: libc::sighandler_t,
}

impl SignalGuard {
    /// Installs `token` as the process-wide cancellation target. Returns
    /// `None` if a guard is already installed.
    pub fn install(token: CancellationToken) -> Option<Self> {
        let mut slot = signal_slot().lock().ok()?;
        if slot.is_some() {
            return None;
        }
        *slot = Some(token);
        drop(slot);

        // SAFETY: `on_signal` only touches the mutex-guarded slot and a
        // relaxed atomic store, both signal-safe operations.
        let previous_sigint = unsafe { libc::signal(libc::SIGINT, on_signal as libc::sighandler_t) };
        let previous_sigterm =
            unsafe { libc::signal(libc::SIGTERM, on_signal as libc::sighandler_t) };

        Some(SignalGuard {
            previous_sigint,
            previous_sigterm,
        })
    }
}

impl Drop for SignalGuard {
    fn drop(&mut self) {
        unsafe {
            libc::signal(libc::SIGINT, self.previous_sigint);
            libc::signal(libc::SIGTERM, self.previous_sigterm);
        }
        if let Ok(mut slot) = signal_slot().lock() {
            *slot = None;
        }
    }
}
