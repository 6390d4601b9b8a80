//! Deferred handling of interrupt and stop signals while colour is active.
//!
//! A watcher thread only records what arrived; the listing loop calls
//! [`SignalGuard::drain`] at safe points so the terminal is never left in a
//! coloured state.

use std::io::{self, Write};
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use signal_hook::consts::{
    SIGALRM, SIGHUP, SIGINT, SIGPROF, SIGQUIT, SIGTERM, SIGTSTP, SIGVTALRM, SIGXCPU, SIGXFSZ,
};
use signal_hook::iterator::Signals;
use signal_hook::low_level::emulate_default_handler;
use tracing::debug;

use crate::color::RESET;

/// Signals that end the program once output is restored.
pub const INTERRUPT_SIGNALS: [i32; 9] = [
    SIGALRM, SIGHUP, SIGINT, SIGPROF, SIGQUIT, SIGTERM, SIGVTALRM, SIGXCPU, SIGXFSZ,
];

#[derive(Debug, Default)]
struct Pending {
    /// First interrupt received, zero if none.
    interrupt: AtomicI32,
    stops: AtomicUsize,
}

/// Records signals on a background thread until drained.
#[derive(Debug)]
pub struct SignalGuard {
    pending: Arc<Pending>,
}

impl SignalGuard {
    pub fn install() -> io::Result<Self> {
        let mut signals = Signals::new(INTERRUPT_SIGNALS.iter().chain(std::iter::once(&SIGTSTP)))?;
        let pending = Arc::new(Pending::default());
        let watcher = Arc::clone(&pending);
        thread::Builder::new()
            .name("lsgrid-signals".into())
            .spawn(move || {
                for sig in signals.forever() {
                    if sig == SIGTSTP {
                        watcher.stops.fetch_add(1, Ordering::SeqCst);
                    } else {
                        let _ = watcher
                            .interrupt
                            .compare_exchange(0, sig, Ordering::SeqCst, Ordering::SeqCst);
                    }
                }
            })?;
        Ok(SignalGuard { pending })
    }

    pub fn is_pending(&self) -> bool {
        self.pending.interrupt.load(Ordering::SeqCst) != 0
            || self.pending.stops.load(Ordering::SeqCst) != 0
    }

    /// Restore the terminal and act on any recorded signals.
    ///
    /// Stops suspend the process and return here on resume; an interrupt
    /// terminates it with the signal's default action.
    pub fn drain(&self, out: &mut dyn Write) -> io::Result<()> {
        if !self.is_pending() {
            return Ok(());
        }
        out.write_all(RESET.as_bytes())?;
        out.flush()?;

        let stops = self.pending.stops.swap(0, Ordering::SeqCst);
        for _ in 0..stops {
            debug!("replaying stop signal");
            emulate_default_handler(SIGTSTP)?;
        }

        let sig = self.pending.interrupt.swap(0, Ordering::SeqCst);
        if sig != 0 {
            debug!(sig, "re-delivering interrupt");
            emulate_default_handler(sig)?;
        }
        Ok(())
    }
}
