//! Turns termination signals into a stop request.
//!
//! With the default dispositions SIGINT/SIGTERM/SIGHUP kill the process
//! before destructors run, which would leak the run lock. Registering flags
//! with `signal-hook` instead lets the run loop notice the request, finish the
//! directory it is working on, and unwind so the lock guard is dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use signal_hook::consts::{SIGINT, SIGTERM};

use crate::logging::Logger;

/// Shared stop flag polled by the run loop.
#[derive(Clone, Debug, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    /// A flag that is only set programmatically.
    pub fn new() -> Self {
        Self::default()
    }

    /// A flag that is also set by SIGINT, SIGTERM and (on Unix) SIGHUP.
    ///
    /// Registration is best-effort; failures are reported and the run goes on.
    pub fn with_os_signals(log: Logger) -> Self {
        let stop = Self::new();

        let mut signals = vec![("SIGINT", SIGINT), ("SIGTERM", SIGTERM)];
        #[cfg(unix)]
        signals.push(("SIGHUP", signal_hook::consts::SIGHUP));

        for (name, signal) in signals {
            if let Err(err) = signal_hook::flag::register(signal, Arc::clone(&stop.flag)) {
                log.error(format!("failed to register {name} handler: {err}"));
            }
        }

        stop
    }

    /// Whether a stop has been requested.
    pub fn requested(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Request a stop.
    pub fn request(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_is_visible_to_clones() {
        let stop = StopSignal::new();
        let observer = stop.clone();
        assert!(!observer.requested());

        stop.request();
        assert!(observer.requested());
    }
}
