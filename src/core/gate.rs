//! Readiness barrier for request dispatch.
//!
//! A gate resolved exactly once, after the bundler has started and the
//! route watcher has completed its bootstrap scan. Requests arriving
//! earlier block until it opens.

use parking_lot::{Condvar, Mutex};

/// One-shot readiness gate. `open()` is idempotent.
pub struct ReadyGate {
    open: Mutex<bool>,
    cvar: Condvar,
}

impl ReadyGate {
    pub fn new() -> Self {
        Self {
            open: Mutex::new(false),
            cvar: Condvar::new(),
        }
    }

    /// Open the gate, releasing all current and future waiters.
    pub fn open(&self) {
        let mut open = self.open.lock();
        if !*open {
            *open = true;
            self.cvar.notify_all();
        }
    }

    /// Block until the gate is open. Returns immediately once opened.
    pub fn wait(&self) {
        let mut open = self.open.lock();
        while !*open {
            self.cvar.wait(&mut open);
        }
    }

    pub fn is_open(&self) -> bool {
        *self.open.lock()
    }
}

impl Default for ReadyGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_open_releases_waiters() {
        let gate = Arc::new(ReadyGate::new());
        assert!(!gate.is_open());

        let waiter = {
            let gate = Arc::clone(&gate);
            std::thread::spawn(move || gate.wait())
        };

        std::thread::sleep(Duration::from_millis(20));
        gate.open();
        waiter.join().unwrap();
        assert!(gate.is_open());
    }

    #[test]
    fn test_open_is_idempotent() {
        let gate = ReadyGate::new();
        gate.open();
        gate.open();
        assert!(gate.is_open());
        // A wait after open returns immediately
        gate.wait();
    }
}
