//! One-shot cross-thread latch.
//!
//! A latch starts closed and can be opened exactly once. Any number
//! of threads can block on the `Waiter` side and all of them resume
//! once the `Trigger` side opens the latch. Opening consumes the
//! trigger so the latch cannot be re-armed.

use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

struct Shared {
    open: Mutex<bool>,
    condvar: Condvar,
}

/// Side of the latch capable of opening it.
pub struct Trigger(Arc<Shared>);

/// Side of the latch capable of blocking until it is opened.
#[derive(Clone)]
pub struct Waiter(Arc<Shared>);

impl Trigger {
    /// Opens the latch and resumes all threads blocked in a `wait()`
    /// call.
    pub fn open(self) {
        let mut open = self.0.open.lock().unwrap();
        *open = true;
        self.0.condvar.notify_all();
    }
}

impl Waiter {
    /// Blocks the current thread until the latch is opened.
    pub fn wait(&self) {
        let mut open = self.0.open.lock().unwrap();
        while !*open {
            open = self.0.condvar.wait(open).unwrap();
        }
    }

    /// Blocks the current thread until the latch is opened or the
    /// timeout elapses. Returns whether the latch was open when the
    /// call returned.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut open = self.0.open.lock().unwrap();
        while !*open {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self.0.condvar.wait_timeout(open, deadline - now).unwrap();
            open = guard;
        }
        true
    }

    /// Returns whether the latch has already been opened.
    pub fn is_open(&self) -> bool {
        *self.0.open.lock().unwrap()
    }
}

/// Creates a new latch and returns its `Trigger` and `Waiter` sides.
/// The `Waiter` can be cloned to let several threads block on the
/// same latch.
pub fn latch() -> (Trigger, Waiter) {
    let shared = Arc::new(Shared {
        open: Mutex::new(false),
        condvar: Condvar::new(),
    });
    (Trigger(shared.clone()), Waiter(shared))
}
