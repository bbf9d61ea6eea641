//! Counting semaphore used by synchronous links.
//!
//! Each synchronous link owns two [`Gate`]s. The producer waits on the
//! input gate before publishing and releases the output gate afterwards;
//! the consumer does the opposite. Tearing a link down releases both, so
//! a thread blocked on either side always wakes.

use parking_lot::{Condvar, Mutex};

/// A counting semaphore built on a mutex and a condition variable.
pub(crate) struct Gate {
    permits: Mutex<usize>,
    cond: Condvar,
}

// Compile-time assertion: Gate is shared between producer and consumer threads.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<Gate>();
};

impl Gate {
    /// Create a gate holding `permits` initial permits.
    pub(crate) fn new(permits: usize) -> Self {
        Self {
            permits: Mutex::new(permits),
            cond: Condvar::new(),
        }
    }

    /// Take one permit, blocking until one is available.
    pub(crate) fn acquire(&self) {
        let mut permits = self.permits.lock();
        while *permits == 0 {
            self.cond.wait(&mut permits);
        }
        *permits -= 1;
    }

    /// Return one permit and wake one waiter.
    pub(crate) fn release(&self) {
        *self.permits.lock() += 1;
        self.cond.notify_one();
    }

    /// Permits currently available.
    pub(crate) fn available(&self) -> usize {
        *self.permits.lock()
    }
}

impl std::fmt::Debug for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gate")
            .field("permits", &self.available())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn permits_count_down_and_up() {
        let gate = Gate::new(2);
        gate.acquire();
        gate.acquire();
        assert_eq!(gate.available(), 0);
        gate.release();
        assert_eq!(gate.available(), 1);
    }

    #[test]
    fn acquire_blocks_until_release() {
        let gate = Arc::new(Gate::new(0));
        let (tx, rx) = crossbeam_channel::bounded(1);
        let waiter = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || {
                gate.acquire();
                tx.send(()).unwrap();
            })
        };
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
        gate.release();
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        waiter.join().unwrap();
        assert_eq!(gate.available(), 0);
    }
}
