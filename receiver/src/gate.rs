//! Reference-counted admission gate with graceful drain.
//!
//! A [`Gate`] hands out tickets to callers that are about to do work and
//! lets a single closer wait until every ticket handed out so far has been
//! returned. Unlike a `RwLock` held for the duration of a call, entering and
//! leaving never block and never contend on a mutex: both are one atomic
//! read-modify-write on a single word.
//!
//! The word packs the number of outstanding tickets in its low bits and a
//! closing flag in bit 62, so "N admitted, open" moves to "N admitted,
//! closing" in one `fetch_add`, and every later `leave` decrements the count
//! while the flag stays put.

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::oneshot;

/// Set once closing has been requested.
const CLOSING: u64 = 1 << 62;
const COUNT_MASK: u64 = CLOSING - 1;

pub struct Gate {
    state: AtomicU64,
    // Taken by whichever `leave` empties a closing gate.
    empty_tx: Mutex<Option<oneshot::Sender<()>>>,
    // Taken by `close`. A missing receiver means the gate was closed before.
    empty_rx: Mutex<Option<oneshot::Receiver<()>>>,
}

impl Gate {
    pub fn new() -> Self {
        let (tx, rx) = oneshot::channel();
        Self {
            state: AtomicU64::new(0),
            empty_tx: Mutex::new(Some(tx)),
            empty_rx: Mutex::new(Some(rx)),
        }
    }

    /// Attempts to take a ticket.
    ///
    /// Fails once closing has been requested. On success the caller owes
    /// exactly one [`Gate::leave`].
    pub fn try_enter(&self) -> bool {
        if self.state.load(Ordering::Acquire) >= CLOSING {
            return false;
        }

        let state = self.state.fetch_add(1, Ordering::AcqRel) + 1;
        if state >= CLOSING {
            // `close` landed between the load and the add. Hand the ticket
            // straight back so nobody is admitted past the close boundary.
            self.leave();
            return false;
        }

        true
    }

    /// Scoped form of [`Gate::try_enter`]: the ticket is returned when the
    /// guard is dropped, including on early return and future cancellation.
    pub fn enter(&self) -> Option<Ticket<'_>> {
        self.try_enter().then(|| Ticket { gate: self })
    }

    /// Returns a ticket obtained from a successful [`Gate::try_enter`].
    ///
    /// # Panics
    ///
    /// Panics if no ticket is outstanding.
    pub fn leave(&self) {
        let prev = self.state.fetch_sub(1, Ordering::AcqRel);
        assert!(
            prev & COUNT_MASK != 0,
            "Gate::leave called without a matching try_enter"
        );

        if prev - 1 == CLOSING {
            // A spurious admission undone by `try_enter` can empty the gate a
            // second time; only the first empty transition signals.
            if let Some(tx) = self.empty_tx.lock().take() {
                let _ = tx.send(());
            }
        }
    }

    /// Stops admitting new tickets and waits until every outstanding one
    /// has been returned.
    ///
    /// Resolves immediately when no ticket is outstanding. Must not be
    /// awaited from inside a call that itself holds a ticket of this gate.
    ///
    /// # Panics
    ///
    /// Panics if called more than once on the same gate, even if the first
    /// call was cancelled before it resolved.
    pub async fn close(&self) {
        let Some(empty_rx) = self.empty_rx.lock().take() else {
            panic!("Gate::close called twice");
        };

        let state = self.state.fetch_add(CLOSING, Ordering::AcqRel) + CLOSING;
        if state == CLOSING {
            return;
        }

        // The sender lives as long as the gate, so this only resolves once
        // the last ticket has been returned.
        let _ = empty_rx.await;
    }

    /// Number of tickets currently held.
    pub fn outstanding(&self) -> u64 {
        self.state.load(Ordering::Acquire) & COUNT_MASK
    }

    pub fn is_closing(&self) -> bool {
        self.state.load(Ordering::Acquire) >= CLOSING
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gate")
            .field("outstanding", &self.outstanding())
            .field("closing", &self.is_closing())
            .finish()
    }
}

/// RAII guard for one admitted ticket.
///
/// Invariants:
/// - A ticket is created only after `try_enter` succeeded
/// - The ticket is returned exactly once, on Drop
#[derive(Debug)]
pub struct Ticket<'a> {
    gate: &'a Gate,
}

impl Drop for Ticket<'_> {
    fn drop(&mut self) {
        self.gate.leave();
    }
}
