//! Transition gate: masks the view while auth state changes.
//!
//! SYSTEM CONTEXT
//! ==============
//! The auth store opens the gate before it navigates after a sign-in or
//! sign-out and closes it once the next view reports ready. Front ends
//! subscribe to visibility and draw their overlay from it.
//!
//! The gate is `idle -> transitioning -> idle`. Each `begin` issues a
//! ticket with a new generation; only the ticket of the latest generation
//! can close the gate, and a ticket that is dropped without `complete`
//! closes it as if completed.

#[cfg(test)]
#[path = "transition_test.rs"]
mod transition_test;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;

#[derive(Clone)]
pub struct TransitionGate {
    inner: Arc<GateInner>,
}

struct GateInner {
    /// Generation of the most recent `begin`. Only read or bumped while the
    /// visibility channel's lock is held.
    generation: AtomicU64,
    visible: watch::Sender<bool>,
}

impl Default for TransitionGate {
    fn default() -> Self {
        Self::new()
    }
}

impl TransitionGate {
    #[must_use]
    pub fn new() -> Self {
        Self { inner: Arc::new(GateInner { generation: AtomicU64::new(0), visible: watch::Sender::new(false) }) }
    }

    /// Show the gate and supersede any ticket still outstanding.
    #[must_use = "dropping the ticket ends the transition immediately"]
    pub fn begin(&self) -> TransitionTicket {
        let mut generation = 0;
        self.inner.visible.send_modify(|visible| {
            generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *visible = true;
        });
        tracing::trace!(generation, "transition begin");
        TransitionTicket { inner: Arc::clone(&self.inner), generation, finished: false }
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        *self.inner.visible.borrow()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.visible.subscribe()
    }
}

/// Handle to one transition. Completing or dropping it hides the gate unless
/// a newer transition has begun since.
pub struct TransitionTicket {
    inner: Arc<GateInner>,
    generation: u64,
    finished: bool,
}

impl TransitionTicket {
    /// Whether no newer transition has begun.
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.inner.generation.load(Ordering::SeqCst) == self.generation
    }

    /// End the transition. Returns `false` when the ticket was stale and the
    /// gate was left alone.
    pub fn complete(mut self) -> bool {
        self.finish()
    }

    fn finish(&mut self) -> bool {
        if self.finished {
            return false;
        }
        self.finished = true;
        let generation = self.generation;
        let ended = self.inner.visible.send_if_modified(|visible| {
            if self.inner.generation.load(Ordering::SeqCst) != generation || !*visible {
                return false;
            }
            *visible = false;
            true
        });
        if !ended {
            tracing::trace!(generation, "stale transition ticket ignored");
        }
        ended
    }
}

impl Drop for TransitionTicket {
    fn drop(&mut self) {
        self.finish();
    }
}
