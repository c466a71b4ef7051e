//! Join barrier for independently completing branches.
//!
//! A [`JoinBarrier`] hands out one [`Branch`] per outstanding piece of work
//! and a single [`JoinCompletion`]. Each branch arrives exactly once, by
//! finishing, failing, or being dropped. The arrival that brings the count to
//! zero resolves the completion. Branch order is irrelevant, and a failed
//! branch never cancels its siblings; it is only recorded in the outcome.
//!
//! ```rust
//! # async fn example() {
//! use fanctl_engine::join::JoinBarrier;
//!
//! let (branches, completion) = JoinBarrier::new(2);
//! for branch in branches {
//!     tokio::spawn(async move {
//!         // ... issue a backend call ...
//!         branch.finish();
//!     });
//! }
//! let outcome = completion.wait().await;
//! assert!(!outcome.failed());
//! # }
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Constructor for branch handles and their completion.
pub struct JoinBarrier;

impl JoinBarrier {
    /// Create a barrier that completes after `branches` arrivals.
    ///
    /// With zero branches the completion is already resolved.
    pub fn new(branches: usize) -> (Vec<Branch>, JoinCompletion) {
        let (tx, rx) = oneshot::channel();
        let shared = Arc::new(Shared {
            remaining: AtomicUsize::new(branches),
            fired: AtomicUsize::new(0),
            failures: Mutex::new(Vec::new()),
            done: Mutex::new(Some(tx)),
        });

        if branches == 0 {
            shared.fire();
        }

        let handles = (0..branches)
            .map(|index| Branch {
                shared: shared.clone(),
                index,
                arrived: false,
            })
            .collect();

        (handles, JoinCompletion { rx, shared })
    }
}

struct Shared {
    remaining: AtomicUsize,
    fired: AtomicUsize,
    failures: Mutex<Vec<String>>,
    done: Mutex<Option<oneshot::Sender<()>>>,
}

impl Shared {
    fn fire(&self) {
        self.fired.fetch_add(1, Ordering::AcqRel);
        let sender = self
            .done
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(tx) = sender {
            // The receiver may already be gone; nobody is waiting then.
            let _ = tx.send(());
        }
    }
}

/// One outstanding branch of a join.
pub struct Branch {
    shared: Arc<Shared>,
    index: usize,
    arrived: bool,
}

impl Branch {
    /// Position of this branch in creation order.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Arrive successfully.
    pub fn finish(mut self) {
        self.arrive(None);
    }

    /// Arrive and record a failure.
    pub fn fail(mut self, reason: impl Into<String>) {
        self.arrive(Some(reason.into()));
    }

    fn arrive(&mut self, failure: Option<String>) {
        if self.arrived {
            return;
        }
        self.arrived = true;

        if let Some(reason) = failure {
            debug!(branch = self.index, reason = %reason, "Join branch failed");
            self.shared
                .failures
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(reason);
        }

        if self.shared.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.shared.fire();
        }
    }
}

impl Drop for Branch {
    fn drop(&mut self) {
        if !self.arrived {
            warn!(branch = self.index, "Join branch dropped without arriving");
            let reason = format!("branch {} dropped without arriving", self.index);
            self.arrive(Some(reason));
        }
    }
}

/// Resolves once every branch has arrived.
pub struct JoinCompletion {
    rx: oneshot::Receiver<()>,
    shared: Arc<Shared>,
}

impl JoinCompletion {
    /// Wait for the last branch.
    pub async fn wait(self) -> JoinOutcome {
        // The sender lives in `shared`, which we hold, so this only returns
        // after `fire`.
        let _ = self.rx.await;
        let failures = std::mem::take(
            &mut *self
                .shared
                .failures
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        JoinOutcome { failures }
    }

    /// Number of times the completion has fired. Never exceeds one.
    pub fn fired_count(&self) -> usize {
        self.shared.fired.load(Ordering::Acquire)
    }

    /// Branches that have not arrived yet.
    pub fn remaining(&self) -> usize {
        self.shared.remaining.load(Ordering::Acquire)
    }
}

/// Result of a completed join.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinOutcome {
    /// Failure reasons in arrival order.
    pub failures: Vec<String>,
}

impl JoinOutcome {
    pub fn failed(&self) -> bool {
        !self.failures.is_empty()
    }
}
