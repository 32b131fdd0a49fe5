//! Shutdown coordination for the service.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

/// Process lifecycle. Moves forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifecycleState {
    /// Accepting connections.
    Running,
    /// Listener closed, in-flight requests finishing.
    Draining,
    /// Done, either drained or forced.
    Terminated,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LifecycleState::Running => "running",
            LifecycleState::Draining => "draining",
            LifecycleState::Terminated => "terminated",
        })
    }
}

/// Coordinator for graceful shutdown.
///
/// Cloned into every task that needs to observe or drive the lifecycle.
/// Repeated triggers are ignored.
#[derive(Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<LifecycleState>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(LifecycleState::Running);
        Self { tx: Arc::new(tx) }
    }

    pub fn state(&self) -> LifecycleState {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.tx.subscribe()
    }

    /// Start draining. Returns `false` if shutdown was already under way.
    pub fn trigger(&self) -> bool {
        self.advance(LifecycleState::Draining)
    }

    /// Mark the process finished. Returns `false` if it already was.
    pub fn terminate(&self) -> bool {
        self.advance(LifecycleState::Terminated)
    }

    fn advance(&self, next: LifecycleState) -> bool {
        self.tx.send_if_modified(|state| {
            if *state < next {
                *state = next;
                true
            } else {
                false
            }
        })
    }

    /// Resolves once the lifecycle has left [`LifecycleState::Running`].
    pub async fn draining(&self) {
        let mut rx = self.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|state| *state != LifecycleState::Running).await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Shutdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shutdown")
            .field("state", &self.state())
            .finish()
    }
}
