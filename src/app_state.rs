//! Shared state injected into the host-process handlers.

use crate::persistence::SnapshotFiles;
use crate::poller::Liveness;

/// Read-only view the host process keeps of the background poller.
///
/// The poller and the handlers share nothing mutable: handlers read the
/// snapshot files the poller writes and look at whether its task is
/// still alive. The task handle itself stays with `main`, which joins it
/// on shutdown.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Latest-snapshot files, if a data directory is configured.
    pub snapshots: Option<SnapshotFiles>,
    /// Liveness of the background poller task.
    pub poller: Liveness,
}

impl AppState {
    /// `true` while the poller task has not finished.
    #[must_use]
    pub fn poller_running(&self) -> bool {
        self.poller.is_running()
    }
}
