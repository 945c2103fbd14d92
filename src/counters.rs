use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::models::Id;
use crate::repo::{Counter, CounterRepo};

/// Issues denormalized counter updates after a primary write has committed.
///
/// Each update runs on its own task; the caller never waits for it and a failure is only
/// logged. The increment itself is atomic in the repository, so concurrent bumps do not
/// lose updates.
#[derive(Clone)]
pub struct CounterDispatcher {
    repo: Arc<dyn CounterRepo>,
}

impl CounterDispatcher {
    pub fn new(repo: Arc<dyn CounterRepo>) -> Self {
        Self { repo }
    }

    pub fn bump(&self, counter: Counter, id: Id) -> Option<JoinHandle<()>> {
        self.dispatch(counter, id, 1)
    }

    /// Returns the spawned task's handle, or `None` when called outside a tokio runtime.
    pub fn dispatch(&self, counter: Counter, id: Id, delta: i32) -> Option<JoinHandle<()>> {
        let Ok(handle) = Handle::try_current() else {
            warn!(?counter, id, "no runtime, counter update dropped");
            return None;
        };
        let repo = self.repo.clone();
        Some(handle.spawn(async move {
            match repo.increment(counter, id, delta).await {
                Ok(()) => debug!(?counter, id, delta, "counter updated"),
                Err(e) => warn!(?counter, id, delta, "counter update failed: {e}"),
            }
        }))
    }
}
