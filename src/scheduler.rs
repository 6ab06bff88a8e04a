//! Delayed side effects that can be cancelled on shutdown.
//!
//! Every scheduled task is tracked until it has run, panicked or been
//! aborted, so `cancel_all` only ever sees work that is still pending.

use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tracing::{debug, info};
use uuid::Uuid;

type TaskRegistry = Arc<DashMap<Uuid, AbortHandle>>;

#[derive(Clone, Default)]
pub struct Scheduler {
    tasks: TaskRegistry,
}

/// Removes a task's registry entry when the task ends, however it ends
struct Deregister {
    tasks: TaskRegistry,
    id: Uuid,
}

impl Drop for Deregister {
    fn drop(&mut self) {
        self.tasks.remove(&self.id);
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` once after `delay`. Returns the id the task is tracked under.
    pub fn schedule_after<F>(&self, delay: Duration, label: &str, task: F) -> Uuid
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let id = Uuid::new_v4();
        let guard = Deregister {
            tasks: self.tasks.clone(),
            id,
        };
        let label_owned = label.to_string();
        // The task may not finish before it is registered
        let (registered_tx, registered_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let _guard = guard;
            let _ = registered_rx.await;
            tokio::time::sleep(delay).await;
            task.await;
            debug!("Scheduled task '{}' ({}) finished", label_owned, id);
        });

        self.tasks.insert(id, handle.abort_handle());
        let _ = registered_tx.send(());
        debug!("Scheduled task '{}' ({}) in {:?}", label, id, delay);
        id
    }

    /// Number of tasks that have not run yet
    pub fn pending_count(&self) -> usize {
        self.tasks.len()
    }

    /// Abort every pending task
    pub fn cancel_all(&self) {
        let ids: Vec<Uuid> = self.tasks.iter().map(|entry| *entry.key()).collect();
        let mut cancelled = 0;
        for id in ids {
            if let Some((_, abort)) = self.tasks.remove(&id) {
                abort.abort();
                cancelled += 1;
            }
        }
        if cancelled > 0 {
            info!("Cancelled {} pending scheduled tasks", cancelled);
        }
    }
}
