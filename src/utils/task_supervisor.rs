use tokio::task::JoinHandle;
use std::collections::HashMap;
use std::time::Duration;
use crate::error::{Error, Result};
use tracing::{info, error, warn};

/// Task Supervisor - Tracks the service's long-running tasks
///
/// ## Purpose
/// Owns the join handles of the poll loop and the HTTP server and drains
/// them on shutdown.
///
/// ## Usage
/// ```rust,ignore
/// let mut supervisor = TaskSupervisor::new();
///
/// supervisor.spawn("poll_loop", poll_loop.run(shutdown_rx));
///
/// supervisor.join_all(Duration::from_secs(5)).await?;
/// ```
pub struct TaskSupervisor {
    tasks: HashMap<String, JoinHandle<Result<()>>>,
}

impl TaskSupervisor {
    pub fn new() -> Self {
        TaskSupervisor {
            tasks: HashMap::new(),
        }
    }

    /// Spawn a new background task and register it for monitoring
    pub fn spawn<F>(&mut self, name: impl Into<String>, future: F) -> &mut Self
    where
        F: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        let name = name.into();
        let handle = tokio::spawn(future);

        info!("Spawned background task: {}", name);
        self.tasks.insert(name, handle);
        self
    }

    /// Get count of active tasks
    pub fn active_task_count(&self) -> usize {
        self.tasks.values().filter(|handle| !handle.is_finished()).count()
    }

    /// Wait up to `grace` for every task, aborting the stragglers.
    ///
    /// Returns the first task error encountered, if any.
    pub async fn join_all(&mut self, grace: Duration) -> Result<()> {
        info!(
            "Waiting for {} background tasks ({} still running)",
            self.tasks.len(),
            self.active_task_count()
        );
        let mut first_error = None;

        for (name, mut handle) in self.tasks.drain() {
            let outcome = match tokio::time::timeout(grace, &mut handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    warn!("Task {} did not stop within {:?}, aborting", name, grace);
                    handle.abort();
                    continue;
                }
            };

            match outcome {
                Ok(Ok(())) => info!("Task {} completed", name),
                Ok(Err(e)) => {
                    warn!("Task {} ended with error: {}", name, e);
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    error!("Task {} panicked or was cancelled: {}", name, e);
                    first_error.get_or_insert(Error::TaskFailure(format!("{}: {}", name, e)));
                }
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Abort all tasks immediately
    pub fn shutdown_all(&mut self) {
        info!("Shutting down {} background tasks", self.tasks.len());

        for (name, handle) in self.tasks.drain() {
            handle.abort();
            info!("Aborted task: {}", name);
        }
    }
}

impl Default for TaskSupervisor {
    fn default() -> Self {
        Self::new()
    }
}
