use std::time::Duration;
use tokio::task::JoinHandle;
use crate::error::{Error, Result};
use tracing::{info, error, warn};

/// Task Supervisor - Owns the long-running loops of the process
///
/// ## Usage
/// ```ignore
/// let (tx, rx) = tokio::sync::watch::channel(false);
/// let mut supervisor = TaskSupervisor::new();
/// supervisor.spawn("poller", async move { poller.run(rx).await });
///
/// tokio::signal::ctrl_c().await?;
/// tx.send(true)?;
/// supervisor.join_all(Duration::from_secs(30)).await?;
/// ```
///
/// Tasks are expected to watch the shutdown channel themselves. `join_all`
/// waits for each one and only aborts a task that outlives the grace period.
pub struct TaskSupervisor {
    tasks: Vec<(String, JoinHandle<()>)>,
}

impl TaskSupervisor {
    pub fn new() -> Self {
        TaskSupervisor {
            tasks: Vec::new(),
        }
    }

    /// Spawn a new background task and register it for monitoring
    pub fn spawn<F>(&mut self, name: impl Into<String>, future: F) -> &mut Self
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        let handle = tokio::spawn(future);

        info!("Spawned background task: {}", name);
        self.tasks.push((name, handle));
        self
    }

    /// Errors if any task has already ended; loops should only end on shutdown.
    pub fn check_health(&self) -> Result<()> {
        let finished: Vec<&str> = self.tasks
            .iter()
            .filter(|(_, handle)| handle.is_finished())
            .map(|(name, _)| name.as_str())
            .collect();

        if finished.is_empty() {
            return Ok(());
        }

        let message = format!("Tasks terminated unexpectedly: {:?}", finished);
        error!("{}", message);
        Err(Error::TaskFailure(message))
    }

    pub fn active_task_count(&self) -> usize {
        self.tasks.iter().filter(|(_, handle)| !handle.is_finished()).count()
    }

    /// Waits for every task, giving each up to `grace` to finish.
    /// Reports the first task that panicked or had to be aborted.
    pub async fn join_all(&mut self, grace: Duration) -> Result<()> {
        info!("Waiting for {} background tasks", self.tasks.len());
        let mut first_failure = None;

        for (name, mut handle) in self.tasks.drain(..) {
            let failure = match tokio::time::timeout(grace, &mut handle).await {
                Ok(Ok(())) => {
                    info!("Task {} completed", name);
                    None
                }
                Ok(Err(e)) => Some(format!("Task {} failed: {}", name, e)),
                Err(_) => {
                    handle.abort();
                    Some(format!("Task {} did not stop within {:?}, aborted", name, grace))
                }
            };

            if let Some(message) = failure {
                warn!("{}", message);
                first_failure.get_or_insert(message);
            }
        }

        match first_failure {
            Some(message) => Err(Error::TaskFailure(message)),
            None => Ok(()),
        }
    }
}

impl Default for TaskSupervisor {
    fn default() -> Self {
        Self::new()
    }
}
