//! Background execution for call detection.
//!
//! Keeps detection alive when the app is not in the foreground. The task body
//! handed to the executor is the monitor's detection start; stopping the
//! service stops the executor first and then releases the detection handle.

use crate::detection::CallMonitor;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Notification icon shown while the task runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskIcon {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Configuration of the long-running task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackgroundTaskOptions {
    pub task_name: String,
    pub task_title: String,
    pub task_description: String,
    pub icon: TaskIcon,
    /// Heartbeat period in milliseconds
    pub delay_ms: u64,
}

impl BackgroundTaskOptions {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms.max(1))
    }
}

impl Default for BackgroundTaskOptions {
    fn default() -> Self {
        Self {
            task_name: "CallDetection".to_string(),
            task_title: "Call detection".to_string(),
            task_description: "Watching for incoming calls".to_string(),
            icon: TaskIcon {
                name: "ic_launcher".to_string(),
                kind: "mipmap".to_string(),
            },
            delay_ms: 1000,
        }
    }
}

/// Task body run by a [`BackgroundExecutor`]
pub type BackgroundTask = Pin<Box<dyn Future<Output = Result<()>> + Send + 'static>>;

/// Platform background-execution service
#[async_trait]
pub trait BackgroundExecutor: Send + Sync {
    /// Run `task` and keep the process alive until [`BackgroundExecutor::stop`]
    async fn start(&self, options: &BackgroundTaskOptions, task: BackgroundTask) -> Result<()>;

    async fn stop(&self) -> Result<()>;

    fn is_running(&self) -> bool;
}

/// Executor running the task on the tokio runtime
#[derive(Debug, Default)]
pub struct TokioBackgroundExecutor {
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl TokioBackgroundExecutor {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BackgroundExecutor for TokioBackgroundExecutor {
    async fn start(&self, options: &BackgroundTaskOptions, task: BackgroundTask) -> Result<()> {
        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if worker.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return Err(Error::Background {
                reason: format!("task {} is already running", options.task_name),
            });
        }

        let name = options.task_name.clone();
        let delay = options.delay();
        info!("Starting background task {} ({})", name, options.task_title);

        *worker = Some(tokio::spawn(async move {
            if let Err(e) = task.await {
                warn!("Background task {} failed: {}", name, e);
                return;
            }

            let mut heartbeat = tokio::time::interval(delay);
            loop {
                heartbeat.tick().await;
                debug!("Background task {} alive", name);
            }
        }));

        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(handle) = worker {
            handle.abort();
            match handle.await {
                Err(e) if !e.is_cancelled() => {
                    return Err(Error::Background {
                        reason: e.to_string(),
                    })
                }
                _ => info!("Background task stopped"),
            }
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

/// Runs call detection inside a background task
pub struct BackgroundService {
    executor: Arc<dyn BackgroundExecutor>,
    monitor: Arc<tokio::sync::Mutex<CallMonitor>>,
    options: BackgroundTaskOptions,
}

impl BackgroundService {
    pub fn new(
        executor: Arc<dyn BackgroundExecutor>,
        monitor: Arc<tokio::sync::Mutex<CallMonitor>>,
        options: BackgroundTaskOptions,
    ) -> Self {
        Self {
            executor,
            monitor,
            options,
        }
    }

    pub fn options(&self) -> &BackgroundTaskOptions {
        &self.options
    }

    pub fn is_running(&self) -> bool {
        self.executor.is_running()
    }

    /// Start the background task and wait until detection is registered
    ///
    /// A registration failure stops the task again and is returned.
    pub async fn start(&self) -> Result<()> {
        let (ready_tx, ready_rx) = oneshot::channel();
        let monitor = Arc::clone(&self.monitor);

        let task: BackgroundTask = Box::pin(async move {
            let started = monitor.lock().await.start().await;
            match started {
                Ok(()) => {
                    let _ = ready_tx.send(Ok(()));
                    Ok(())
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    Err(Error::Background {
                        reason: "call detection did not start".to_string(),
                    })
                }
            }
        });

        self.executor.start(&self.options, task).await?;

        match ready_rx.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                if let Err(stop_error) = self.executor.stop().await {
                    warn!("Background task could not be stopped: {}", stop_error);
                }
                Err(e)
            }
            Err(_) => Err(Error::Background {
                reason: "background task ended before detection started".to_string(),
            }),
        }
    }

    /// Stop the background task, then release the detection handle
    ///
    /// The handle is released even when the executor fails to stop; the
    /// executor error is returned afterwards.
    pub async fn stop(&self) -> Result<()> {
        let stopped = self.executor.stop().await;
        self.monitor.lock().await.stop();
        stopped
    }
}
