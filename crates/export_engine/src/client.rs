use std::sync::Arc;
use std::time::Duration;

use engine_logging::{engine_debug, engine_error, engine_info};
use export_core::{ExportJob, PollOutcome, TaskId};
use tokio_util::sync::CancellationToken;

use crate::api::{ExportRequest, HttpTaskApi, TaskApi};
use crate::config::{ExportConfig, ExportOptions};
use crate::{ExportEvent, ProgressSink};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected response: {0}")]
    RemoteRejected(String),
    #[error("export failed with reason: {reason}")]
    ExportFailed { reason: String },
    #[error("export did not finish within {waited:?}")]
    Timeout { waited: Duration },
    #[error("cancelled")]
    Cancelled,
    #[error("{0} contains characters not allowed in a request header")]
    InvalidHeader(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    /// `None` polls until the job reaches a terminal state.
    pub max_wait: Option<Duration>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_wait: None,
        }
    }
}

/// Suspends the poll loop between status queries.
#[async_trait::async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait::async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Submits export jobs and waits for them to finish.
pub struct ExportClient {
    api: Arc<dyn TaskApi>,
    sleeper: Arc<dyn Sleeper>,
    poll: PollSettings,
}

impl ExportClient {
    pub fn new(api: Arc<dyn TaskApi>, sleeper: Arc<dyn Sleeper>, poll: PollSettings) -> Self {
        Self { api, sleeper, poll }
    }

    /// HTTP transport and real sleeps, configured from `config`.
    pub fn from_config(config: &ExportConfig) -> Result<Self, ClientError> {
        let api = HttpTaskApi::new(config)?;
        Ok(Self::new(
            Arc::new(api),
            Arc::new(TokioSleeper),
            config.poll.clone(),
        ))
    }

    pub async fn submit_export(
        &self,
        space_id: &str,
        options: &ExportOptions,
        sink: &dyn ProgressSink,
    ) -> Result<TaskId, ClientError> {
        let request = ExportRequest {
            space_id: space_id.to_string(),
            options: options.clone(),
        };
        let task_id = self.api.enqueue_export(&request).await?;
        engine_info!("Started export as task [{}]", task_id);
        sink.emit(ExportEvent::JobSubmitted {
            task_id: task_id.clone(),
        });
        Ok(task_id)
    }

    /// Polls every `interval` until the task succeeds, returning its download url.
    ///
    /// A task error ends the loop immediately with [`ClientError::ExportFailed`].
    pub async fn await_completion(
        &self,
        task_id: &str,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<String, ClientError> {
        let mut job = ExportJob::new(task_id);
        let task_ids = vec![task_id.to_string()];
        let mut waited = Duration::ZERO;
        let mut poll = 0u32;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ClientError::Cancelled),
                _ = self.sleeper.sleep(self.poll.interval) => {}
            }
            waited += self.poll.interval;
            poll += 1;

            let tasks = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ClientError::Cancelled),
                tasks = self.api.get_tasks(&task_ids) => tasks?,
            };
            let snapshot = tasks
                .into_iter()
                .find(|task| task.id == task_id)
                .ok_or_else(|| {
                    ClientError::RemoteRejected(format!("status response has no task {task_id}"))
                })?;

            let outcome = job
                .apply(&snapshot)
                .map_err(|err| ClientError::RemoteRejected(err.to_string()))?;

            match outcome {
                PollOutcome::Failed { reason } => {
                    engine_error!("Export task [{}] failed: {}", task_id, reason);
                    return Err(ClientError::ExportFailed { reason });
                }
                PollOutcome::InProgress { pages_exported } => {
                    engine_debug!("Poll {} for task [{}]: still running", poll, task_id);
                    sink.emit(ExportEvent::JobProgress {
                        task_id: task_id.to_string(),
                        poll,
                        pages_exported,
                    });
                }
                PollOutcome::Completed {
                    download_url,
                    pages_exported,
                } => {
                    sink.emit(ExportEvent::JobProgress {
                        task_id: task_id.to_string(),
                        poll,
                        pages_exported,
                    });
                    sink.emit(ExportEvent::JobCompleted {
                        task_id: task_id.to_string(),
                        pages_exported,
                    });
                    return Ok(download_url);
                }
            }

            if let Some(max_wait) = self.poll.max_wait {
                if waited >= max_wait {
                    return Err(ClientError::Timeout { waited });
                }
            }
        }
    }
}
