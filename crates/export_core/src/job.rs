use serde::Deserialize;

pub type TaskId = String;

/// One task entry as reported by the remote status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TaskSnapshot {
    pub id: TaskId,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatus {
    #[serde(default)]
    pub pages_exported: u64,
    #[serde(rename = "exportURL", default)]
    pub export_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobState {
    #[default]
    Pending,
    Success,
    Failed,
}

impl JobState {
    /// Maps the remote state string. Anything not terminal counts as pending.
    pub fn from_remote(state: Option<&str>) -> Self {
        match state {
            Some("success") => JobState::Success,
            Some("failure") | Some("failed") => JobState::Failed,
            _ => JobState::Pending,
        }
    }
}

/// Result of applying one poll response to a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    InProgress { pages_exported: u64 },
    Completed { download_url: String, pages_exported: u64 },
    Failed { reason: String },
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum JobError {
    #[error("status response is for task {actual}, expected {expected}")]
    TaskMismatch { expected: TaskId, actual: TaskId },
    #[error("task {0} reported success without an export url")]
    MissingDownloadUrl(TaskId),
    #[error("task {0} already reached a terminal state")]
    AlreadyTerminal(TaskId),
}

/// Client-side view of a remote export task.
///
/// Created on submission and mutated only by [`ExportJob::apply`]. Once the
/// state is `Success` or `Failed` the job accepts no further snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportJob {
    task_id: TaskId,
    state: JobState,
    pages_exported: u64,
    error: Option<String>,
    download_url: Option<String>,
}

impl ExportJob {
    pub fn new(task_id: impl Into<TaskId>) -> Self {
        Self {
            task_id: task_id.into(),
            state: JobState::Pending,
            pages_exported: 0,
            error: None,
            download_url: None,
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn pages_exported(&self) -> u64 {
        self.pages_exported
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn download_url(&self) -> Option<&str> {
        self.download_url.as_deref()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, JobState::Success | JobState::Failed)
    }

    /// Applies a status snapshot. An error field wins over any reported state.
    pub fn apply(&mut self, snapshot: &TaskSnapshot) -> Result<PollOutcome, JobError> {
        if snapshot.id != self.task_id {
            return Err(JobError::TaskMismatch {
                expected: self.task_id.clone(),
                actual: snapshot.id.clone(),
            });
        }
        if self.is_terminal() {
            return Err(JobError::AlreadyTerminal(self.task_id.clone()));
        }

        // An empty error string means no error.
        if let Some(reason) = snapshot
            .error
            .as_deref()
            .filter(|reason| !reason.trim().is_empty())
        {
            self.state = JobState::Failed;
            self.error = Some(reason.to_string());
            return Ok(PollOutcome::Failed {
                reason: reason.to_string(),
            });
        }

        let status = snapshot.status.clone().unwrap_or_default();
        self.pages_exported = status.pages_exported;

        match JobState::from_remote(snapshot.state.as_deref()) {
            JobState::Success => {
                let url = status
                    .export_url
                    .filter(|url| !url.trim().is_empty())
                    .ok_or_else(|| JobError::MissingDownloadUrl(self.task_id.clone()))?;
                self.state = JobState::Success;
                self.download_url = Some(url.clone());
                Ok(PollOutcome::Completed {
                    download_url: url,
                    pages_exported: self.pages_exported,
                })
            }
            JobState::Failed => {
                // Failure state without an error message.
                let reason = "export task reported failure".to_string();
                self.state = JobState::Failed;
                self.error = Some(reason.clone());
                Ok(PollOutcome::Failed { reason })
            }
            JobState::Pending => Ok(PollOutcome::InProgress {
                pages_exported: self.pages_exported,
            }),
        }
    }
}
