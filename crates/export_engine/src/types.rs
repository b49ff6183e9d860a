use std::fmt;
use std::path::PathBuf;

use export_core::TaskId;

/// Pipeline stage, used to label progress and failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Configure,
    Prepare,
    Submit,
    Poll,
    Download,
    Extract,
    Normalize,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Configure => "configuration",
            Stage::Prepare => "working directory preparation",
            Stage::Submit => "export submission",
            Stage::Poll => "export polling",
            Stage::Download => "archive download",
            Stage::Extract => "archive extraction",
            Stage::Normalize => "normalization",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Directory,
}

/// Observable side effects of a run, in the order they happen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportEvent {
    JobSubmitted {
        task_id: TaskId,
    },
    JobProgress {
        task_id: TaskId,
        poll: u32,
        pages_exported: u64,
    },
    JobCompleted {
        task_id: TaskId,
        pages_exported: u64,
    },
    DownloadStarted {
        declared_len: Option<u64>,
    },
    DownloadProgress {
        bytes: u64,
    },
    DownloadFinished {
        bytes: u64,
    },
    Extracted {
        files: usize,
    },
    Renamed {
        from: PathBuf,
        to: PathBuf,
        kind: NodeKind,
    },
    ReferencesRewritten {
        path: PathBuf,
        count: usize,
    },
    RewriteFailed {
        path: PathBuf,
        message: String,
    },
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ExportEvent);
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&self, _event: ExportEvent) {}
}

/// A downloaded archive on local disk. Single use: extraction consumes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveHandle {
    pub local_path: PathBuf,
    /// Bytes actually written.
    pub size_bytes: u64,
    /// Content-Length announced by the server, if any.
    pub declared_len: Option<u64>,
}
