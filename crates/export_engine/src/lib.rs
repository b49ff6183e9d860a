//! Export engine: task API client, archive download and tree normalization.
mod api;
mod client;
mod config;
mod extract;
mod fetch;
mod normalize;
mod persist;
mod pipeline;
mod rewrite;
mod types;

pub use api::{ExportRequest, HttpTaskApi, TaskApi};
pub use client::{ClientError, ExportClient, PollSettings, Sleeper, TokioSleeper};
pub use config::{
    ConfigError, Credentials, ExportConfig, ExportFormat, ExportOptions, DEFAULT_API_BASE,
    DEFAULT_ARCHIVE_NAME, DEFAULT_WORKING_DIR,
};
pub use extract::{extract_archive, ExtractError};
pub use fetch::{ArchiveFetcher, FailureKind, FetchError, FetchSettings, ReqwestArchiveFetcher};
pub use normalize::{
    normalize_tree, post_order, prepare_export_root, NormalizeError, NormalizeSummary, PlannedNode,
};
pub use persist::{reset_working_dir, AtomicFileWriter, PersistError};
pub use pipeline::{Pipeline, PipelineError, PipelineSummary};
pub use rewrite::{rewrite_references, RewriteError};
pub use types::{ArchiveHandle, ExportEvent, NodeKind, NullSink, ProgressSink, Stage};
