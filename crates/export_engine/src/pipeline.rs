use std::sync::Arc;

use engine_logging::{engine_info, engine_warn};
use export_core::TaskId;
use tokio_util::sync::CancellationToken;

use crate::client::{ClientError, ExportClient};
use crate::config::{ConfigError, ExportConfig};
use crate::extract::{extract_archive, ExtractError};
use crate::fetch::{ArchiveFetcher, FetchError, ReqwestArchiveFetcher};
use crate::normalize::{normalize_tree, NormalizeError, NormalizeSummary};
use crate::persist::{reset_working_dir, PersistError};
use crate::{ArchiveHandle, ExportEvent, ProgressSink, Stage};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("configuration failed: {0}")]
    Config(#[from] ConfigError),
    #[error("preparing working directory failed: {0}")]
    Prepare(#[source] PersistError),
    #[error("export submission failed: {0}")]
    Submit(#[source] ClientError),
    #[error("export polling failed: {0}")]
    Poll(#[source] ClientError),
    #[error("archive download failed: {0}")]
    Download(#[source] FetchError),
    #[error("archive extraction failed: {0}")]
    Extract(#[source] ExtractError),
    #[error("normalization failed: {0}")]
    Normalize(#[source] NormalizeError),
    #[error("{stage} task did not complete: {message}")]
    Background { stage: Stage, message: String },
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Config(_) => Stage::Configure,
            PipelineError::Prepare(_) => Stage::Prepare,
            PipelineError::Submit(_) => Stage::Submit,
            PipelineError::Poll(_) => Stage::Poll,
            PipelineError::Download(_) => Stage::Download,
            PipelineError::Extract(_) => Stage::Extract,
            PipelineError::Normalize(_) => Stage::Normalize,
            PipelineError::Background { stage, .. } => *stage,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        match self {
            PipelineError::Submit(err) | PipelineError::Poll(err) => {
                *err == ClientError::Cancelled
            }
            PipelineError::Download(err) => err.kind == crate::FailureKind::Cancelled,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSummary {
    pub task_id: TaskId,
    pub archive: ArchiveHandle,
    pub extracted_files: usize,
    pub normalize: NormalizeSummary,
}

/// One full export run: prepare, submit, wait, download, extract, normalize.
pub struct Pipeline {
    config: ExportConfig,
    client: ExportClient,
    fetcher: Arc<dyn ArchiveFetcher>,
}

impl Pipeline {
    pub fn new(config: ExportConfig, client: ExportClient, fetcher: Arc<dyn ArchiveFetcher>) -> Self {
        Self {
            config,
            client,
            fetcher,
        }
    }

    /// Validates `config` and wires the HTTP client and downloader.
    pub fn from_config(config: ExportConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let client = ExportClient::from_config(&config).map_err(PipelineError::Submit)?;
        let fetcher = Arc::new(ReqwestArchiveFetcher::new(config.fetch.clone()));
        Ok(Self::new(config, client, fetcher))
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    pub async fn run(
        &self,
        sink: Arc<dyn ProgressSink>,
        cancel: &CancellationToken,
    ) -> Result<PipelineSummary, PipelineError> {
        self.config.validate()?;
        let working_dir = self.config.working_dir.clone();

        reset_working_dir(&working_dir).map_err(PipelineError::Prepare)?;

        let task_id = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PipelineError::Submit(ClientError::Cancelled)),
            result = self.client.submit_export(
                &self.config.credentials.space_id,
                &self.config.options,
                sink.as_ref(),
            ) => result.map_err(PipelineError::Submit)?,
        };

        let download_url = self
            .client
            .await_completion(&task_id, sink.as_ref(), cancel)
            .await
            .map_err(PipelineError::Poll)?;
        engine_info!("Export finished for task [{}]", task_id);

        let archive = self
            .fetcher
            .download(
                &download_url,
                &self.config.archive_path(),
                sink.as_ref(),
                cancel,
            )
            .await
            .map_err(PipelineError::Download)?;

        let extracted_files = {
            let archive_path = archive.local_path.clone();
            let destination = working_dir.clone();
            tokio::task::spawn_blocking(move || extract_archive(&archive_path, &destination))
                .await
                .map_err(|err| PipelineError::Background {
                    stage: Stage::Extract,
                    message: err.to_string(),
                })?
                .map_err(PipelineError::Extract)?
        };
        sink.emit(ExportEvent::Extracted {
            files: extracted_files,
        });
        if let Err(err) = tokio::fs::remove_file(&archive.local_path).await {
            engine_warn!("Could not delete archive {:?}: {}", archive.local_path, err);
        }

        let normalize = {
            let sink = sink.clone();
            tokio::task::spawn_blocking(move || normalize_tree(&working_dir, sink.as_ref()))
                .await
                .map_err(|err| PipelineError::Background {
                    stage: Stage::Normalize,
                    message: err.to_string(),
                })?
                .map_err(PipelineError::Normalize)?
        };

        Ok(PipelineSummary {
            task_id,
            archive,
            extracted_files,
            normalize,
        })
    }
}
