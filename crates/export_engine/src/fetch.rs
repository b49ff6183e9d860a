use std::fmt;
use std::path::Path;
use std::time::Duration;

use bytes::Bytes;
use engine_logging::{engine_debug, engine_warn};
use futures_util::{Stream, StreamExt};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::{ArchiveHandle, ExportEvent, ProgressSink};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    /// Per-request timeout for task API calls.
    pub request_timeout: Duration,
    /// Whole-transfer timeout for the archive download. Archives can be large.
    pub download_timeout: Option<Duration>,
    /// Emit a progress event every time this many more bytes are written.
    pub progress_step: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            download_timeout: None,
            progress_step: 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    IncompleteTransfer { expected: Option<u64>, received: u64 },
    Io,
    Cancelled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::IncompleteTransfer { expected, received } => match expected {
                Some(expected) => {
                    write!(f, "incomplete transfer ({received} of {expected} bytes)")
                }
                None => write!(f, "incomplete transfer ({received} bytes)"),
            },
            FailureKind::Io => write!(f, "io error"),
            FailureKind::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[async_trait::async_trait]
pub trait ArchiveFetcher: Send + Sync {
    /// Streams `url` into `destination`. Nothing is left on disk on failure.
    async fn download(
        &self,
        url: &str,
        destination: &Path,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<ArchiveHandle, FetchError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestArchiveFetcher {
    settings: FetchSettings,
}

impl ReqwestArchiveFetcher {
    pub fn new(settings: FetchSettings) -> Self {
        Self { settings }
    }

    fn build_client(&self) -> Result<reqwest::Client, FetchError> {
        let mut builder = reqwest::Client::builder().connect_timeout(self.settings.connect_timeout);
        if let Some(timeout) = self.settings.download_timeout {
            builder = builder.timeout(timeout);
        }
        builder
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))
    }
}

#[async_trait::async_trait]
impl ArchiveFetcher for ReqwestArchiveFetcher {
    async fn download(
        &self,
        url: &str,
        destination: &Path,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<ArchiveHandle, FetchError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let client = self.build_client()?;

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(FetchError::new(FailureKind::Cancelled, "download cancelled"));
            }
            response = client.get(parsed).send() => response.map_err(map_reqwest_error)?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let declared_len = response.content_length();
        sink.emit(ExportEvent::DownloadStarted { declared_len });

        let mut file = File::create(destination).await.map_err(|err| {
            FetchError::new(FailureKind::Io, format!("{}: {err}", destination.display()))
        })?;

        let written = write_stream(
            Box::pin(response.bytes_stream()),
            &mut file,
            declared_len,
            self.settings.progress_step,
            sink,
            cancel,
        )
        .await;
        drop(file);

        match written {
            Ok(size_bytes) => {
                sink.emit(ExportEvent::DownloadFinished { bytes: size_bytes });
                Ok(ArchiveHandle {
                    local_path: destination.to_path_buf(),
                    size_bytes,
                    declared_len,
                })
            }
            Err(err) => {
                if let Err(remove_err) = tokio::fs::remove_file(destination).await {
                    engine_warn!(
                        "Could not remove partial archive {:?}: {}",
                        destination,
                        remove_err
                    );
                }
                Err(err)
            }
        }
    }
}

/// Copies a body stream into `file` chunk by chunk and returns the byte count.
///
/// A stream error or a byte count differing from `declared_len` is an
/// incomplete transfer.
pub(crate) async fn write_stream<S, E>(
    mut stream: S,
    file: &mut File,
    declared_len: Option<u64>,
    progress_step: u64,
    sink: &dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<u64, FetchError>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: fmt::Display,
{
    let mut written: u64 = 0;
    let mut next_report = progress_step.max(1);

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(FetchError::new(FailureKind::Cancelled, "download cancelled"));
            }
            next = stream.next() => next,
        };
        let Some(chunk) = next else {
            break;
        };
        let chunk = chunk.map_err(|err| {
            FetchError::new(
                FailureKind::IncompleteTransfer {
                    expected: declared_len,
                    received: written,
                },
                err.to_string(),
            )
        })?;

        file.write_all(&chunk)
            .await
            .map_err(|err| FetchError::new(FailureKind::Io, err.to_string()))?;
        written += chunk.len() as u64;

        if written >= next_report {
            sink.emit(ExportEvent::DownloadProgress { bytes: written });
            next_report = written + progress_step.max(1);
        }
    }

    file.flush()
        .await
        .map_err(|err| FetchError::new(FailureKind::Io, err.to_string()))?;
    file.sync_all()
        .await
        .map_err(|err| FetchError::new(FailureKind::Io, err.to_string()))?;

    if let Some(expected) = declared_len {
        if expected != written {
            return Err(FetchError::new(
                FailureKind::IncompleteTransfer {
                    expected: Some(expected),
                    received: written,
                },
                "stream ended before the declared length",
            ));
        }
    }

    engine_debug!("Wrote {} bytes", written);
    Ok(written)
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
