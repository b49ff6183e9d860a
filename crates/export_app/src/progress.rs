use engine_logging::{engine_debug, engine_info, engine_trace, engine_warn};
use export_engine::{ExportEvent, NodeKind, ProgressSink};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Reports pipeline events through the global logger.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgressSink;

impl ProgressSink for LogProgressSink {
    fn emit(&self, event: ExportEvent) {
        match event {
            ExportEvent::JobSubmitted { task_id } => {
                engine_info!("Started export as task [{}].", task_id);
            }
            ExportEvent::JobProgress {
                poll,
                pages_exported,
                ..
            } => {
                engine_info!("Exported {} pages.", pages_exported);
                engine_trace!("Status poll #{}", poll);
            }
            ExportEvent::JobCompleted { pages_exported, .. } => {
                engine_info!("Export finished with {} pages.", pages_exported);
            }
            ExportEvent::DownloadStarted { declared_len } => match declared_len {
                Some(len) => engine_info!("Downloading {}mb...", megabytes(len)),
                None => engine_info!("Downloading export archive..."),
            },
            ExportEvent::DownloadProgress { bytes } => {
                engine_debug!("Downloaded {}mb", megabytes(bytes));
            }
            ExportEvent::DownloadFinished { bytes } => {
                engine_info!("Download complete ({}mb).", megabytes(bytes));
            }
            ExportEvent::Extracted { files } => {
                engine_info!("Extracted {} files.", files);
            }
            ExportEvent::Renamed { from, to, kind } => {
                let label = match kind {
                    NodeKind::File => "file",
                    NodeKind::Directory => "directory",
                };
                engine_debug!("Renamed {} {:?} -> {:?}", label, from, to);
            }
            ExportEvent::ReferencesRewritten { path, count } => {
                engine_debug!("Rewrote {} references in {:?}", count, path);
            }
            ExportEvent::RewriteFailed { path, message } => {
                engine_warn!("Skipped reference rewrite for {:?}: {}", path, message);
            }
        }
    }
}

/// Megabytes rounded to two decimals.
fn megabytes(bytes: u64) -> String {
    format!("{:.2}", bytes as f64 / BYTES_PER_MB)
}
