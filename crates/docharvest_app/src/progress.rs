use docharvest_engine::{DownloadStatus, EngineEvent, ProgressSink};
use engine_logging::{engine_debug, engine_trace};

/// Forwards engine progress to the log at low verbosity; the engine already
/// reports outcomes at info level and above.
pub struct LogProgressSink;

impl ProgressSink for LogProgressSink {
    fn emit(&self, event: EngineEvent) {
        match event {
            EngineEvent::Progress(progress) => engine_trace!(
                "job {} {:?} bytes={:?}",
                progress.job_id,
                progress.stage,
                progress.bytes
            ),
            EngineEvent::JobCompleted { job_id, url, result } => {
                let status = match result {
                    Ok(DownloadStatus::Saved { .. }) => "saved".to_string(),
                    Ok(DownloadStatus::Skipped { .. }) => "skipped".to_string(),
                    Err(kind) => format!("failed ({kind})"),
                };
                engine_debug!("job {} {}: {}", job_id, url, status);
            }
        }
    }
}
