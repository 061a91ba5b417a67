use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use docharvest_core::{derive_filename, LinkSet, NormalizedLink};
use engine_logging::{engine_debug, engine_error, engine_info, engine_warn};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::fetch::{Fetcher, ProgressSink};
use crate::persist::{AtomicFileWriter, WriteOutcome};
use crate::{
    BatchReport, DownloadOutcome, DownloadStatus, EngineEvent, FailureKind, FetchError, JobId,
    JobProgress, Stage,
};

/// One link bound to the file it will be written to.
#[derive(Debug, Clone)]
struct DownloadTask {
    job_id: JobId,
    link: NormalizedLink,
    filename: String,
    destination: PathBuf,
}

/// Fans a link set out into independent download tasks and waits for all of
/// them. A failing task never affects the others.
#[derive(Clone)]
pub struct DownloadOrchestrator {
    fetcher: Arc<dyn Fetcher>,
    output_dir: PathBuf,
    extension: String,
    max_concurrency: Option<usize>,
    cancel: CancellationToken,
}

impl DownloadOrchestrator {
    pub fn new(fetcher: Arc<dyn Fetcher>, output_dir: PathBuf, extension: impl Into<String>) -> Self {
        Self {
            fetcher,
            output_dir,
            extension: extension.into(),
            max_concurrency: None,
            cancel: CancellationToken::new(),
        }
    }

    /// `None` spawns every task at once; `Some(n)` lets at most `n` run.
    pub fn with_max_concurrency(mut self, limit: Option<usize>) -> Self {
        self.max_concurrency = limit.filter(|n| *n > 0);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub async fn download_all(&self, links: &LinkSet, sink: Arc<dyn ProgressSink>) -> BatchReport {
        let limiter = self
            .max_concurrency
            .map(|limit| Arc::new(Semaphore::new(limit)));
        let writer = Arc::new(AtomicFileWriter::new(self.output_dir.clone()));

        let mut slots: Vec<Option<DownloadOutcome>> = Vec::with_capacity(links.len());
        let mut tasks = Vec::with_capacity(links.len());
        let mut claimed = HashSet::new();

        for (index, link) in links.iter().enumerate() {
            let job_id = index as JobId;
            let filename = derive_filename(link, &self.extension);
            let destination = self.output_dir.join(&filename);
            if !claimed.insert(filename.clone()) {
                // Distinct spellings of one URL map to one file; the first owns it.
                engine_debug!("{} shares {:?} with an earlier link", link, destination);
                slots.push(Some(DownloadOutcome {
                    job_id,
                    link: link.clone(),
                    destination: destination.clone(),
                    result: Ok(DownloadStatus::Skipped { path: destination }),
                }));
                continue;
            }
            slots.push(None);
            tasks.push(DownloadTask {
                job_id,
                link: link.clone(),
                filename,
                destination,
            });
        }

        let mut join_set = JoinSet::new();
        for task in tasks {
            sink.emit(EngineEvent::Progress(JobProgress {
                job_id: task.job_id,
                stage: Stage::Queued,
                bytes: None,
            }));
            let fetcher = self.fetcher.clone();
            let writer = writer.clone();
            let sink = sink.clone();
            let limiter = limiter.clone();
            let cancel = self.cancel.clone();
            join_set.spawn(async move {
                let result = run_task(&task, fetcher, writer, sink.as_ref(), limiter, cancel).await;
                report(task.job_id, &task.link, &result, sink.as_ref());
                DownloadOutcome {
                    job_id: task.job_id,
                    link: task.link,
                    destination: task.destination,
                    result,
                }
            });
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(outcome) => {
                    let index = outcome.job_id as usize;
                    slots[index] = Some(outcome);
                }
                Err(err) => engine_error!("download task aborted: {}", err),
            }
        }

        let outcomes = slots
            .into_iter()
            .zip(links.iter())
            .enumerate()
            .map(|(index, (slot, link))| {
                slot.unwrap_or_else(|| {
                    let job_id = index as JobId;
                    let destination = self.output_dir.join(derive_filename(link, &self.extension));
                    let result = Err(FetchError::new(FailureKind::TaskPanicked, "task did not finish"));
                    report(job_id, link, &result, sink.as_ref());
                    DownloadOutcome {
                        job_id,
                        link: link.clone(),
                        destination,
                        result,
                    }
                })
            })
            .collect();

        let batch = BatchReport { outcomes };
        engine_info!(
            "Batch finished: {} saved, {} skipped, {} failed",
            batch.saved(),
            batch.skipped(),
            batch.failed()
        );
        batch
    }
}

async fn run_task(
    task: &DownloadTask,
    fetcher: Arc<dyn Fetcher>,
    writer: Arc<AtomicFileWriter>,
    sink: &dyn ProgressSink,
    limiter: Option<Arc<Semaphore>>,
    cancel: CancellationToken,
) -> Result<DownloadStatus, FetchError> {
    let _permit = match limiter {
        Some(limiter) => tokio::select! {
            permit = limiter.acquire_owned() => Some(permit.map_err(|_| FetchError::cancelled())?),
            _ = cancel.cancelled() => return Err(FetchError::cancelled()),
        },
        None => None,
    };
    if cancel.is_cancelled() {
        return Err(FetchError::cancelled());
    }

    let destination = task.destination.clone();
    let exists = tokio::task::spawn_blocking(move || destination.is_file())
        .await
        .map_err(|err| FetchError::new(FailureKind::TaskPanicked, err.to_string()))?;
    if exists {
        return Ok(DownloadStatus::Skipped {
            path: task.destination.clone(),
        });
    }

    let output = tokio::select! {
        fetched = fetcher.fetch(task.job_id, task.link.as_str(), sink) => fetched?,
        _ = cancel.cancelled() => return Err(FetchError::cancelled()),
    };
    if cancel.is_cancelled() {
        return Err(FetchError::cancelled());
    }
    if output.metadata.final_url != output.metadata.original_url {
        engine_debug!(
            "{} redirected {} time(s) to {}",
            task.link,
            output.metadata.redirect_count,
            output.metadata.final_url
        );
    }

    sink.emit(EngineEvent::Progress(JobProgress {
        job_id: task.job_id,
        stage: Stage::Writing,
        bytes: Some(output.metadata.byte_len),
    }));

    let filename = task.filename.clone();
    let written = tokio::task::spawn_blocking(move || writer.write_new(&filename, &output.bytes))
        .await
        .map_err(|err| FetchError::new(FailureKind::TaskPanicked, err.to_string()))?
        .map_err(|err| FetchError::new(FailureKind::Io, err.to_string()))?;

    Ok(match written {
        WriteOutcome::Written { path, bytes } => DownloadStatus::Saved { path, bytes },
        WriteOutcome::AlreadyExists { path } => DownloadStatus::Skipped { path },
    })
}

/// Logs the outcome and closes the job for the sink: `Done`, then `JobCompleted`.
fn report(
    job_id: JobId,
    link: &NormalizedLink,
    result: &Result<DownloadStatus, FetchError>,
    sink: &dyn ProgressSink,
) {
    match result {
        Ok(DownloadStatus::Saved { path, bytes }) => {
            engine_info!("Saved {} ({} bytes) to {:?}", link, bytes, path);
        }
        Ok(DownloadStatus::Skipped { path }) => {
            engine_info!("File already exists, skipping: {:?}", path);
        }
        Err(err) if err.kind == FailureKind::Cancelled => {
            engine_warn!("Download of {} cancelled", link);
        }
        Err(err) => engine_error!("Download failed for {}: {}", link, err),
    }
    sink.emit(EngineEvent::Progress(JobProgress {
        job_id,
        stage: Stage::Done,
        bytes: None,
    }));
    sink.emit(EngineEvent::JobCompleted {
        job_id,
        url: link.to_string(),
        result: result.clone().map_err(|err| err.kind),
    });
}
