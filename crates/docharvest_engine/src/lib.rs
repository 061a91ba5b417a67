//! Docharvest engine: rendering, fetching, and concurrent document downloads.
#[cfg(feature = "chromium")]
mod chromium;
mod decode;
mod fetch;
mod orchestrator;
mod persist;
mod pipeline;
mod render;
mod snapshot;
mod types;

#[cfg(feature = "chromium")]
pub use chromium::ChromiumRenderer;
pub use decode::{decode_page, DecodeError, DecodedPage};
pub use fetch::{FetchSettings, Fetcher, NullProgressSink, ProgressSink, ReqwestFetcher};
pub use orchestrator::DownloadOrchestrator;
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError, WriteOutcome};
pub use pipeline::{
    discover_links, render_or_empty, HarvestConfig, HarvestReport, Harvester, DEFAULT_PAGE_URL,
};
pub use render::{HttpRenderer, RenderError, Renderer};
pub use snapshot::PageSnapshot;
pub use types::{
    BatchReport, DownloadOutcome, DownloadStatus, EngineEvent, FailureKind, FetchError,
    FetchMetadata, FetchOutput, JobId, JobProgress, Stage,
};

pub use docharvest_core::{LinkPolicy, LinkSet, NormalizedLink};
pub use tokio_util::sync::CancellationToken;
