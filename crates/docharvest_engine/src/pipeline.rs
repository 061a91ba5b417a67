use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use docharvest_core::{LinkExtractor, LinkPolicy, NormalizeOutput, Normalizer, RejectedLink};
use engine_logging::{engine_error, engine_info, engine_warn};
use tokio_util::sync::CancellationToken;

use crate::fetch::{FetchSettings, Fetcher, NullProgressSink, ProgressSink, ReqwestFetcher};
use crate::orchestrator::DownloadOrchestrator;
use crate::persist::ensure_output_dir;
use crate::render::Renderer;
use crate::snapshot::PageSnapshot;
use crate::BatchReport;

pub const DEFAULT_PAGE_URL: &str = "https://millcraft.com/safety-data-sheets/";

#[derive(Debug, Clone)]
pub struct HarvestConfig {
    pub page_url: String,
    pub policy: LinkPolicy,
    pub snapshot_path: PathBuf,
    /// Ignore an existing snapshot and render the page again.
    pub refresh_snapshot: bool,
    pub output_dir: PathBuf,
    pub fetch: FetchSettings,
    pub render_timeout: Duration,
    pub max_concurrency: Option<usize>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            page_url: DEFAULT_PAGE_URL.to_string(),
            policy: LinkPolicy::default(),
            snapshot_path: PathBuf::from("page_snapshot.html"),
            refresh_snapshot: false,
            output_dir: PathBuf::from("PDFs"),
            fetch: FetchSettings::default(),
            render_timeout: Duration::from_secs(5 * 60),
            max_concurrency: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestReport {
    pub page_url: String,
    pub from_snapshot: bool,
    pub raw_links: usize,
    pub rejected: Vec<RejectedLink>,
    pub batch: BatchReport,
}

/// Extract and normalize the document links of a page, logging every link
/// that has to be dropped.
pub fn discover_links(html: &str, policy: &LinkPolicy) -> (usize, NormalizeOutput) {
    let raws = LinkExtractor::new(&policy.extension).extract(html);
    let output = Normalizer::new(policy).normalize_all(&raws);
    for rejected in &output.rejected {
        engine_warn!(
            "Dropping link {:?} (tried {:?}): {}",
            rejected.raw,
            rejected.candidate,
            rejected.reason
        );
    }
    (raws.len(), output)
}

/// Render a page, treating any failure as an empty page.
pub async fn render_or_empty(renderer: &dyn Renderer, page_url: &str, timeout: Duration) -> String {
    match renderer.render(page_url, timeout).await {
        Ok(html) => {
            engine_info!("Rendered {} ({} bytes)", page_url, html.len());
            html
        }
        Err(err) => {
            engine_error!("Failed to render {}: {}", page_url, err);
            String::new()
        }
    }
}

/// One run: page → links → downloads.
pub struct Harvester {
    config: HarvestConfig,
    renderer: Arc<dyn Renderer>,
    fetcher: Arc<dyn Fetcher>,
    sink: Arc<dyn ProgressSink>,
    cancel: CancellationToken,
}

impl Harvester {
    pub fn new(config: HarvestConfig, renderer: Arc<dyn Renderer>) -> Self {
        let fetcher = Arc::new(ReqwestFetcher::new(config.fetch.clone()));
        Self {
            config,
            renderer,
            fetcher,
            sink: Arc::new(NullProgressSink),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    pub async fn run(&self) -> HarvestReport {
        let (html, from_snapshot) = self.acquire_page().await;
        let (raw_links, normalized) = discover_links(&html, &self.config.policy);
        engine_info!(
            "Found {} document link(s), {} after normalization",
            raw_links,
            normalized.links.len()
        );

        let mut report = HarvestReport {
            page_url: self.config.page_url.clone(),
            from_snapshot,
            raw_links,
            rejected: normalized.rejected,
            batch: BatchReport::default(),
        };
        if normalized.links.is_empty() {
            return report;
        }

        // Tasks still run and report their own write failures.
        if let Err(err) = ensure_output_dir(&self.config.output_dir) {
            engine_error!("Output directory {:?} unusable: {}", self.config.output_dir, err);
        }

        let orchestrator = DownloadOrchestrator::new(
            self.fetcher.clone(),
            self.config.output_dir.clone(),
            self.config.policy.extension.clone(),
        )
        .with_max_concurrency(self.config.max_concurrency)
        .with_cancellation(self.cancel.clone());
        report.batch = orchestrator
            .download_all(&normalized.links, self.sink.clone())
            .await;
        report
    }

    async fn acquire_page(&self) -> (String, bool) {
        let snapshot = PageSnapshot::new(self.config.snapshot_path.clone());
        if !self.config.refresh_snapshot {
            if let Some(html) = snapshot.load() {
                return (html, true);
            }
        }

        let html = tokio::select! {
            html = render_or_empty(self.renderer.as_ref(), &self.config.page_url, self.config.render_timeout) => html,
            _ = self.cancel.cancelled() => {
                engine_warn!("Rendering of {} cancelled", self.config.page_url);
                String::new()
            }
        };
        if !html.is_empty() {
            if let Err(err) = snapshot.store(&html) {
                engine_warn!("Failed to write snapshot {:?}: {}", snapshot.path(), err);
            }
        }
        (html, false)
    }
}
