use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use async_trait::async_trait;
use docharvest_engine::{
    discover_links, EngineEvent, FailureKind, HarvestConfig, Harvester, HttpRenderer, LinkPolicy,
    ProgressSink, RenderError, Renderer,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PDF_BYTES: &[u8] = b"%PDF-1.7\n%test document\n%%EOF";

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

/// Serves fixed HTML and counts how often it was asked to.
struct StaticRenderer {
    html: Option<String>,
    calls: AtomicUsize,
}

impl StaticRenderer {
    fn new(html: Option<String>) -> Arc<Self> {
        Arc::new(Self {
            html,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Renderer for StaticRenderer {
    async fn render(&self, _page_url: &str, timeout: Duration) -> Result<String, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.html.clone().ok_or(RenderError::Timeout(timeout))
    }
}

#[derive(Default)]
struct CollectingSink {
    completed: Mutex<Vec<String>>,
}

impl ProgressSink for CollectingSink {
    fn emit(&self, event: EngineEvent) {
        if let EngineEvent::JobCompleted { url, .. } = event {
            self.completed.lock().unwrap().push(url);
        }
    }
}

fn config(server: &MockServer, dir: &TempDir) -> HarvestConfig {
    HarvestConfig {
        page_url: format!("{}/safety-data-sheets/", server.uri()),
        policy: LinkPolicy::new(".pdf", server.uri()),
        snapshot_path: dir.path().join("page.html"),
        output_dir: dir.path().join("PDFs"),
        ..HarvestConfig::default()
    }
}

fn page(server: &MockServer) -> String {
    format!(
        r#"<html><body>
<a href="/sheets/a.pdf">A</a>
<a href="{uri}/sheets/a.pdf">A again</a>
<a href=%22/sheets/b.pdf%22>B</a>
<a href="/sheets/missing.pdf">Gone</a>
</body></html>"#,
        uri = server.uri()
    )
}

async fn mount_documents(server: &MockServer) {
    for route in ["/sheets/a.pdf", "/sheets/b.pdf"] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_raw(PDF_BYTES.to_vec(), "application/pdf"))
            .mount(server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/sheets/missing.pdf"))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;
}

#[tokio::test]
async fn full_run_downloads_unique_documents_and_isolates_failures() {
    init_logging();
    let server = MockServer::start().await;
    mount_documents(&server).await;
    let dir = TempDir::new().unwrap();
    let renderer = StaticRenderer::new(Some(page(&server)));
    let sink = Arc::new(CollectingSink::default());

    let report = Harvester::new(config(&server, &dir), renderer.clone())
        .with_progress_sink(sink.clone())
        .run()
        .await;

    assert!(!report.from_snapshot);
    assert_eq!(report.raw_links, 4);
    assert!(report.rejected.is_empty());
    assert_eq!(report.batch.outcomes.len(), 3);
    assert_eq!(report.batch.saved(), 2);
    assert_eq!(report.batch.failed(), 1);
    assert_eq!(sink.completed.lock().unwrap().len(), 3);

    let saved = fs::read_dir(dir.path().join("PDFs")).unwrap().count();
    assert_eq!(saved, 2);
    assert!(dir.path().join("page.html").is_file());
}

#[tokio::test]
async fn second_run_reuses_snapshot_and_skips_downloads() {
    init_logging();
    let server = MockServer::start().await;
    mount_documents(&server).await;
    let dir = TempDir::new().unwrap();
    let renderer = StaticRenderer::new(Some(page(&server)));

    let first = Harvester::new(config(&server, &dir), renderer.clone()).run().await;
    assert_eq!(first.batch.saved(), 2);

    let second = Harvester::new(config(&server, &dir), renderer.clone()).run().await;
    assert!(second.from_snapshot);
    assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
    assert_eq!(second.batch.saved(), 0);
    assert_eq!(second.batch.skipped(), 2);
    assert_eq!(second.batch.failed(), 1);
}

#[tokio::test]
async fn renderer_failure_means_no_links() {
    init_logging();
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let report = Harvester::new(config(&server, &dir), StaticRenderer::new(None))
        .run()
        .await;

    assert_eq!(report.raw_links, 0);
    assert!(report.batch.outcomes.is_empty());
    assert!(!dir.path().join("page.html").exists());
    assert!(!dir.path().join("PDFs").exists());
}

#[tokio::test]
async fn http_renderer_fetches_server_rendered_pages() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/safety-data-sheets/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(page(&server), "text/html; charset=utf-8"),
        )
        .mount(&server)
        .await;
    mount_documents(&server).await;
    let dir = TempDir::new().unwrap();

    let report = Harvester::new(config(&server, &dir), Arc::new(HttpRenderer::default()))
        .run()
        .await;

    assert_eq!(report.batch.saved(), 2);
    let missing = report.batch.failures().next().unwrap();
    assert!(missing.0.as_str().ends_with("/sheets/missing.pdf"));
    assert_eq!(missing.1.kind, FailureKind::HttpStatus(404));
}

#[test]
fn discover_links_reports_dropped_links() {
    init_logging();
    let html = r#"<a href="/ok.pdf">ok</a><a href="mailto:x.pdf">bad</a>"#;
    let (raw, output) = discover_links(html, &LinkPolicy::new(".pdf", "no origin"));
    assert_eq!(raw, 2);
    assert_eq!(output.links.len(), 0);
    assert_eq!(output.rejected.len(), 2);
}
