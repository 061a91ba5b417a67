use std::sync::{Arc, Mutex};
use std::time::Duration;

use docharvest_engine::{
    EngineEvent, FailureKind, FetchSettings, Fetcher, JobProgress, ProgressSink, ReqwestFetcher,
    Stage,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PDF_BYTES: &[u8] = b"%PDF-1.7\n%test document\n%%EOF";

#[derive(Default)]
struct TestSink {
    events: Arc<Mutex<Vec<EngineEvent>>>,
}

impl TestSink {
    fn take(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl ProgressSink for TestSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

async fn serve(server: &MockServer, route: &str, response: ResponseTemplate) -> String {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
    format!("{}{}", server.uri(), route)
}

#[tokio::test]
async fn fetcher_returns_pdf_and_emits_progress() {
    let server = MockServer::start().await;
    let url = serve(
        &server,
        "/doc.pdf",
        ResponseTemplate::new(200).set_body_raw(PDF_BYTES.to_vec(), "application/pdf"),
    )
    .await;

    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let sink = TestSink::default();

    let output = fetcher.fetch(1, &url, &sink).await.expect("fetch ok");
    assert_eq!(output.metadata.original_url, url);
    assert_eq!(output.metadata.final_url, output.metadata.original_url);
    assert_eq!(output.metadata.redirect_count, 0);
    assert_eq!(output.metadata.byte_len, PDF_BYTES.len() as u64);
    assert_eq!(output.bytes, PDF_BYTES);

    let progress = sink
        .take()
        .into_iter()
        .filter_map(|event| match event {
            EngineEvent::Progress(JobProgress { stage, .. }) => Some(stage),
            _ => None,
        })
        .collect::<Vec<_>>();
    assert!(progress.contains(&Stage::Downloading));
}

#[tokio::test]
async fn fetcher_follows_redirects() {
    let server = MockServer::start().await;
    let target = serve(
        &server,
        "/files/doc.pdf",
        ResponseTemplate::new(200).set_body_raw(PDF_BYTES.to_vec(), "application/pdf"),
    )
    .await;
    let url = serve(
        &server,
        "/old/doc.pdf",
        ResponseTemplate::new(301).insert_header("Location", target.as_str()),
    )
    .await;

    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let output = fetcher.fetch(1, &url, &TestSink::default()).await.unwrap();
    assert_eq!(output.metadata.final_url, target);
    assert_eq!(output.metadata.redirect_count, 1);
}

#[tokio::test]
async fn fetcher_fails_on_http_status() {
    let server = MockServer::start().await;
    let url = serve(&server, "/missing.pdf", ResponseTemplate::new(404)).await;

    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let err = fetcher.fetch(7, &url, &TestSink::default()).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(404));
}

#[tokio::test]
async fn fetcher_rejects_html_served_as_document() {
    let server = MockServer::start().await;
    let url = serve(
        &server,
        "/login.pdf",
        ResponseTemplate::new(200).set_body_raw("<html>login</html>", "text/html"),
    )
    .await;

    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let err = fetcher.fetch(4, &url, &TestSink::default()).await.unwrap_err();
    assert_eq!(
        err.kind,
        FailureKind::UnsupportedContentType {
            content_type: "text/html".to_string()
        }
    );
}

#[tokio::test]
async fn fetcher_rejects_missing_content_type() {
    let server = MockServer::start().await;
    let url = serve(
        &server,
        "/bare.pdf",
        ResponseTemplate::new(200).set_body_bytes(PDF_BYTES.to_vec()),
    )
    .await;

    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let err = fetcher.fetch(5, &url, &TestSink::default()).await.unwrap_err();
    assert!(matches!(err.kind, FailureKind::UnsupportedContentType { .. }));
}

#[tokio::test]
async fn fetcher_rejects_empty_body() {
    let server = MockServer::start().await;
    let url = serve(
        &server,
        "/empty.pdf",
        ResponseTemplate::new(200).insert_header("Content-Type", "application/pdf"),
    )
    .await;

    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let err = fetcher.fetch(6, &url, &TestSink::default()).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::EmptyBody);
}

#[tokio::test]
async fn fetcher_times_out_on_slow_response() {
    let server = MockServer::start().await;
    let url = serve(
        &server,
        "/slow.pdf",
        ResponseTemplate::new(200)
            .set_delay(Duration::from_millis(250))
            .set_body_raw(PDF_BYTES.to_vec(), "application/pdf"),
    )
    .await;

    let settings = FetchSettings {
        request_timeout: Duration::from_millis(50),
        ..FetchSettings::default()
    };
    let fetcher = ReqwestFetcher::new(settings);
    let err = fetcher.fetch(2, &url, &TestSink::default()).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
}

#[tokio::test]
async fn fetcher_rejects_too_large_response() {
    let server = MockServer::start().await;
    let url = serve(
        &server,
        "/large.pdf",
        ResponseTemplate::new(200).set_body_raw("01234567890", "application/pdf"),
    )
    .await;

    let settings = FetchSettings {
        max_bytes: 10,
        ..FetchSettings::default()
    };
    let fetcher = ReqwestFetcher::new(settings);
    let err = fetcher.fetch(3, &url, &TestSink::default()).await.unwrap_err();
    assert_eq!(
        err.kind,
        FailureKind::TooLarge {
            max_bytes: 10,
            actual: Some(11)
        }
    );
}

#[tokio::test]
async fn invalid_url_is_reported_without_network() {
    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let err = fetcher
        .fetch(9, "not a url", &TestSink::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidUrl);
}
