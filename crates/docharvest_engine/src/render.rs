use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::decode::{decode_page, DecodeError};
use crate::fetch::{FetchSettings, Fetcher, NullProgressSink, ReqwestFetcher};
use crate::FetchError;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("render timed out after {0:?}")]
    Timeout(Duration),
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("browser unavailable: {0}")]
    Browser(String),
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Produces the HTML of a page. Implementations must release every resource
/// they acquire, whatever the outcome, and never exceed `timeout`.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, page_url: &str, timeout: Duration) -> Result<String, RenderError>;
}

/// Fetches the page over plain HTTP. Enough for server-rendered pages and the
/// fallback when no browser is available.
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    fetcher: ReqwestFetcher,
}

impl HttpRenderer {
    pub fn new(settings: FetchSettings) -> Self {
        Self {
            fetcher: ReqwestFetcher::new(settings),
        }
    }
}

impl Default for HttpRenderer {
    fn default() -> Self {
        Self::new(FetchSettings::for_pages())
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn render(&self, page_url: &str, timeout: Duration) -> Result<String, RenderError> {
        let output = tokio::time::timeout(timeout, self.fetcher.fetch(0, page_url, &NullProgressSink))
            .await
            .map_err(|_| RenderError::Timeout(timeout))??;
        let host = url::Url::parse(&output.metadata.final_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string));
        let page = decode_page(
            &output.bytes,
            output.metadata.content_type.as_deref(),
            host.as_deref(),
        )?;
        Ok(page.html)
    }
}
