//! Headless Chromium renderer for pages that build their links with script.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use engine_logging::{engine_debug, engine_warn};
use futures_util::StreamExt;

use crate::render::{RenderError, Renderer};

#[derive(Debug, Clone, Default)]
pub struct ChromiumRenderer {
    executable: Option<PathBuf>,
}

impl ChromiumRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific browser binary instead of the one found on `PATH`.
    pub fn with_executable(mut self, path: PathBuf) -> Self {
        self.executable = Some(path);
        self
    }

    fn config(&self) -> Result<BrowserConfig, RenderError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(1920, 1080)
            .arg("--disable-gpu")
            .arg("--disable-setuid-sandbox")
            .arg("--disable-dev-shm-usage");
        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }
        builder.build().map_err(RenderError::Browser)
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn render(&self, page_url: &str, timeout: Duration) -> Result<String, RenderError> {
        let (mut browser, mut handler) = Browser::launch(self.config()?)
            .await
            .map_err(|err| RenderError::Browser(err.to_string()))?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let navigation = async {
            let page = browser
                .new_page(page_url)
                .await
                .map_err(|err| RenderError::Navigation(err.to_string()))?;
            page.wait_for_navigation()
                .await
                .map_err(|err| RenderError::Navigation(err.to_string()))?;
            page.content()
                .await
                .map_err(|err| RenderError::Navigation(err.to_string()))
        };
        let result = match tokio::time::timeout(timeout, navigation).await {
            Ok(result) => result,
            Err(_) => Err(RenderError::Timeout(timeout)),
        };

        // The browser process goes away on every path, including timeouts.
        if let Err(err) = browser.close().await {
            engine_warn!("Failed to close browser cleanly: {}", err);
        }
        if let Err(err) = browser.wait().await {
            engine_debug!("Browser process wait failed: {}", err);
        }
        handler_task.abort();

        result
    }
}
