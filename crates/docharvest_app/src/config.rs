//! Run settings: defaults, then an optional RON file, then CLI flags.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use docharvest_engine::{FetchSettings, HarvestConfig, LinkPolicy};
use engine_logging::engine_info;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::cli::{Args, RendererKind};

const DEFAULT_CONFIG_FILE: &str = "docharvest.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: ron::error::SpannedError,
    },
    #[error("page url {0:?} is not an absolute http(s) url")]
    PageUrl(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub page_url: String,
    /// Origin used to repair relative links. Defaults to the page's origin.
    pub base_origin: Option<String>,
    pub extension: String,
    pub content_types: Vec<String>,
    pub snapshot_path: PathBuf,
    pub refresh_snapshot: bool,
    pub output_dir: PathBuf,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub render_timeout_secs: u64,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub max_concurrency: Option<usize>,
    pub user_agent: Option<String>,
    pub renderer: RendererKind,
}

impl Default for AppConfig {
    fn default() -> Self {
        let harvest = HarvestConfig::default();
        Self {
            page_url: harvest.page_url,
            base_origin: None,
            extension: harvest.policy.extension,
            content_types: harvest.fetch.allowed_content_types,
            snapshot_path: harvest.snapshot_path,
            refresh_snapshot: harvest.refresh_snapshot,
            output_dir: harvest.output_dir,
            request_timeout_secs: harvest.fetch.request_timeout.as_secs(),
            connect_timeout_secs: harvest.fetch.connect_timeout.as_secs(),
            render_timeout_secs: harvest.render_timeout.as_secs(),
            redirect_limit: harvest.fetch.redirect_limit,
            max_bytes: harvest.fetch.max_bytes,
            max_concurrency: harvest.max_concurrency,
            user_agent: None,
            renderer: RendererKind::default(),
        }
    }
}

impl AppConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        ron::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn apply_args(&mut self, args: &Args) {
        if let Some(url) = &args.url {
            self.page_url = url.clone();
        }
        if let Some(dir) = &args.output_dir {
            self.output_dir = dir.clone();
        }
        if let Some(path) = &args.snapshot {
            self.snapshot_path = path.clone();
        }
        if args.refresh {
            self.refresh_snapshot = true;
        }
        if args.max_concurrency.is_some() {
            self.max_concurrency = args.max_concurrency;
        }
        if let Some(renderer) = args.renderer {
            self.renderer = renderer;
        }
    }

    pub fn into_harvest_config(self) -> Result<HarvestConfig, ConfigError> {
        let page = Url::parse(&self.page_url)
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
            .ok_or_else(|| ConfigError::PageUrl(self.page_url.clone()))?;
        let base_origin = self
            .base_origin
            .unwrap_or_else(|| page.origin().ascii_serialization());

        let defaults = FetchSettings::default();
        let fetch = FetchSettings {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            redirect_limit: self.redirect_limit,
            max_bytes: self.max_bytes,
            allowed_content_types: self.content_types,
            user_agent: self.user_agent.unwrap_or(defaults.user_agent),
        };

        Ok(HarvestConfig {
            page_url: self.page_url,
            policy: LinkPolicy::new(self.extension, base_origin),
            snapshot_path: self.snapshot_path,
            refresh_snapshot: self.refresh_snapshot,
            output_dir: self.output_dir,
            fetch,
            render_timeout: Duration::from_secs(self.render_timeout_secs),
            max_concurrency: self.max_concurrency,
        })
    }
}

/// Explicit `--config` must exist; the default file is optional.
pub fn load(args: &Args) -> Result<AppConfig, ConfigError> {
    let default_file = Path::new(DEFAULT_CONFIG_FILE);
    let source = args
        .config
        .as_deref()
        .or_else(|| default_file.is_file().then_some(default_file));

    let mut config = match source {
        Some(path) => {
            let config = AppConfig::from_file(path)?;
            engine_info!("Loaded configuration from {:?}", path);
            config
        }
        None => AppConfig::default(),
    };
    config.apply_args(args);
    Ok(config)
}
