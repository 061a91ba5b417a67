use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::logging::LogDestination;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum RendererKind {
    /// Plain HTTP GET of the page.
    #[default]
    Http,
    /// Headless Chromium (needs the `chromium` feature).
    Chromium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Download every document linked from one web page.
#[derive(Debug, Parser)]
#[command(name = "docharvest", version)]
pub struct Args {
    /// Page whose document links are harvested.
    #[arg(long)]
    pub url: Option<String>,

    /// RON config file. Defaults to ./docharvest.ron when present.
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Directory that receives the documents.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Where the rendered page is cached.
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// Render the page again even if a snapshot exists.
    #[arg(long)]
    pub refresh: bool,

    /// Maximum number of simultaneous downloads (default: unbounded).
    #[arg(long)]
    pub max_concurrency: Option<usize>,

    #[arg(long, value_enum)]
    pub renderer: Option<RendererKind>,

    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Also write logs to this file.
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Args {
    pub fn log_destination(&self) -> LogDestination {
        match &self.log_file {
            Some(path) => LogDestination::Both(path.clone()),
            None => LogDestination::Terminal,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::Parser;

    use super::Args;
    use crate::logging::LogDestination;

    #[test]
    fn logs_only_to_terminal_without_log_file() {
        let args = Args::parse_from(["docharvest"]);
        assert_eq!(args.log_destination(), LogDestination::Terminal);
    }

    #[test]
    fn log_file_adds_a_file_logger() {
        let args = Args::parse_from(["docharvest", "--log-file", "run.log"]);
        assert_eq!(
            args.log_destination(),
            LogDestination::Both(PathBuf::from("run.log"))
        );
    }
}
