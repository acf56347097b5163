use std::time::Duration;
use thiserror::Error;

pub mod analysis;
pub mod browser;
pub mod config;
pub mod llm;
pub mod output;
pub mod processor;
pub mod prompt;
pub mod scraper;
pub mod search;
pub mod sentiment;
pub mod source;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use config::AnalyzerConfig;
pub use processor::{RunObserver, RunReport, TaskProcessor};
pub use types::{CandidateResult, CrawlRecord, CrawlStatus, Phase, RunSnapshot, Sentiment};

/// The `AnalyzerError` enum is the crate-level error for everything that can go wrong
/// outside of the per-URL extraction boundary.
#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// Represents an error that occurs during an HTTP request.
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    /// Represents a filesystem error while persisting results.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Represents an error while writing CSV rows.
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),
    /// Represents an error while loading configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),
}

/// Rejected run input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("URL list must not be empty")]
    EmptyUrlList,
    #[error("select at least one search engine")]
    NoEngineSelected,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("no matching results were found")]
    NoCandidates,
}

/// Failure to acquire the extraction resource for a run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InitError {
    /// The headless browser could not be located or started.
    #[error("headless browser failed to start: {0}")]
    BrowserLaunch(String),
    /// The HTTP client could not be built.
    #[error("HTTP client could not be created: {0}")]
    HttpClient(String),
}

/// Per-URL extraction failure. Recorded on the row, never fatal to a batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("invalid URL")]
    InvalidUrl,
    #[error("request timed out")]
    Timeout,
    #[error("HTTP error: {0}")]
    HttpStatus(u16),
    #[error("could not locate content region")]
    NoContentRegion,
    #[error("extracted content is empty")]
    EmptyContent,
    /// Transport-level failure, carrying the failure category.
    #[error("request failed: {0}")]
    RequestFailed(String),
    #[error("browser is not available")]
    BrowserUnavailable,
    #[error("unknown error")]
    Unknown,
}

/// Reasons a summary could not be produced. These never fail a run; they are
/// rendered inline into the summary text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SummarizationError {
    #[error("LLM client is not configured (check the API key)")]
    NoCredential,
    #[error("input content is empty, nothing to summarize")]
    EmptyContent,
    #[error("API returned an error - {0}")]
    Service(String),
}

/// A type alias for `Result` with the `AnalyzerError` error type.
pub type Result<T> = std::result::Result<T, AnalyzerError>;

// Constants

/// The default timeout for page fetches.
pub const DEFAULT_CRAWL_TIMEOUT: Duration = Duration::from_secs(20);
/// The default timeout for search backend requests.
pub const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(15);
/// The API key value shipped in sample configuration files.
pub const PLACEHOLDER_API_KEY: &str = "YOUR_API_KEY_HERE";
/// Summary text shown until a run produces one.
pub const SUMMARY_PENDING: &str = "Waiting for analysis results...";
/// Summary text used whenever LLM analysis does not run.
pub const SUMMARY_SKIPPED: &str = "LLM analysis skipped.";
