use crate::{ExtractionError, InitError, InputError, ResolutionError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A discovered link eligible for crawling.
///
/// Produced by a search backend or by wrapping a user-supplied URL. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResult {
    pub title: String,
    /// Unique key within a batch.
    pub link: String,
    pub snippet: String,
    /// Label of the backend (or synthetic source) that produced the result.
    pub source: String,
    /// When the result was discovered. Placeholder and direct-URL candidates have none.
    pub discovered_at: Option<DateTime<Utc>>,
}

impl CandidateResult {
    pub fn new(
        title: impl Into<String>,
        link: impl Into<String>,
        snippet: impl Into<String>,
        source: impl Into<String>,
        discovered_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            snippet: snippet.into(),
            source: source.into(),
            discovered_at,
        }
    }

    /// Discovery date as `YYYY-MM-DD`, or `N/A`.
    pub fn date_label(&self) -> String {
        self.discovered_at
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "N/A".to_string())
    }
}

/// Coarse keyword sentiment of a crawled page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sentiment {
    Bullish,
    Bearish,
    Neutral,
    /// Not analyzed yet, or the page could not be extracted.
    Pending,
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Sentiment::Bullish => "Bullish",
            Sentiment::Bearish => "Bearish",
            Sentiment::Neutral => "Neutral",
            Sentiment::Pending => "Pending",
        };
        f.write_str(label)
    }
}

/// Crawl state of a single row. `Success` and `Failure` are terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlStatus {
    Pending,
    Success,
    Failure(ExtractionError),
}

impl CrawlStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CrawlStatus::Pending)
    }
}

impl fmt::Display for CrawlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrawlStatus::Pending => f.write_str("pending"),
            CrawlStatus::Success => f.write_str("success"),
            CrawlStatus::Failure(reason) => write!(f, "failure: {}", reason),
        }
    }
}

/// One row of the result table, keyed by `link`.
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlRecord {
    /// 1-based position in the crawl subset.
    pub ordinal: usize,
    pub title: String,
    pub link: String,
    pub source: String,
    pub date: String,
    pub status: CrawlStatus,
    pub extracted_text: String,
    pub sentiment: Sentiment,
}

impl CrawlRecord {
    /// Creates a pending row for the given candidate.
    pub fn pending(ordinal: usize, candidate: &CandidateResult) -> Self {
        Self {
            ordinal,
            title: candidate.title.clone(),
            link: candidate.link.clone(),
            source: candidate.source.clone(),
            date: candidate.date_label(),
            status: CrawlStatus::Pending,
            extracted_text: String::new(),
            sentiment: Sentiment::Pending,
        }
    }
}

/// Search time window understood by the backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimePeriod {
    #[default]
    Any,
    Day,
    Week,
    Month,
}

/// Why a run stopped before reaching `Done`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunFailure {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error(transparent)]
    Init(#[from] InitError),
}

/// Task processor phase. Phases only move forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Init,
    ResolvingCandidates,
    Crawling { index: usize, total: usize },
    Charting,
    Summarizing,
    Persisting,
    Done,
    Failed(RunFailure),
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Done | Phase::Failed(_))
    }
}

/// Counts of each terminal sentiment over the successfully crawled rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SentimentDistribution {
    pub bullish: usize,
    pub bearish: usize,
    pub neutral: usize,
}

/// Chart data derived from the crawl. Rendering is left to the presentation layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartArtifacts {
    pub sentiment: Option<SentimentDistribution>,
    /// Financial vocabulary terms with their frequency, most frequent first.
    pub hot_terms: Option<Vec<(String, usize)>>,
}

/// One progress report emitted by the task processor.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSnapshot {
    pub phase: Phase,
    pub status: String,
    pub summary: String,
    /// Display copy of the table; extracted text is truncated.
    pub table: Vec<CrawlRecord>,
    pub charts: ChartArtifacts,
    pub output_path: Option<PathBuf>,
    /// Whether the caller may start another run.
    pub controls_enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels() {
        assert_eq!(CrawlStatus::Pending.to_string(), "pending");
        assert_eq!(CrawlStatus::Success.to_string(), "success");
        assert_eq!(
            CrawlStatus::Failure(ExtractionError::Timeout).to_string(),
            "failure: request timed out"
        );
        assert_eq!(
            CrawlStatus::Failure(ExtractionError::HttpStatus(404)).to_string(),
            "failure: HTTP error: 404"
        );
    }

    #[test]
    fn test_pending_record_from_candidate() {
        let candidate = CandidateResult::new("Title", "https://example.com", "", "Bing", None);
        let record = CrawlRecord::pending(3, &candidate);

        assert_eq!(record.ordinal, 3);
        assert_eq!(record.date, "N/A");
        assert_eq!(record.status, CrawlStatus::Pending);
        assert_eq!(record.sentiment, Sentiment::Pending);
        assert!(!record.status.is_terminal());
    }
}
