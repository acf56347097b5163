//! The crawl-and-extract pipeline.
//!
//! A run moves forward through [`Phase`]s and pushes a [`RunSnapshot`] to its
//! [`RunObserver`] before every blocking step. Candidates are crawled strictly one
//! at a time; a failed page is recorded on its row and never aborts the batch.

use crate::analysis::{hot_terms, sentiment_distribution, DEFAULT_HOT_TERM_LIMIT};
use crate::config::AnalyzerConfig;
use crate::llm::{LLMProcessor, Summarizer};
use crate::output::{display_table, format_summary};
use crate::scraper::{ContentExtractor, ExtractorLauncher, StrategyLauncher};
use crate::search::BackendRegistry;
use crate::sentiment::SentimentScorer;
use crate::source::{ResolveProgress, ResultSource, RunMode};
use crate::storage::{CsvStore, RecordStore};
use crate::types::{ChartArtifacts, CrawlRecord, CrawlStatus, Phase, RunFailure, RunSnapshot};
use crate::{SUMMARY_PENDING, SUMMARY_SKIPPED};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{error, info, instrument, warn};

/// Receives progress snapshots, in order, as the run produces them.
pub trait RunObserver: Send {
    fn on_snapshot(&mut self, snapshot: RunSnapshot);
}

impl RunObserver for Vec<RunSnapshot> {
    fn on_snapshot(&mut self, snapshot: RunSnapshot) {
        self.push(snapshot);
    }
}

impl RunObserver for UnboundedSender<RunSnapshot> {
    fn on_snapshot(&mut self, snapshot: RunSnapshot) {
        // A dropped receiver only means nobody is watching.
        let _ = self.send(snapshot);
    }
}

/// Final state of a run, with the untruncated table.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub phase: Phase,
    pub status: String,
    pub summary: String,
    pub records: Vec<CrawlRecord>,
    pub charts: ChartArtifacts,
    pub output_path: Option<PathBuf>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.phase == Phase::Done
    }
}

/// Mutable state of one run. Only the processor touches it.
struct RunState<'o> {
    observer: &'o mut dyn RunObserver,
    preview_chars: usize,
    phase: Phase,
    status: String,
    summary: String,
    records: Vec<CrawlRecord>,
    charts: ChartArtifacts,
    output_path: Option<PathBuf>,
}

impl<'o> RunState<'o> {
    fn new(observer: &'o mut dyn RunObserver, preview_chars: usize) -> Self {
        Self {
            observer,
            preview_chars,
            phase: Phase::Init,
            status: String::from("Starting task..."),
            summary: String::from(SUMMARY_PENDING),
            records: Vec::new(),
            charts: ChartArtifacts::default(),
            output_path: None,
        }
    }

    /// Moves to `phase` with `status` and emits one snapshot.
    fn transition(&mut self, phase: Phase, status: impl Into<String>) {
        self.phase = phase;
        self.status = status.into();
        self.emit();
    }

    fn emit(&mut self) {
        let snapshot = RunSnapshot {
            phase: self.phase.clone(),
            status: self.status.clone(),
            summary: self.summary.clone(),
            table: display_table(&self.records, self.preview_chars),
            charts: self.charts.clone(),
            output_path: self.output_path.clone(),
            controls_enabled: self.phase.is_terminal(),
        };
        self.observer.on_snapshot(snapshot);
    }

    fn fail(mut self, failure: RunFailure, status: String) -> RunReport {
        warn!(reason = %failure, "Run failed");
        self.transition(Phase::Failed(failure), status);
        self.into_report()
    }

    fn into_report(self) -> RunReport {
        RunReport {
            phase: self.phase,
            status: self.status,
            summary: self.summary,
            records: self.records,
            charts: self.charts,
            output_path: self.output_path,
        }
    }
}

/// Orchestrates candidate resolution, crawling, scoring, summarization and persistence.
pub struct TaskProcessor {
    config: AnalyzerConfig,
    launcher: Arc<dyn ExtractorLauncher>,
    registry: BackendRegistry,
    summarizer: Arc<dyn Summarizer>,
    store: Arc<dyn RecordStore>,
    scorer: SentimentScorer,
}

impl TaskProcessor {
    pub fn new(
        config: AnalyzerConfig,
        launcher: Arc<dyn ExtractorLauncher>,
        registry: BackendRegistry,
        summarizer: Arc<dyn Summarizer>,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        let scorer = SentimentScorer::new(&config.sentiment);
        Self {
            config,
            launcher,
            registry,
            summarizer,
            store,
            scorer,
        }
    }

    /// Wires the production components described by `config`.
    pub fn from_config(config: AnalyzerConfig) -> crate::Result<Self> {
        let launcher = Arc::new(StrategyLauncher::new(config.crawler.clone()));
        let registry = BackendRegistry::with_defaults(&config.search)?;
        let summarizer = Arc::new(LLMProcessor::new(config.llm.clone())?);
        let store = Arc::new(CsvStore::new(config.output.dir.clone()));
        Ok(Self::new(config, launcher, registry, summarizer, store))
    }

    /// Executes one run to completion, reporting progress to `observer`.
    ///
    /// Input, initialization and resolution failures end the run in [`Phase::Failed`];
    /// the final snapshot always has `controls_enabled` set. The extractor is shut
    /// down exactly once whenever it was acquired.
    #[instrument(skip(self, mode, observer), fields(query = %mode.query()))]
    pub async fn run(&self, mode: RunMode, observer: &mut dyn RunObserver) -> RunReport {
        let mut state = RunState::new(observer, self.config.crawler.preview_chars);

        if let Err(e) = mode.validate() {
            let status = format!("Error: {}.", e);
            return state.fail(e.into(), status);
        }

        let mut extractor = match self.launcher.launch().await {
            Ok(extractor) => extractor,
            Err(e) => {
                error!(error = %e, "Extractor initialization failed");
                state.summary = String::from(
                    "Make sure crawler.browser_executable points to a Chrome/Chromium binary, \
                     or use the http crawler strategy.",
                );
                let status = format!("Error: {}.", e);
                return state.fail(e.into(), status);
            }
        };
        info!(extractor = extractor.name(), "Extractor acquired");
        state.emit();

        let result = self.crawl_pipeline(&mode, extractor.as_ref(), &mut state).await;
        extractor.shutdown().await;

        match result {
            Ok(status) => {
                state.transition(Phase::Done, status);
                state.into_report()
            }
            Err(failure) => {
                let status = match &failure {
                    RunFailure::Resolution(_) => String::from("No matching results were found."),
                    other => format!("Error: {}.", other),
                };
                state.fail(failure, status)
            }
        }
    }

    async fn crawl_pipeline(
        &self,
        mode: &RunMode,
        extractor: &dyn ContentExtractor,
        state: &mut RunState<'_>,
    ) -> Result<String, RunFailure> {
        state.transition(Phase::ResolvingCandidates, "Preparing candidates...");
        let candidates = {
            let mut on_progress = |progress: ResolveProgress| match progress {
                ResolveProgress::CountAdjusted { per_engine_count } => state.transition(
                    Phase::ResolvingCandidates,
                    format!(
                        "Note: per-engine search count was raised to {} to cover the crawl count",
                        per_engine_count
                    ),
                ),
                ResolveProgress::Searching { engines } => state.transition(
                    Phase::ResolvingCandidates,
                    format!("Searching with {}...", engines.join(", ")),
                ),
            };
            ResultSource::new(&self.registry)
                .resolve(mode, &mut on_progress)
                .await?
        };

        let crawl_count = match mode {
            RunMode::Search(request) => request.crawl_count,
            RunMode::DirectUrls(_) => candidates.len(),
        };
        let subset = &candidates[..crawl_count.min(candidates.len())];
        state.records = subset
            .iter()
            .enumerate()
            .map(|(i, candidate)| CrawlRecord::pending(i + 1, candidate))
            .collect();
        state.transition(
            Phase::Crawling {
                index: 0,
                total: subset.len(),
            },
            "Search complete, crawling pages...",
        );

        let mut full_content = String::new();
        let mut sentiments = Vec::new();
        let total = subset.len();
        for index in 0..total {
            state.transition(
                Phase::Crawling {
                    index: index + 1,
                    total,
                },
                format!("Crawling page {}/{}...", index + 1, total),
            );

            let link = state.records[index].link.clone();
            let outcome = extractor.extract(&link).await;
            let record = &mut state.records[index];
            match outcome {
                Ok(text) => {
                    let sentiment = self.scorer.analyze(Some(&text));
                    full_content.push_str(&text);
                    full_content.push('\n');
                    sentiments.push(sentiment);
                    record.status = CrawlStatus::Success;
                    record.sentiment = sentiment;
                    record.extracted_text = text;
                }
                Err(reason) => {
                    warn!(url = %link, reason = %reason, "Extraction failed");
                    record.status = CrawlStatus::Failure(reason);
                }
            }
            state.emit();

            let pacing = self.config.crawler.pacing();
            if !pacing.is_zero() {
                tokio::time::sleep(pacing).await;
            }
        }

        if !full_content.is_empty() {
            state.transition(Phase::Charting, "Generating charts...");
            state.charts = ChartArtifacts {
                sentiment: sentiment_distribution(&sentiments),
                hot_terms: hot_terms(&full_content, DEFAULT_HOT_TERM_LIMIT),
            };
            state.emit();
        }

        if self.should_summarize(mode, &full_content) {
            state.transition(Phase::Summarizing, "Calling the LLM for a summary...");
            let summary = self.summarizer.summarize(&full_content, mode.query()).await;
            let links: Vec<String> = state.records.iter().map(|r| r.link.clone()).collect();
            state.summary = format_summary(&summary, &links);
        } else {
            state.summary = String::from(SUMMARY_SKIPPED);
        }

        state.transition(Phase::Persisting, "Saving results...");
        match self.store.save(&state.records, mode.query()) {
            Ok(path) => {
                state.output_path = Some(path);
                Ok(String::from("Task complete!"))
            }
            Err(e) => {
                error!(error = %e, "Failed to save results");
                Ok(format!("Task complete, but saving failed: {}", e))
            }
        }
    }

    /// Summaries run only for free-form search runs with a credential and some content.
    fn should_summarize(&self, mode: &RunMode, content: &str) -> bool {
        let RunMode::Search(request) = mode else {
            return false;
        };
        !request.preset && self.summarizer.has_credential() && !content.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Sentiment;
    use crate::ExtractionError;
    use async_trait::async_trait;

    struct EchoExtractor;

    #[async_trait]
    impl ContentExtractor for EchoExtractor {
        async fn extract(&self, url: &str) -> Result<String, ExtractionError> {
            Ok(format!("content from {url} is bullish"))
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    struct EchoLauncher;

    #[async_trait]
    impl ExtractorLauncher for EchoLauncher {
        async fn launch(&self) -> Result<Box<dyn ContentExtractor>, crate::InitError> {
            Ok(Box::new(EchoExtractor))
        }
    }

    struct NoSummary;

    #[async_trait]
    impl Summarizer for NoSummary {
        fn has_credential(&self) -> bool {
            false
        }

        async fn summarize(&self, _content: &str, _topic: &str) -> String {
            unreachable!("summarizer must not be called without a credential")
        }
    }

    struct NullStore;

    impl RecordStore for NullStore {
        fn save(&self, _records: &[CrawlRecord], _query: &str) -> crate::Result<PathBuf> {
            Err(std::io::Error::other("disk full").into())
        }
    }

    #[tokio::test]
    async fn test_store_failure_does_not_fail_run() {
        let mut config = AnalyzerConfig::default();
        config.crawler.pacing_ms = 0;
        let processor = TaskProcessor::new(
            config,
            Arc::new(EchoLauncher),
            BackendRegistry::new(),
            Arc::new(NoSummary),
            Arc::new(NullStore),
        );

        let mut snapshots: Vec<RunSnapshot> = Vec::new();
        let report = processor
            .run(RunMode::from_url_list("https://a.example"), &mut snapshots)
            .await;

        assert!(report.succeeded());
        assert!(report.status.contains("saving failed"));
        assert!(report.output_path.is_none());
        assert_eq!(report.records[0].sentiment, Sentiment::Bullish);
        assert!(snapshots.last().unwrap().controls_enabled);
    }
}
