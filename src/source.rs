//! Candidate resolution: direct URL lists and aggregated search.

use crate::search::BackendRegistry;
use crate::types::{CandidateResult, RunFailure, TimePeriod};
use crate::{InputError, ResolutionError};
use std::collections::HashSet;
use tracing::{info, warn};

/// Source label of user-supplied URLs.
pub const DIRECT_SOURCE: &str = "User specified";

/// Parameters of an aggregated search run.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub engines: Vec<String>,
    pub time_period: TimePeriod,
    pub per_engine_count: usize,
    pub crawl_count: usize,
    /// Started from a preset coin rather than a free-form query. Skips summarization.
    pub preset: bool,
}

/// Where the candidates of a run come from.
#[derive(Debug, Clone, PartialEq)]
pub enum RunMode {
    Search(SearchRequest),
    /// Every URL is crawled; the order is preserved.
    DirectUrls(Vec<String>),
}

impl RunMode {
    /// Direct-URL mode from newline-separated text. Blank lines are ignored.
    pub fn from_url_list(text: &str) -> Self {
        RunMode::DirectUrls(
            text.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from)
                .collect(),
        )
    }

    /// Query used for persistence and the summary prompt.
    pub fn query(&self) -> &str {
        match self {
            RunMode::Search(request) => &request.query,
            RunMode::DirectUrls(_) => "Targeted Crawl",
        }
    }

    /// Rejects input that cannot start a run.
    pub fn validate(&self) -> Result<(), InputError> {
        match self {
            RunMode::DirectUrls(urls) if urls.iter().all(|u| u.trim().is_empty()) => {
                Err(InputError::EmptyUrlList)
            }
            RunMode::Search(request) if request.engines.iter().all(|e| e.trim().is_empty()) => {
                Err(InputError::NoEngineSelected)
            }
            _ => Ok(()),
        }
    }
}

/// Progress reported while resolving, before the corresponding blocking step.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveProgress {
    /// The per-engine count was raised to cover the crawl count.
    CountAdjusted { per_engine_count: usize },
    /// Backends are about to be queried.
    Searching { engines: Vec<String> },
}

/// Per-engine count needed so that `backend_count` engines can supply `crawl_count`
/// results, or `None` when `per_engine_count` already suffices.
pub fn adjusted_per_engine_count(
    crawl_count: usize,
    per_engine_count: usize,
    backend_count: usize,
) -> Option<usize> {
    if backend_count == 0 || crawl_count <= per_engine_count.saturating_mul(backend_count) {
        return None;
    }
    Some(crawl_count.div_ceil(backend_count))
}

/// Keeps the first occurrence of every link, preserving order.
pub fn dedup_by_link(results: Vec<CandidateResult>) -> Vec<CandidateResult> {
    let mut seen = HashSet::new();
    results
        .into_iter()
        .filter(|r| seen.insert(r.link.clone()))
        .collect()
}

/// Wraps user-supplied URLs as candidates.
pub fn direct_candidates(urls: &[String]) -> Result<Vec<CandidateResult>, InputError> {
    let candidates: Vec<CandidateResult> = urls
        .iter()
        .map(|u| u.trim())
        .filter(|u| !u.is_empty())
        .enumerate()
        .map(|(i, url)| {
            CandidateResult::new(format!("Specified URL {}", i + 1), url, "", DIRECT_SOURCE, None)
        })
        .collect();

    if candidates.is_empty() {
        return Err(InputError::EmptyUrlList);
    }
    Ok(dedup_by_link(candidates))
}

/// Resolves a [`RunMode`] into an ordered, deduplicated candidate list.
pub struct ResultSource<'a> {
    registry: &'a BackendRegistry,
}

impl<'a> ResultSource<'a> {
    pub fn new(registry: &'a BackendRegistry) -> Self {
        Self { registry }
    }

    pub async fn resolve(
        &self,
        mode: &RunMode,
        on_progress: &mut (dyn FnMut(ResolveProgress) + Send),
    ) -> Result<Vec<CandidateResult>, RunFailure> {
        match mode {
            RunMode::DirectUrls(urls) => Ok(direct_candidates(urls)?),
            RunMode::Search(request) => self.search(request, on_progress).await,
        }
    }

    async fn search(
        &self,
        request: &SearchRequest,
        on_progress: &mut (dyn FnMut(ResolveProgress) + Send),
    ) -> Result<Vec<CandidateResult>, RunFailure> {
        let backends = self.registry.select(&request.engines);
        if backends.is_empty() {
            return Err(InputError::NoEngineSelected.into());
        }

        let mut per_engine_count = request.per_engine_count;
        if let Some(adjusted) =
            adjusted_per_engine_count(request.crawl_count, per_engine_count, backends.len())
        {
            info!(from = per_engine_count, to = adjusted, "Raised per-engine search count");
            per_engine_count = adjusted;
            on_progress(ResolveProgress::CountAdjusted {
                per_engine_count: adjusted,
            });
        }

        on_progress(ResolveProgress::Searching {
            engines: backends.iter().map(|b| b.name().to_string()).collect(),
        });

        let mut all_results = Vec::new();
        for backend in &backends {
            match backend
                .search(&request.query, request.time_period, per_engine_count)
                .await
            {
                Ok(results) => all_results.extend(results),
                Err(e) => warn!(engine = backend.name(), error = %e, "Search backend failed"),
            }
        }

        let candidates = dedup_by_link(all_results);
        if candidates.is_empty() {
            return Err(ResolutionError::NoCandidates.into());
        }
        info!(count = candidates.len(), "Resolved candidates");
        Ok(candidates)
    }
}
