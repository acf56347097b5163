use crate::config::SearchConfig;
use crate::types::{CandidateResult, TimePeriod};
use crate::{AnalyzerError, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use scraper::{Html, Selector};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Whether a backend returns live data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Scrapes a real search engine.
    Live,
    /// Non-functional stand-in that returns a fixed sample result.
    Placeholder,
}

/// A search engine queried by name.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Display name, also used as the result source label.
    fn name(&self) -> &str;

    fn kind(&self) -> BackendKind;

    /// Returns at most `max_results` candidates for `query`.
    async fn search(
        &self,
        query: &str,
        period: TimePeriod,
        max_results: usize,
    ) -> Result<Vec<CandidateResult>>;
}

/// Backends selectable by name.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    backends: Vec<Arc<dyn SearchBackend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with Bing (live) and the Google, Baidu and DuckDuckGo placeholders.
    pub fn with_defaults(config: &SearchConfig) -> Result<Self> {
        Ok(Self::new()
            .register(BingSearch::new(config)?)
            .register(PlaceholderSearch::google())
            .register(PlaceholderSearch::baidu())
            .register(PlaceholderSearch::duckduckgo()))
    }

    pub fn register(mut self, backend: impl SearchBackend + 'static) -> Self {
        self.backends.push(Arc::new(backend));
        self
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<Arc<dyn SearchBackend>> {
        self.backends
            .iter()
            .find(|b| b.name().eq_ignore_ascii_case(name.trim()))
            .cloned()
    }

    /// Resolves `names` in order. Unknown names are skipped with a warning.
    pub fn select(&self, names: &[String]) -> Vec<Arc<dyn SearchBackend>> {
        names
            .iter()
            .filter_map(|name| {
                let backend = self.get(name);
                if backend.is_none() {
                    warn!(engine = %name, "Unsupported search engine skipped");
                }
                backend
            })
            .collect()
    }
}

/// The `BingSearch` backend scrapes Bing's HTML result page.
pub struct BingSearch {
    /// The HTTP client used for making requests.
    client: Client,
    base_url: String,
}

impl BingSearch {
    pub const NAME: &'static str = "Bing";

    /// Creates a new `BingSearch` with the given configuration.
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout())
            .gzip(true)
            .build()
            .map_err(AnalyzerError::RequestError)?;

        Ok(Self {
            client,
            base_url: config.bing_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Builds the result-page URL, including the freshness filter.
    pub fn search_url(&self, query: &str, period: TimePeriod) -> String {
        let mut url = format!("{}/search?q={}", self.base_url, urlencoding::encode(query));
        let filter = match period {
            TimePeriod::Any => None,
            TimePeriod::Day => Some("ez1"),
            TimePeriod::Week => Some("ez2"),
            TimePeriod::Month => Some("ez3"),
        };
        if let Some(filter) = filter {
            url.push_str(&format!(
                "&filters={}",
                urlencoding::encode(&format!("ex1:\"{}\"", filter))
            ));
        }
        url
    }

    /// Extracts results from a Bing result page.
    ///
    /// Each `li.b_algo` contributes its `h2` text as title, its first link as URL
    /// and `div.b_caption` as snippet. Items without a title or link are skipped.
    pub fn parse_results(&self, html: &str, max_results: usize) -> Vec<CandidateResult> {
        let document = Html::parse_document(html);
        let (Ok(item_sel), Ok(title_sel), Ok(link_sel), Ok(snippet_sel)) = (
            Selector::parse("li.b_algo"),
            Selector::parse("h2"),
            Selector::parse("a[href]"),
            Selector::parse("div.b_caption"),
        ) else {
            return Vec::new();
        };

        let discovered_at = Utc::now();
        document
            .select(&item_sel)
            .take(max_results)
            .filter_map(|item| {
                let title = item.select(&title_sel).next()?;
                let link = item.select(&link_sel).next()?.value().attr("href")?;
                if link.is_empty() {
                    return None;
                }
                let snippet = item
                    .select(&snippet_sel)
                    .next()
                    .map(|s| s.text().collect::<String>().trim().to_string())
                    .unwrap_or_default();
                let title = title.text().collect::<String>().trim().to_string();

                debug!(link, "Found Bing result");
                Some(CandidateResult::new(
                    title,
                    link,
                    snippet,
                    Self::NAME,
                    Some(discovered_at),
                ))
            })
            .collect()
    }
}

#[async_trait]
impl SearchBackend for BingSearch {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Live
    }

    async fn search(
        &self,
        query: &str,
        period: TimePeriod,
        max_results: usize,
    ) -> Result<Vec<CandidateResult>> {
        let url = self.search_url(query, period);
        debug!("Search URL: {}", url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .header("Accept-Language", "en-US,en;q=0.5")
            .send()
            .await?
            .error_for_status()?;

        let html = response.text().await?;
        let results = self.parse_results(&html, max_results);
        info!(engine = Self::NAME, count = results.len(), "Search finished");
        Ok(results)
    }
}

/// Placeholder backend: does not search, always returns one sample result.
pub struct PlaceholderSearch {
    name: &'static str,
    sample: CandidateResult,
}

impl PlaceholderSearch {
    pub fn new(name: &'static str, title: &str, link: &str, snippet: &str) -> Self {
        Self {
            name,
            sample: CandidateResult::new(title, link, snippet, name, None),
        }
    }

    pub fn google() -> Self {
        Self::new(
            "Google",
            "[Sample] Google Result",
            "http://google.com",
            "This is a sample from Google.",
        )
    }

    pub fn baidu() -> Self {
        Self::new(
            "Baidu",
            "[Sample] Baidu Result",
            "http://baidu.com",
            "This is a sample result from Baidu.",
        )
    }

    pub fn duckduckgo() -> Self {
        Self::new(
            "DuckDuckGo",
            "[Sample] DuckDuckGo Result",
            "http://duckduckgo.com",
            "This is a sample result from DuckDuckGo.",
        )
    }
}

#[async_trait]
impl SearchBackend for PlaceholderSearch {
    fn name(&self) -> &str {
        self.name
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Placeholder
    }

    async fn search(
        &self,
        _query: &str,
        _period: TimePeriod,
        _max_results: usize,
    ) -> Result<Vec<CandidateResult>> {
        warn!(engine = self.name, "Placeholder search engine returns sample data only");
        Ok(vec![self.sample.clone()])
    }
}
