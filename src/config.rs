use crate::types::TimePeriod;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Environment variable prefix, e.g. `NEWSLENS_LLM__API_KEY`.
pub const ENV_PREFIX: &str = "NEWSLENS";
/// Config file picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "newslens.toml";

/// The `AnalyzerConfig` struct holds every setting the pipeline reads.
/// It is passed explicitly into each component; nothing reads global state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// The configuration settings for the Language Model (LLM).
    pub llm: LLMConfig,
    /// Page fetching settings.
    pub crawler: CrawlerConfig,
    /// Search fan-out settings.
    pub search: SearchConfig,
    /// Keyword lists for the sentiment scorer.
    pub sentiment: SentimentLexicon,
    pub output: OutputConfig,
    pub presets: PresetConfig,
}

/// The `LLMConfig` struct holds the settings for the OpenAI-compatible summarization endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LLMConfig {
    /// API key; empty or the sample placeholder means "not configured".
    pub api_key: String,
    /// Alternate endpoint base URL, e.g. `https://api.deepseek.com/v1`.
    pub base_url: Option<String>,
    pub model: String,
    /// The temperature setting for the LLM, controlling the randomness of the output.
    pub temperature: f32,
    /// The maximum number of tokens allowed in the LLM response.
    pub max_tokens: u32,
    /// Content longer than this many characters is cut before submission.
    pub max_content_chars: usize,
    pub timeout_secs: u64,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: None,
            model: String::from("gpt-3.5-turbo"),
            temperature: 0.2,
            max_tokens: 1024,
            max_content_chars: 15_000,
            timeout_secs: 60,
        }
    }
}

impl LLMConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Which content extractor a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractorStrategy {
    /// Headless Chromium, renders JavaScript.
    #[default]
    Browser,
    /// Plain HTTP GET.
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    pub strategy: ExtractorStrategy,
    pub timeout_secs: u64,
    /// One is picked at random for every request.
    pub user_agents: Vec<String>,
    /// Optional proxy URLs; one is picked at random for every request.
    pub proxies: Vec<String>,
    /// Chrome/Chromium binary. Auto-detected when unset.
    pub browser_executable: Option<PathBuf>,
    /// How long the browser waits after navigation before reading the page.
    pub render_wait_ms: u64,
    /// Delay between two crawled pages, for UI pacing only.
    pub pacing_ms: u64,
    /// Characters of extracted text shown per row in progress snapshots.
    pub preview_chars: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            strategy: ExtractorStrategy::default(),
            timeout_secs: crate::DEFAULT_CRAWL_TIMEOUT.as_secs(),
            user_agents: vec![
                String::from("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/117.0.0.0 Safari/537.36"),
                String::from("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/117.0.0.0 Safari/537.36"),
            ],
            proxies: Vec::new(),
            browser_executable: None,
            render_wait_ms: 3000,
            pacing_ms: 200,
            preview_chars: 150,
        }
    }
}

impl CrawlerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn render_wait(&self) -> Duration {
        Duration::from_millis(self.render_wait_ms)
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Backend names, matched case-insensitively.
    pub engines: Vec<String>,
    pub time_period: TimePeriod,
    /// Results requested from each backend.
    pub per_engine_count: usize,
    /// Total number of candidates to crawl.
    pub crawl_count: usize,
    pub timeout_secs: u64,
    /// The user agent string sent to search backends.
    pub user_agent: String,
    pub bing_base_url: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            engines: vec![String::from("Bing")],
            time_period: TimePeriod::Any,
            per_engine_count: 10,
            crawl_count: 5,
            timeout_secs: crate::DEFAULT_SEARCH_TIMEOUT.as_secs(),
            user_agent: String::from("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36"),
            bing_base_url: String::from("https://www.bing.com"),
        }
    }
}

impl SearchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Bullish and bearish keyword lists. Duplicates are allowed and count twice.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentLexicon {
    pub bullish: Vec<String>,
    pub bearish: Vec<String>,
}

impl Default for SentimentLexicon {
    fn default() -> Self {
        let owned = |words: &[&str]| words.iter().map(|w| w.to_string()).collect();
        Self {
            bullish: owned(crate::sentiment::BULLISH_WORDS),
            bearish: owned(crate::sentiment::BEARISH_WORDS),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving one CSV file per run.
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
        }
    }
}

/// Quick-run coin symbols.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresetConfig {
    pub coins: Vec<String>,
    /// Appended to the coin symbol to build the search query.
    pub query_suffix: String,
}

impl Default for PresetConfig {
    fn default() -> Self {
        Self {
            coins: ["BTC", "ETH", "SOL", "BNB"].iter().map(|c| c.to_string()).collect(),
            query_suffix: String::from("latest news"),
        }
    }
}

impl PresetConfig {
    pub fn query_for(&self, coin: &str) -> String {
        format!("{} {}", coin, self.query_suffix)
    }
}

impl AnalyzerConfig {
    /// Loads configuration from built-in defaults, then an optional TOML file, then
    /// `NEWSLENS_*` environment variables (`__` separates nested keys).
    ///
    /// When `path` is `None`, `newslens.toml` in the working directory is used if it exists.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => ::config::File::from(p).required(true),
            None => ::config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings = ::config::Config::builder()
            .add_source(file)
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AnalyzerConfig = settings.try_deserialize()?;
        debug!(
            engines = ?config.search.engines,
            strategy = ?config.crawler.strategy,
            model = %config.llm.model,
            "Configuration loaded"
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AnalyzerConfig::default();

        assert_eq!(config.llm.model, "gpt-3.5-turbo");
        assert_eq!(config.llm.max_content_chars, 15_000);
        assert_eq!(config.crawler.strategy, ExtractorStrategy::Browser);
        assert_eq!(config.crawler.preview_chars, 150);
        assert_eq!(config.search.engines, vec!["Bing".to_string()]);
        assert_eq!(config.presets.coins.len(), 4);
        assert!(config.sentiment.bullish.iter().any(|w| w == "突破"));
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[llm]
model = "deepseek-chat"
base_url = "https://api.deepseek.com/v1"

[crawler]
strategy = "http"
pacing_ms = 0

[search]
engines = ["Bing", "Google"]
crawl_count = 12
"#
        )
        .unwrap();

        let config = AnalyzerConfig::load(Some(file.path())).unwrap();

        assert_eq!(config.llm.model, "deepseek-chat");
        assert_eq!(config.llm.base_url.as_deref(), Some("https://api.deepseek.com/v1"));
        assert_eq!(config.llm.max_tokens, 1024);
        assert_eq!(config.crawler.strategy, ExtractorStrategy::Http);
        assert_eq!(config.crawler.pacing(), Duration::ZERO);
        assert_eq!(config.search.engines.len(), 2);
        assert_eq!(config.search.crawl_count, 12);
        assert_eq!(config.search.per_engine_count, 10);
    }

    #[test]
    fn test_preset_query() {
        let presets = PresetConfig::default();
        assert_eq!(presets.query_for("BTC"), "BTC latest news");
    }
}
