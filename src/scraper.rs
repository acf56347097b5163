use crate::config::{CrawlerConfig, ExtractorStrategy};
use crate::{ExtractionError, InitError};
use async_trait::async_trait;
use rand::seq::IndexedRandom;
use reqwest::header::USER_AGENT;
use reqwest::{Client, Proxy};
use scraper::{Html, Selector};
use tracing::{debug, info, instrument, warn};

/// Tags removed before text extraction by every strategy.
pub const NON_CONTENT_TAGS: &[&str] = &["script", "style", "nav", "header", "footer", "aside", "form"];
/// Extra tags the HTTP strategy also removes.
pub const FIGURE_TAGS: &[&str] = &["figure", "figcaption"];

/// A line survives only with more than this many whitespace-separated tokens.
const MIN_LINE_TOKENS: usize = 2;

/// Extracts main page text from a URL.
///
/// `Ok` always carries non-empty text. Implementations never panic on network
/// or parse failures; every failure is mapped to an [`ExtractionError`].
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    async fn extract(&self, url: &str) -> Result<String, ExtractionError>;

    /// Releases the underlying resource. Called once when the run ends.
    async fn shutdown(&mut self) {}

    fn name(&self) -> &str;
}

/// Acquires a [`ContentExtractor`] at the start of a run.
#[async_trait]
pub trait ExtractorLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn ContentExtractor>, InitError>;
}

/// Launches the extractor named by `crawler.strategy`.
pub struct StrategyLauncher {
    config: CrawlerConfig,
}

impl StrategyLauncher {
    pub fn new(config: CrawlerConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ExtractorLauncher for StrategyLauncher {
    async fn launch(&self) -> Result<Box<dyn ContentExtractor>, InitError> {
        match self.config.strategy {
            ExtractorStrategy::Http => Ok(Box::new(HttpExtractor::new(&self.config)?)),
            ExtractorStrategy::Browser => Ok(Box::new(
                crate::browser::BrowserExtractor::launch(&self.config).await?,
            )),
        }
    }
}

/// Returns `true` for `http://` and `https://` URLs.
pub fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// The `ContentScraper` struct locates the main content region of an HTML document
/// and turns it into newline-separated text.
pub struct ContentScraper {
    /// Content landmarks, tried in order. The first match outside a stripped tag wins.
    landmarks: Vec<Selector>,
    /// Elements whose subtree is ignored.
    strip_tags: Vec<String>,
}

impl Default for ContentScraper {
    /// Scraper used for plain HTTP pages: strips figures as well.
    fn default() -> Self {
        Self::new(NON_CONTENT_TAGS.iter().chain(FIGURE_TAGS))
    }
}

impl ContentScraper {
    /// Creates a scraper that ignores the given tags.
    pub fn new(strip_tags: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        let landmarks = ["article", "main", "body"]
            .into_iter()
            .filter_map(|s| Selector::parse(s).ok())
            .collect();

        Self {
            landmarks,
            strip_tags: strip_tags
                .into_iter()
                .map(|t| t.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }

    /// Scraper used for browser-rendered pages.
    pub fn for_browser() -> Self {
        Self::new(NON_CONTENT_TAGS)
    }

    fn is_stripped(&self, name: &str) -> bool {
        self.strip_tags.iter().any(|t| t == name)
    }

    /// Extracts the main text of `html`.
    ///
    /// Lines with two or fewer whitespace-separated tokens are dropped as noise.
    #[instrument(skip(self, html), fields(html_length = html.len()))]
    pub fn extract(&self, html: &str) -> Result<String, ExtractionError> {
        let document = Html::parse_document(html);

        let root = self
            .landmarks
            .iter()
            .find_map(|selector| {
                document.select(selector).find(|element| {
                    !element.ancestors().any(|node| {
                        node.value()
                            .as_element()
                            .is_some_and(|e| self.is_stripped(e.name()))
                    })
                })
            })
            .ok_or(ExtractionError::NoContentRegion)?;

        let root_id = root.id();
        let mut fragments = Vec::new();
        for node in root.descendants() {
            let Some(text) = node.value().as_text() else {
                continue;
            };
            let hidden = node
                .ancestors()
                .take_while(|ancestor| ancestor.id() != root_id)
                .any(|ancestor| {
                    ancestor
                        .value()
                        .as_element()
                        .is_some_and(|e| self.is_stripped(e.name()))
                });
            if hidden {
                continue;
            }
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                fragments.push(trimmed);
            }
        }

        let content = fragments
            .join("\n")
            .lines()
            .map(str::trim)
            .filter(|line| line.split_whitespace().count() > MIN_LINE_TOKENS)
            .collect::<Vec<_>>()
            .join("\n");

        if content.is_empty() {
            debug!("No line survived the noise filter");
            return Err(ExtractionError::EmptyContent);
        }
        Ok(content)
    }
}

/// Plain HTTP extraction strategy.
///
/// Every request uses a random user agent and, when proxies are configured, a random proxy.
pub struct HttpExtractor {
    /// One client per configured proxy, or a single direct client.
    clients: Vec<Client>,
    user_agents: Vec<String>,
    scraper: ContentScraper,
}

impl HttpExtractor {
    pub fn new(config: &CrawlerConfig) -> Result<Self, InitError> {
        let build = |proxy: Option<&str>| -> Result<Client, InitError> {
            let mut builder = Client::builder().timeout(config.timeout()).gzip(true);
            if let Some(proxy) = proxy {
                let proxy = Proxy::all(proxy).map_err(|e| InitError::HttpClient(e.to_string()))?;
                builder = builder.proxy(proxy);
            }
            builder
                .build()
                .map_err(|e| InitError::HttpClient(e.to_string()))
        };

        let clients = if config.proxies.is_empty() {
            vec![build(None)?]
        } else {
            config
                .proxies
                .iter()
                .map(|p| build(Some(p.as_str())))
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(Self {
            clients,
            user_agents: config.user_agents.clone(),
            scraper: ContentScraper::default(),
        })
    }
}

#[async_trait]
impl ContentExtractor for HttpExtractor {
    #[instrument(skip(self))]
    async fn extract(&self, url: &str) -> Result<String, ExtractionError> {
        if !is_http_url(url) {
            return Err(ExtractionError::InvalidUrl);
        }

        let (client, user_agent) = {
            let mut rng = rand::rng();
            (
                self.clients.choose(&mut rng).cloned(),
                self.user_agents.choose(&mut rng).cloned(),
            )
        };
        let client = client.ok_or(ExtractionError::Unknown)?;

        let mut request = client.get(url);
        if let Some(user_agent) = user_agent {
            request = request.header(USER_AGENT, user_agent);
        }

        let response = request.send().await.map_err(classify_request_error)?;
        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            warn!(url, status = status.as_u16(), "Page returned an error status");
            return Err(ExtractionError::HttpStatus(status.as_u16()));
        }

        let html = response.text().await.map_err(classify_request_error)?;
        let content = self.scraper.extract(&html)?;

        info!(url, length = content.len(), "Extracted page content");
        Ok(content)
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Maps a transport error to the extraction failure taxonomy.
pub fn classify_request_error(error: reqwest::Error) -> ExtractionError {
    if error.is_timeout() {
        return ExtractionError::Timeout;
    }
    if let Some(status) = error.status() {
        return ExtractionError::HttpStatus(status.as_u16());
    }
    if error.is_builder() {
        return ExtractionError::InvalidUrl;
    }

    let category = if error.is_connect() {
        "ConnectionError"
    } else if error.is_redirect() {
        "TooManyRedirects"
    } else if error.is_decode() || error.is_body() {
        "ContentDecodingError"
    } else {
        "RequestException"
    };
    warn!(error = %error, category, "Request failed");
    ExtractionError::RequestFailed(category.to_string())
}
