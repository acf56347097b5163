//! Headless-browser extraction strategy.
//!
//! One Chromium process is launched per run and must be released with
//! [`ContentExtractor::shutdown`] when the run ends.

use crate::config::CrawlerConfig;
use crate::scraper::{is_http_url, ContentExtractor, ContentScraper};
use crate::{ExtractionError, InitError};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

/// A running browser together with its CDP event handler task.
struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    user_data_dir: Option<PathBuf>,
}

impl BrowserSession {
    /// Removes the profile directory. Must run after the browser process exited.
    fn cleanup_temp_dir(&mut self) {
        if let Some(path) = self.user_data_dir.take() {
            if let Err(e) = std::fs::remove_dir_all(&path) {
                warn!(path = %path.display(), error = %e, "Failed to clean up browser profile");
            }
        }
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.handler.abort();
        if self.user_data_dir.is_some() {
            warn!("Browser session dropped without shutdown, removing profile in Drop");
            self.cleanup_temp_dir();
        }
    }
}

/// Extracts page text from a headless Chromium instance, so JavaScript-rendered pages work.
pub struct BrowserExtractor {
    session: Option<BrowserSession>,
    timeout: Duration,
    render_wait: Duration,
    scraper: ContentScraper,
}

impl BrowserExtractor {
    /// Launches the browser. Fails with [`InitError::BrowserLaunch`] when Chromium cannot be
    /// found or started.
    pub async fn launch(config: &CrawlerConfig) -> Result<Self, InitError> {
        let user_data_dir = std::env::temp_dir().join(format!(
            "newslens_chrome_{}_{}",
            std::process::id(),
            chrono::Utc::now().timestamp_millis()
        ));
        std::fs::create_dir_all(&user_data_dir)
            .map_err(|e| InitError::BrowserLaunch(format!("profile directory: {e}")))?;

        let mut builder = BrowserConfig::builder()
            .request_timeout(config.timeout())
            .user_data_dir(user_data_dir.clone())
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg("--log-level=3")
            .arg("--disable-logging")
            .arg("--mute-audio");
        if let Some(user_agent) = config.user_agents.first() {
            builder = builder.arg(format!("--user-agent={user_agent}"));
        }
        if let Some(path) = &config.browser_executable {
            builder = builder.chrome_executable(path);
        }

        let browser_config = match builder.build() {
            Ok(c) => c,
            Err(e) => {
                let _ = std::fs::remove_dir_all(&user_data_dir);
                return Err(InitError::BrowserLaunch(e));
            }
        };

        let (browser, mut handler) = match Browser::launch(browser_config).await {
            Ok(launched) => launched,
            Err(e) => {
                error!(error = %e, "Could not start headless browser; check crawler.browser_executable");
                let _ = std::fs::remove_dir_all(&user_data_dir);
                return Err(InitError::BrowserLaunch(e.to_string()));
            }
        };

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = ?e, "Browser handler error");
                }
            }
        });

        info!("Headless browser started");
        Ok(Self {
            session: Some(BrowserSession {
                browser,
                handler,
                user_data_dir: Some(user_data_dir),
            }),
            timeout: config.timeout(),
            render_wait: config.render_wait(),
            scraper: ContentScraper::for_browser(),
        })
    }
}

/// An open browser tab.
#[async_trait]
trait RenderedTab: Send + Sync + Sized {
    /// Waits for the page to settle and returns its rendered source.
    async fn source(&self, render_wait: Duration) -> Result<String, CdpError>;

    async fn close(self);
}

#[async_trait]
impl RenderedTab for Page {
    async fn source(&self, render_wait: Duration) -> Result<String, CdpError> {
        self.wait_for_navigation().await?;
        tokio::time::sleep(render_wait).await;
        self.content().await
    }

    async fn close(self) {
        if let Err(e) = Page::close(self).await {
            warn!(error = %e, "Failed to close page");
        }
    }
}

/// Reads `tab` within `limit`. The tab is closed on every outcome, including a timed-out load.
async fn read_and_close<T: RenderedTab>(
    tab: T,
    limit: Duration,
    render_wait: Duration,
) -> Result<String, ExtractionError> {
    let loaded = tokio::time::timeout(limit, tab.source(render_wait)).await;
    tab.close().await;

    match loaded {
        Ok(Ok(html)) => Ok(html),
        Ok(Err(e)) => {
            error!(error = %e, "Browser failed to load page");
            Err(classify_cdp_error(&e))
        }
        Err(_) => Err(ExtractionError::Timeout),
    }
}

#[async_trait]
impl ContentExtractor for BrowserExtractor {
    #[instrument(skip(self))]
    async fn extract(&self, url: &str) -> Result<String, ExtractionError> {
        let session = self
            .session
            .as_ref()
            .ok_or(ExtractionError::BrowserUnavailable)?;
        if !is_http_url(url) {
            return Err(ExtractionError::InvalidUrl);
        }

        let page = match tokio::time::timeout(self.timeout, session.browser.new_page(url)).await {
            Ok(Ok(page)) => page,
            Ok(Err(e)) => {
                error!(url, error = %e, "Browser failed to open page");
                return Err(classify_cdp_error(&e));
            }
            Err(_) => return Err(ExtractionError::Timeout),
        };

        let html = read_and_close(page, self.timeout + self.render_wait, self.render_wait).await?;
        let content = self.scraper.extract(&html)?;
        info!(url, length = content.len(), "Extracted page content");
        Ok(content)
    }

    /// Closes the browser and waits for the process to exit. Later calls are no-ops.
    async fn shutdown(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        info!("Shutting down headless browser");
        if let Err(e) = session.browser.close().await {
            warn!(error = %e, "Failed to close browser gracefully");
        }
        if let Err(e) = session.browser.wait().await {
            warn!(error = %e, "Failed to wait for browser exit");
        }
        session.handler.abort();
        session.cleanup_temp_dir();
    }

    fn name(&self) -> &str {
        "browser"
    }
}

fn classify_cdp_error(error: &CdpError) -> ExtractionError {
    let category = match error {
        CdpError::Timeout => return ExtractionError::Timeout,
        CdpError::Ws(_) => "WebSocketError",
        CdpError::Io(_) => "IoError",
        CdpError::Chrome(_) => "ChromeError",
        _ => "WebDriverException",
    };
    ExtractionError::RequestFailed(category.to_string())
}
