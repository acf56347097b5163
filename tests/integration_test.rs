use mockito::{Matcher, Server};
use newslens::config::{AnalyzerConfig, CrawlerConfig, ExtractorStrategy, LLMConfig, SearchConfig};
use newslens::llm::{LLMProcessor, Summarizer};
use newslens::scraper::{ContentExtractor, HttpExtractor};
use newslens::search::{BingSearch, SearchBackend};
use newslens::source::RunMode;
use newslens::types::TimePeriod;
use newslens::{
    CrawlStatus, ExtractionError, Phase, RunSnapshot, SummarizationError, TaskProcessor,
};

const BING_PAGE: &str = r#"<html><body><ol id="b_results">
<li class="b_algo"><h2><a href="https://news.example/etf">Bitcoin ETF inflows surge</a></h2>
<div class="b_caption"><p>Record inflows this week.</p></div></li>
<li class="b_algo"><h2><a href="https://news.example/halving">Halving approaches</a></h2>
<div class="b_caption"><p>Miners prepare.</p></div></li>
<li class="b_algo"><h2><a href="https://news.example/third">Third result</a></h2></li>
</ol></body></html>"#;

const ARTICLE_PAGE: &str = r#"<html><body>
<nav>Home News Markets Login</nav>
<article>
<h1>Bitcoin breaks a new high</h1>
<p>Bitcoin climbed to a record as ETF demand kept growing.</p>
<figure><figcaption>Price chart for the last thirty days</figcaption></figure>
<p>Short</p>
<script>var tracking = "should never appear in output";</script>
</article>
<footer>Copyright notice for this news site</footer>
</body></html>"#;

fn crawler_config() -> CrawlerConfig {
    CrawlerConfig {
        strategy: ExtractorStrategy::Http,
        timeout_secs: 5,
        pacing_ms: 0,
        ..CrawlerConfig::default()
    }
}

#[tokio::test]
async fn test_bing_search_against_mock_server() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/search")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("q".into(), "bitcoin etf".into()),
            Matcher::UrlEncoded("filters".into(), "ex1:\"ez1\"".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "text/html; charset=utf-8")
        .with_body(BING_PAGE)
        .create_async()
        .await;

    let config = SearchConfig {
        bing_base_url: server.url(),
        ..SearchConfig::default()
    };
    let bing = BingSearch::new(&config).unwrap();
    let results = bing.search("bitcoin etf", TimePeriod::Day, 2).await.unwrap();

    mock.assert_async().await;
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].title, "Bitcoin ETF inflows surge");
    assert_eq!(results[0].link, "https://news.example/etf");
    assert_eq!(results[0].snippet, "Record inflows this week.");
    assert_eq!(results[1].source, "Bing");
    assert!(results[1].discovered_at.is_some());
}

#[tokio::test]
async fn test_bing_error_status_is_an_error() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/search")
        .match_query(Matcher::Any)
        .with_status(503)
        .create_async()
        .await;

    let config = SearchConfig {
        bing_base_url: server.url(),
        ..SearchConfig::default()
    };
    let bing = BingSearch::new(&config).unwrap();
    assert!(bing.search("bitcoin", TimePeriod::Any, 5).await.is_err());
}

#[tokio::test]
async fn test_http_extractor_outcomes() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/article")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(ARTICLE_PAGE)
        .create_async()
        .await;
    server
        .mock("GET", "/missing")
        .with_status(404)
        .with_body("not found")
        .create_async()
        .await;
    server
        .mock("GET", "/chrome-only")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body("<html><body><nav>Only navigation links here</nav><p>Hi</p></body></html>")
        .create_async()
        .await;

    let extractor = HttpExtractor::new(&crawler_config()).unwrap();

    let text = extractor
        .extract(&format!("{}/article", server.url()))
        .await
        .unwrap();
    assert_eq!(
        text,
        "Bitcoin breaks a new high\nBitcoin climbed to a record as ETF demand kept growing."
    );

    assert_eq!(
        extractor.extract(&format!("{}/missing", server.url())).await,
        Err(ExtractionError::HttpStatus(404))
    );
    assert_eq!(
        extractor.extract(&format!("{}/chrome-only", server.url())).await,
        Err(ExtractionError::EmptyContent)
    );
    assert_eq!(
        extractor.extract("ftp://files.example/report").await,
        Err(ExtractionError::InvalidUrl)
    );
}

#[tokio::test]
async fn test_http_extractor_transport_failures() {
    // Accepts connections and never answers.
    let silent = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let silent_addr = silent.local_addr().unwrap();
    let holder = tokio::spawn(async move {
        let mut open = Vec::new();
        while let Ok((socket, _)) = silent.accept().await {
            open.push(socket);
        }
    });

    // Bound then released, so nothing listens on it.
    let closed_addr = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };

    let extractor = HttpExtractor::new(&CrawlerConfig {
        timeout_secs: 1,
        ..crawler_config()
    })
    .unwrap();

    assert_eq!(
        extractor.extract(&format!("http://{}/slow", silent_addr)).await,
        Err(ExtractionError::Timeout)
    );
    assert_eq!(
        extractor.extract(&format!("http://{}/", closed_addr)).await,
        Err(ExtractionError::RequestFailed("ConnectionError".into()))
    );

    holder.abort();
}

#[tokio::test]
async fn test_llm_processor_against_mock_api() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer sk-test")
        .match_body(Matcher::PartialJson(serde_json::json!({ "model": "gpt-3.5-turbo" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            serde_json::json!({
                "choices": [{ "message": { "role": "assistant", "content": "  Bitcoin rallied.  " } }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let config = LLMConfig {
        api_key: "sk-test".into(),
        base_url: Some(server.url()),
        ..LLMConfig::default()
    };
    let processor = LLMProcessor::new(config).unwrap();

    assert!(processor.has_credential());
    let summary = processor.summarize("Bitcoin climbed today.", "bitcoin").await;
    assert_eq!(summary, "Bitcoin rallied.");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_llm_service_error_is_inlined() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;

    let config = LLMConfig {
        api_key: "sk-test".into(),
        base_url: Some(server.url()),
        ..LLMConfig::default()
    };
    let processor = LLMProcessor::new(config).unwrap();

    assert_eq!(
        processor.try_summarize("content", "bitcoin").await,
        Err(SummarizationError::Service("status 500: boom".into()))
    );
    assert_eq!(
        processor.summarize("content", "bitcoin").await,
        "Error: API returned an error - status 500: boom"
    );
}

#[tokio::test]
async fn test_direct_run_over_http_writes_csv() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/article")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(ARTICLE_PAGE)
        .create_async()
        .await;
    server
        .mock("GET", "/gone")
        .with_status(410)
        .create_async()
        .await;

    let output = tempfile::tempdir().unwrap();
    let mut config = AnalyzerConfig::default();
    config.crawler = crawler_config();
    config.output.dir = output.path().to_path_buf();
    let processor = TaskProcessor::from_config(config).unwrap();

    let urls = format!("{0}/article\n{0}/gone\n", server.url());
    let mut snapshots: Vec<RunSnapshot> = Vec::new();
    let report = processor
        .run(RunMode::from_url_list(&urls), &mut snapshots)
        .await;

    assert_eq!(report.phase, Phase::Done);
    assert_eq!(report.records[0].status, CrawlStatus::Success);
    assert_eq!(
        report.records[1].status,
        CrawlStatus::Failure(ExtractionError::HttpStatus(410))
    );
    assert_eq!(report.summary, newslens::SUMMARY_SKIPPED);

    let path = report.output_path.expect("results saved");
    assert!(path.starts_with(output.path()));
    assert!(path
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("Targeted Crawl_"));
    let csv = std::fs::read_to_string(&path).unwrap();
    assert!(csv.contains("Bitcoin climbed to a record"));
    assert!(csv.contains("failure: HTTP error: 410"));
    assert!(snapshots.last().unwrap().controls_enabled);
}
