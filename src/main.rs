use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use newslens::config::ExtractorStrategy;
use newslens::output::render_table;
use newslens::source::{RunMode, SearchRequest};
use newslens::types::{ChartArtifacts, TimePeriod};
use newslens::{
    AnalyzerConfig, Phase, RunReport, RunSnapshot, Sentiment, TaskProcessor, SUMMARY_PENDING,
};
use std::io::Read;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "newslens", version, about = "Search, crawl and summarize crypto news")]
struct Cli {
    /// Path to a TOML config file. Defaults to ./newslens.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Fetch pages with plain HTTP instead of a headless browser
    #[arg(long, global = true)]
    http: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search the selected engines and crawl the top results
    Search {
        query: String,
        #[command(flatten)]
        options: SearchArgs,
    },
    /// Quick run for a preset coin symbol, without LLM analysis
    Preset {
        coin: String,
        #[command(flatten)]
        options: SearchArgs,
    },
    /// Crawl a newline-separated URL list read from FILE, or stdin
    Urls { file: Option<PathBuf> },
}

/// Overrides for the `[search]` config section.
#[derive(Args)]
struct SearchArgs {
    /// Engine to query; repeat for several (Bing, Google, Baidu, DuckDuckGo)
    #[arg(short, long = "engine")]
    engines: Vec<String>,
    #[arg(long, value_enum)]
    period: Option<Period>,
    /// Results requested from each engine
    #[arg(long)]
    per_engine: Option<usize>,
    /// Number of results to crawl
    #[arg(long)]
    crawl: Option<usize>,
}

impl SearchArgs {
    fn apply(self, request: &mut SearchRequest) {
        if !self.engines.is_empty() {
            request.engines = self.engines;
        }
        if let Some(period) = self.period {
            request.time_period = period.into();
        }
        request.per_engine_count = self.per_engine.unwrap_or(request.per_engine_count);
        request.crawl_count = self.crawl.unwrap_or(request.crawl_count);
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Period {
    Any,
    Day,
    Week,
    Month,
}

impl From<Period> for TimePeriod {
    fn from(period: Period) -> Self {
        match period {
            Period::Any => TimePeriod::Any,
            Period::Day => TimePeriod::Day,
            Period::Week => TimePeriod::Week,
            Period::Month => TimePeriod::Month,
        }
    }
}

fn search_request(config: &AnalyzerConfig, query: String, preset: bool) -> SearchRequest {
    SearchRequest {
        query,
        engines: config.search.engines.clone(),
        time_period: config.search.time_period,
        per_engine_count: config.search.per_engine_count,
        crawl_count: config.search.crawl_count,
        preset,
    }
}

fn run_mode(command: Command, config: &AnalyzerConfig) -> Result<RunMode> {
    let mode = match command {
        Command::Search { query, options } => {
            let mut request = search_request(config, query, false);
            options.apply(&mut request);
            RunMode::Search(request)
        }
        Command::Preset { coin, options } => {
            if !config
                .presets
                .coins
                .iter()
                .any(|c| c.eq_ignore_ascii_case(&coin))
            {
                warn!(coin = %coin, known = ?config.presets.coins, "Coin is not a configured preset");
            }
            let query = config.presets.query_for(&coin.to_uppercase());
            let mut request = search_request(config, query, true);
            options.apply(&mut request);
            RunMode::Search(request)
        }
        Command::Urls { file } => {
            let text = match file {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read URL list {}", path.display()))?,
                None => {
                    let mut text = String::new();
                    std::io::stdin()
                        .read_to_string(&mut text)
                        .context("failed to read URL list from stdin")?;
                    text
                }
            };
            RunMode::from_url_list(&text)
        }
    };
    Ok(mode)
}

fn print_charts(charts: &ChartArtifacts) {
    if let Some(distribution) = &charts.sentiment {
        println!("\n=== Sentiment Distribution ===");
        for label in [Sentiment::Bullish, Sentiment::Bearish, Sentiment::Neutral] {
            println!("{:<8} {:>5.1}%", label.to_string(), distribution.percent(label));
        }
    }
    if let Some(terms) = &charts.hot_terms {
        println!("\n=== Hot Terms ===");
        let line: Vec<String> = terms
            .iter()
            .take(10)
            .map(|(term, count)| format!("{} ({})", term, count))
            .collect();
        println!("{}", line.join(", "));
    }
}

fn print_report(report: &RunReport, elapsed: Duration) {
    println!("\n=== Results ===");
    print!("{}", render_table(&report.records));
    print_charts(&report.charts);
    println!("\n{}", report.summary);
    if let Some(path) = &report.output_path {
        println!("\nResults saved to {}", path.display());
    }
    println!("Processing time: {:.2?}", elapsed);
}

/// The main entry point of the application.
///
/// Parses the command line, loads the layered configuration, runs one task and
/// prints its final table, charts and summary. Progress goes to a spinner on stderr.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("newslens=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = AnalyzerConfig::load(cli.config.as_deref())?;
    if cli.http {
        config.crawler.strategy = ExtractorStrategy::Http;
    }

    let mode = run_mode(cli.command, &config)?;
    let processor = TaskProcessor::from_config(config)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(120));

    let (mut tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<RunSnapshot>();
    let progress = {
        let spinner = spinner.clone();
        tokio::spawn(async move {
            while let Some(snapshot) = rx.recv().await {
                spinner.set_message(snapshot.status);
            }
        })
    };

    let start_time = Instant::now();
    let report = processor.run(mode, &mut tx).await;
    drop(tx);
    progress.await?;
    spinner.finish_and_clear();

    match &report.phase {
        Phase::Failed(failure) => {
            if report.summary != SUMMARY_PENDING {
                eprintln!("{}", report.summary);
            }
            warn!(reason = %failure, "Run did not complete");
            bail!("{}", report.status)
        }
        _ => {
            info!(rows = report.records.len(), "Run finished");
            print_report(&report, start_time.elapsed());
            Ok(())
        }
    }
}
