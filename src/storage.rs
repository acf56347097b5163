use crate::types::CrawlRecord;
use crate::Result;
use chrono::Local;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

/// Persists the result table of a run.
pub trait RecordStore: Send + Sync {
    /// Writes `records` for `query`, returning where they were stored.
    fn save(&self, records: &[CrawlRecord], query: &str) -> Result<PathBuf>;
}

#[derive(Serialize)]
struct CsvRow<'a> {
    ordinal: usize,
    title: &'a str,
    link: &'a str,
    source: &'a str,
    date: &'a str,
    crawl_status: String,
    extracted_text: &'a str,
    sentiment: String,
}

impl<'a> From<&'a CrawlRecord> for CsvRow<'a> {
    fn from(record: &'a CrawlRecord) -> Self {
        Self {
            ordinal: record.ordinal,
            title: &record.title,
            link: &record.link,
            source: &record.source,
            date: &record.date,
            crawl_status: record.status.to_string(),
            extracted_text: &record.extracted_text,
            sentiment: record.sentiment.to_string(),
        }
    }
}

const HEADERS: [&str; 8] = [
    "ordinal",
    "title",
    "link",
    "source",
    "date",
    "crawl_status",
    "extracted_text",
    "sentiment",
];

/// Writes one UTF-8 (with BOM) CSV file per run into a directory.
pub struct CsvStore {
    output_dir: PathBuf,
}

impl CsvStore {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

/// Keeps alphanumerics, spaces and underscores; trailing whitespace is trimmed.
pub fn sanitize_query(query: &str) -> String {
    query
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '_')
        .collect::<String>()
        .trim_end()
        .to_string()
}

impl RecordStore for CsvStore {
    fn save(&self, records: &[CrawlRecord], query: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let filename = format!("{}_{}.csv", sanitize_query(query), timestamp);
        let path = self.output_dir.join(filename);

        let mut file = File::create(&path)?;
        // BOM so spreadsheet tools detect UTF-8.
        file.write_all("\u{feff}".as_bytes())?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.write_record(HEADERS)?;
        for record in records {
            writer.serialize(CsvRow::from(record))?;
        }
        writer.flush()?;

        info!(path = %path.display(), rows = records.len(), "Results saved");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CandidateResult, CrawlStatus, Sentiment};
    use crate::ExtractionError;

    #[test]
    fn test_sanitize_query() {
        assert_eq!(sanitize_query("BTC 最新新闻"), "BTC 最新新闻");
        assert_eq!(sanitize_query("a/b:c?*  "), "abc");
        assert_eq!(sanitize_query("my_query 2024!"), "my_query 2024");
    }

    #[test]
    fn test_save_writes_all_rows() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::new(dir.path().join("nested"));

        let candidate = CandidateResult::new("Title, with comma", "https://a.example", "", "Bing", None);
        let mut ok = CrawlRecord::pending(1, &candidate);
        ok.status = CrawlStatus::Success;
        ok.extracted_text = "line one\nline two".into();
        ok.sentiment = Sentiment::Bullish;
        let mut failed = CrawlRecord::pending(2, &candidate);
        failed.link = "https://b.example".into();
        failed.status = CrawlStatus::Failure(ExtractionError::Timeout);

        let path = store.save(&[ok, failed], "btc/news").unwrap();

        assert!(path.file_name().unwrap().to_string_lossy().starts_with("btcnews_"));
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.starts_with('\u{feff}'));

        let mut reader = csv::Reader::from_reader(raw.trim_start_matches('\u{feff}').as_bytes());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), HEADERS.to_vec());
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][1], "Title, with comma");
        assert_eq!(&rows[0][5], "success");
        assert_eq!(&rows[0][6], "line one\nline two");
        assert_eq!(&rows[1][5], "failure: request timed out");
        assert_eq!(&rows[1][7], "Pending");
    }

    #[test]
    fn test_save_empty_table_writes_header() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::new(dir.path());

        let path = store.save(&[], "empty").unwrap();
        let raw = fs::read_to_string(path).unwrap();

        assert_eq!(raw.trim_start_matches('\u{feff}').trim_end(), HEADERS.join(","));
    }
}
