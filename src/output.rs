use crate::prompt::truncate_chars;
use crate::types::CrawlRecord;

const SUMMARY_HEADER: &str = "### AI Analysis Summary\n\n";

/// Wraps an LLM summary with a numbered reference list of the crawled links.
pub fn format_summary(summary: &str, links: &[String]) -> String {
    if summary.trim().is_empty() {
        return format!("{}No summary could be generated.", SUMMARY_HEADER);
    }

    let references = if links.is_empty() {
        String::from("No valid references.\n")
    } else {
        links
            .iter()
            .enumerate()
            .map(|(i, link)| format!("{}. [{}]({})\n", i + 1, link, link))
            .collect()
    };

    format!(
        "{}{}\n\n---\n\n**References:**\n{}",
        SUMMARY_HEADER, summary, references
    )
}

/// Copy of `records` with extracted text cut to `preview_chars` characters for display.
pub fn display_table(records: &[CrawlRecord], preview_chars: usize) -> Vec<CrawlRecord> {
    records
        .iter()
        .map(|record| {
            let mut row = record.clone();
            let preview = truncate_chars(&record.extracted_text, preview_chars);
            if preview.len() < record.extracted_text.len() {
                row.extracted_text = format!("{}...", preview);
            }
            row
        })
        .collect()
}

/// Renders records as a plain-text table for terminal output.
pub fn render_table(records: &[CrawlRecord]) -> String {
    let mut out = String::from("#   | Sentiment | Status                         | Source         | Link\n");
    for r in records {
        let status = r.status.to_string();
        out.push_str(&format!(
            "{:<3} | {:<9} | {:<30} | {:<14} | {}\n",
            r.ordinal,
            r.sentiment.to_string(),
            truncate_chars(&status, 30),
            truncate_chars(&r.source, 14),
            r.link
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CandidateResult, CrawlStatus};

    #[test]
    fn test_summary_with_references() {
        let links = vec!["https://a.example".to_string(), "https://b.example".to_string()];
        let formatted = format_summary("Markets rallied.", &links);

        assert!(formatted.starts_with("### AI Analysis Summary\n\nMarkets rallied."));
        assert!(formatted.contains("**References:**\n1. [https://a.example](https://a.example)\n2. [https://b.example](https://b.example)\n"));
    }

    #[test]
    fn test_summary_edge_cases() {
        assert_eq!(
            format_summary("", &[]),
            "### AI Analysis Summary\n\nNo summary could be generated."
        );
        assert!(format_summary("ok", &[]).ends_with("No valid references.\n"));
    }

    #[test]
    fn test_display_table_truncates_only_text() {
        let candidate = CandidateResult::new("t", "https://a.example", "", "Bing", None);
        let mut long = CrawlRecord::pending(1, &candidate);
        long.status = CrawlStatus::Success;
        long.extracted_text = "x".repeat(200);
        let mut short = long.clone();
        short.extracted_text = "short text".into();

        let table = display_table(&[long.clone(), short.clone()], 150);

        assert_eq!(table[0].extracted_text.chars().count(), 153);
        assert!(table[0].extracted_text.ends_with("..."));
        assert_eq!(table[1].extracted_text, "short text");
        assert_eq!(long.extracted_text.len(), 200);
    }
}
