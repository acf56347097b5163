//! Chart data derived from a finished crawl: sentiment distribution and
//! financial "hot term" frequencies.

use crate::types::{Sentiment, SentimentDistribution};
use std::collections::HashMap;

/// Default number of hot terms kept.
pub const DEFAULT_HOT_TERM_LIMIT: usize = 30;

/// Financial vocabulary considered for hot terms. English entries match whole
/// tokens (or token sequences); CJK entries match as substrings, longest first, so
/// `交易所` is not also counted as `交易`.
pub const FINANCIAL_VOCAB: &[&str] = &[
    // Major coins & tokens
    "btc", "eth", "sol", "bnb", "xrp", "ada", "doge", "shib", "dot", "avax", "link", "matic",
    "bitcoin", "ethereum", "solana", "cardano", "polkadot", "avalanche", "chainlink", "polygon",
    // Core concepts
    "crypto", "cryptocurrency", "blockchain", "web3", "decentralized", "smart contract", "token",
    "defi", "nft", "metaverse", "dao", "dapp", "wallet", "tokenomics", "staking", "yield farming",
    "liquid staking", "lending", "borrowing", "stablecoin", "cbdc", "privacy coin",
    // Trading & market
    "trading", "exchange", "market", "price", "volume", "market cap", "volatility", "liquidity",
    "bull", "bear", "bullish", "bearish", "ath", "atl", "pump", "dump", "long", "short", "leverage",
    "futures", "options", "perpetual", "spot", "margin", "spread", "arbitrage", "slippage",
    "resistance", "support", "trend", "breakout", "correction", "dip", "hodl", "fomo", "fud",
    "order book", "limit order", "market order", "stop loss", "take profit", "whale", "retail",
    // Technical analysis
    "technical analysis", "chart", "candlestick", "rsi", "macd", "moving average",
    "bollinger bands", "fibonacci", "indicator", "signal",
    // Macro & regulatory
    "investment", "investor", "fund", "etf", "sec", "cftc", "fed", "federal reserve",
    "interest rate", "inflation", "recession", "regulation", "policy", "adoption", "partnership",
    "security",
    // Chinese equivalents
    "加密货币", "区块链", "交易所", "交易", "价格", "市场", "波动", "市值", "交易量", "投资",
    "投资者", "基金", "期货", "合约", "杠杆", "做多", "做空", "流动性", "挖矿", "去中心化",
    "智能合约", "利率", "美联储", "监管", "通胀", "加息", "降息", "经济", "技术分析",
];

/// Counts Bullish/Bearish/Neutral labels; `Pending` is ignored.
///
/// Returns `None` when there is nothing to chart.
pub fn sentiment_distribution(labels: &[Sentiment]) -> Option<SentimentDistribution> {
    let mut dist = SentimentDistribution::default();
    for label in labels {
        match label {
            Sentiment::Bullish => dist.bullish += 1,
            Sentiment::Bearish => dist.bearish += 1,
            Sentiment::Neutral => dist.neutral += 1,
            Sentiment::Pending => {}
        }
    }
    if dist.total() == 0 {
        None
    } else {
        Some(dist)
    }
}

impl SentimentDistribution {
    pub fn total(&self) -> usize {
        self.bullish + self.bearish + self.neutral
    }

    /// Share of `label` in percent, `0.0` for an empty distribution.
    pub fn percent(&self, label: Sentiment) -> f64 {
        let count = match label {
            Sentiment::Bullish => self.bullish,
            Sentiment::Bearish => self.bearish,
            Sentiment::Neutral => self.neutral,
            Sentiment::Pending => 0,
        };
        match self.total() {
            0 => 0.0,
            total => count as f64 * 100.0 / total as f64,
        }
    }
}

/// Frequencies of [`FINANCIAL_VOCAB`] terms in `text`, most frequent first
/// (ties broken alphabetically), truncated to `limit`.
///
/// Returns `None` when no vocabulary term occurs.
pub fn hot_terms(text: &str, limit: usize) -> Option<Vec<(String, usize)>> {
    let lower = text.to_lowercase();
    let tokens: Vec<&str> = lower
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();

    let (ascii_terms, cjk_terms): (Vec<&str>, Vec<&str>) =
        FINANCIAL_VOCAB.iter().copied().partition(|term| term.is_ascii());

    let mut counts = count_longest_matches(&lower, &cjk_terms);
    for term in ascii_terms {
        let count = count_token_sequence(&tokens, term);
        if count > 0 {
            *counts.entry(term).or_insert(0) += count;
        }
    }

    if counts.is_empty() {
        return None;
    }

    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(term, count)| (term.to_string(), count))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(limit);
    Some(ranked)
}

/// Scans `text` left to right, taking the longest term that starts at each position.
fn count_longest_matches<'t>(text: &str, terms: &[&'t str]) -> HashMap<&'t str, usize> {
    let mut counts = HashMap::new();
    let mut rest = text;
    while let Some(first) = rest.chars().next() {
        let longest = terms
            .iter()
            .filter(|term| rest.starts_with(**term))
            .max_by_key(|term| term.len());
        match longest {
            Some(&term) => {
                *counts.entry(term).or_insert(0) += 1;
                rest = &rest[term.len()..];
            }
            None => rest = &rest[first.len_utf8()..],
        }
    }
    counts
}

fn count_token_sequence(tokens: &[&str], term: &str) -> usize {
    let parts: Vec<&str> = term.split_whitespace().collect();
    if parts.is_empty() || parts.len() > tokens.len() {
        return 0;
    }
    tokens
        .windows(parts.len())
        .filter(|window| *window == parts.as_slice())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distribution_ignores_pending() {
        let dist = sentiment_distribution(&[
            Sentiment::Bullish,
            Sentiment::Bullish,
            Sentiment::Bearish,
            Sentiment::Pending,
        ])
        .unwrap();

        assert_eq!(dist.bullish, 2);
        assert_eq!(dist.bearish, 1);
        assert_eq!(dist.neutral, 0);
        assert!((dist.percent(Sentiment::Bullish) - 66.666).abs() < 0.01);
        assert!(sentiment_distribution(&[Sentiment::Pending]).is_none());
    }

    #[test]
    fn test_hot_terms_mixed_language() {
        let text = "Bitcoin ETF inflows lift the market. The ETF market cap grows on the path ahead; 区块链 and 交易所 news.";
        let terms = hot_terms(text, DEFAULT_HOT_TERM_LIMIT).unwrap();
        let lookup = |t: &str| terms.iter().find(|(term, _)| term == t).map(|(_, c)| *c);

        assert_eq!(lookup("etf"), Some(2));
        assert_eq!(lookup("market"), Some(2));
        assert_eq!(lookup("market cap"), Some(1));
        assert_eq!(lookup("bitcoin"), Some(1));
        assert_eq!(lookup("区块链"), Some(1));
        // "path" must not count as "ath"
        assert_eq!(lookup("ath"), None);
        assert_eq!(terms[0].1, 2);
    }

    #[test]
    fn test_nested_cjk_terms_count_once() {
        let terms = hot_terms("交易所交易量创新高，交易活跃；投资者继续投资", 10).unwrap();
        let lookup = |t: &str| terms.iter().find(|(term, _)| term == t).map(|(_, c)| *c);

        assert_eq!(lookup("交易所"), Some(1));
        assert_eq!(lookup("交易量"), Some(1));
        assert_eq!(lookup("交易"), Some(1));
        assert_eq!(lookup("投资者"), Some(1));
        assert_eq!(lookup("投资"), Some(1));
    }

    #[test]
    fn test_hot_terms_none_when_no_vocab() {
        assert!(hot_terms("nothing relevant here", 10).is_none());
    }

    #[test]
    fn test_hot_terms_limit() {
        let terms = hot_terms("btc eth sol bnb", 2).unwrap();
        assert_eq!(terms.len(), 2);
        assert_eq!(terms[0].0, "bnb");
    }
}
