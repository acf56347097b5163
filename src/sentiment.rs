use crate::config::SentimentLexicon;
use crate::types::Sentiment;

/// Default bullish keywords (Chinese and English crypto-news vocabulary).
pub const BULLISH_WORDS: &[&str] = &[
    "上涨", "突破", "新高", "利好", "增长", "飙升", "看好", "乐观", "买入", "增持",
    "支持", "复苏", "强劲", "盈利", "牛市", "成功", "批准", "采用", "合作", "升级",
    "ATH", "新高", "减半", "halving", "bull run", "bullish", "pump", "long", "buy",
    "暴涨", "巨鲸", "抄底", "加仓", "持有", "生态", "赋能", "创新",
];

/// Default bearish keywords.
pub const BEARISH_WORDS: &[&str] = &[
    "下跌", "暴跌", "新低", "利空", "亏损", "看跌", "悲观", "卖出", "风险", "警告",
    "监管", "禁止", "打击", "熊市", "失败", "拒绝", "抛售", "担忧", "清算", "崩盘",
    "correction", "dip", "dump", "short", "sell", "bearish", "risk", "bubble", "泡沫",
    "回调", "恐慌", "砸盘", "出货", "割肉", "监管", "审查", "漏洞",
];

/// Keyword-count sentiment scorer. Pure: the same text always yields the same score.
#[derive(Debug, Clone)]
pub struct SentimentScorer {
    bullish: Vec<String>,
    bearish: Vec<String>,
}

impl Default for SentimentScorer {
    fn default() -> Self {
        Self::new(&SentimentLexicon::default())
    }
}

impl SentimentScorer {
    pub fn new(lexicon: &SentimentLexicon) -> Self {
        let lower = |words: &[String]| {
            words
                .iter()
                .map(|w| w.to_lowercase())
                .filter(|w| !w.is_empty())
                .collect()
        };
        Self {
            bullish: lower(&lexicon.bullish),
            bearish: lower(&lexicon.bearish),
        }
    }

    /// Net score: bullish occurrences minus bearish occurrences.
    ///
    /// Matching is case-insensitive substring counting. Each keyword is counted on its own,
    /// so overlapping keywords (and duplicate list entries) all contribute.
    pub fn score(&self, text: &str) -> i64 {
        let text = text.to_lowercase();
        let count = |words: &[String]| -> i64 {
            words.iter().map(|w| text.matches(w.as_str()).count() as i64).sum()
        };
        count(&self.bullish) - count(&self.bearish)
    }

    /// Label for `text`; absent text is `Neutral`.
    pub fn analyze(&self, text: Option<&str>) -> Sentiment {
        match text.map(|t| self.score(t)) {
            Some(s) if s > 0 => Sentiment::Bullish,
            Some(s) if s < 0 => Sentiment::Bearish,
            _ => Sentiment::Neutral,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bullish_text() {
        let scorer = SentimentScorer::default();
        assert!(scorer.score("突破新高") > 0);
        assert_eq!(scorer.analyze(Some("突破新高")), Sentiment::Bullish);
    }

    #[test]
    fn test_bearish_text() {
        let scorer = SentimentScorer::default();
        assert!(scorer.score("暴跌 风险") < 0);
        assert_eq!(scorer.analyze(Some("暴跌 风险")), Sentiment::Bearish);
    }

    #[test]
    fn test_neutral_text() {
        let scorer = SentimentScorer::default();
        assert_eq!(scorer.score("hello world"), 0);
        assert_eq!(scorer.analyze(Some("hello world")), Sentiment::Neutral);
        assert_eq!(scorer.analyze(None), Sentiment::Neutral);
        assert_eq!(scorer.analyze(Some("")), Sentiment::Neutral);
    }

    #[test]
    fn test_case_insensitive_and_duplicate_keywords() {
        let scorer = SentimentScorer::default();
        // "新高" appears twice in the bullish list, "突破" once.
        assert_eq!(scorer.score("突破新高"), 3);
        assert_eq!(scorer.score("BULLISH"), scorer.score("bullish"));
    }

    #[test]
    fn test_custom_lexicon() {
        let lexicon = SentimentLexicon {
            bullish: vec!["moon".to_string()],
            bearish: vec!["rekt".to_string()],
        };
        let scorer = SentimentScorer::new(&lexicon);

        assert_eq!(scorer.score("moon moon rekt"), 1);
        assert_eq!(scorer.analyze(Some("REKT")), Sentiment::Bearish);
    }
}
