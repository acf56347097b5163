/// System role sent with every summarization request.
pub const SYSTEM_PROMPT: &str = "You are a professional Web3 industry analyst. Based on the web search results \
provided, give the user a concise, neutral and well-organized news summary on a specific topic.";

/// The `PromptBuilder` struct is responsible for constructing the summarization prompt
/// from crawled page content.
pub struct PromptBuilder {
    /// The topic the user asked about.
    topic: String,
    /// Concatenated page text.
    content: String,
    /// Content beyond this many characters is dropped.
    max_content_chars: usize,
}

impl PromptBuilder {
    /// Creates a new `PromptBuilder` for the given topic.
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            content: String::new(),
            max_content_chars: usize::MAX,
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Caps the content length. Truncation is silent.
    pub fn with_max_content_chars(mut self, max: usize) -> Self {
        self.max_content_chars = max;
        self
    }

    /// Builds the user prompt embedding the topic and the (truncated) content.
    pub fn build(&self) -> String {
        let content = truncate_chars(&self.content, self.max_content_chars);
        format!(
            "Based on the following search content about \"{}\", summarize the main recent news.\n\
             Requirements:\n\
             1. The summary must be objective and neutral, stating facts only.\n\
             2. Be clear and focused, organized as a few key points.\n\
             3. If the content is not enough for a meaningful summary, say that information is insufficient.\n\
             Search content:\n\
             ---\n\
             {}\n\
             ---",
            self.topic,
            Self::clean_text(content)
        )
    }

    /// Cleans the given text by removing blank lines and normalizing whitespace.
    fn clean_text(text: &str) -> String {
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| line.split_whitespace().collect::<Vec<&str>>().join(" "))
            .collect::<Vec<String>>()
            .join("\n")
    }
}

/// Returns the first `max` characters of `text` (not bytes).
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
