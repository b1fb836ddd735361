//! Prompt construction for the summarisation service.

use crate::extractor::{truncate_chars, PageContent};
use crate::summary::SummaryType;
use serde::Serialize;

/// Upper bound on the user message, independent of the extraction cap
pub const DEFAULT_MAX_PROMPT_CHARS: usize = 10_000;

const BASE_INSTRUCTION: &str = "You are an assistant that analyzes the contents of a website \
and provides a summary, ignoring text that might be navigation related.";

/// Payload sent to the service: a system instruction plus the page itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryPrompt {
    pub system: String,
    pub user: String,
}

/// Instruction template for a summary type.
pub fn instruction(summary_type: SummaryType) -> &'static str {
    match summary_type {
        SummaryType::Short => {
            "Respond with a short summary of two to three sentences in markdown."
        }
        SummaryType::Detailed => {
            "Respond with a detailed summary in markdown spanning several paragraphs, \
             including key points and main topics."
        }
        SummaryType::Bullet => {
            "Respond with a bullet-point summary in markdown, highlighting the main ideas \
             as a structured list."
        }
    }
}

#[derive(Debug, Clone)]
pub struct PromptBuilder {
    max_prompt_chars: usize,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PROMPT_CHARS)
    }
}

impl PromptBuilder {
    pub fn new(max_prompt_chars: usize) -> Self {
        Self { max_prompt_chars }
    }

    /// Build the service payload. Images and favicon are never included.
    pub fn build(&self, page: &PageContent, summary_type: SummaryType) -> SummaryPrompt {
        let system = format!("{} {}", BASE_INSTRUCTION, instruction(summary_type));

        let title = if page.title.is_empty() {
            "Untitled"
        } else {
            page.title.as_str()
        };
        let header = format!(
            "You are looking at a website titled '{title}'\n\n\
             The contents of this website are as follows; please provide a summary of this \
             website in markdown. If it includes news or announcements, summarize these too.\n\n"
        );

        let budget = self.max_prompt_chars.saturating_sub(header.chars().count());
        let mut user = truncate_chars(&header, self.max_prompt_chars);
        user.push_str(&truncate_chars(&page.text, budget));

        SummaryPrompt { system, user }
    }
}
