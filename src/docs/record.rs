use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A fetched markdown document. Dropped once its sections are extracted.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// URL or filesystem path.
    pub id: String,
    pub text: String,
}

/// A heading together with the cleaned block content that follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub heading: String,
    pub level: u8,
    pub body: String,
}

impl Section {
    /// Heading length in characters, without markup.
    pub fn heading_len(&self) -> usize {
        self.heading.chars().count()
    }
}

/// One training/retrieval example. Both fields are non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaRecord {
    pub question: String,
    pub answer: String,
}

impl QaRecord {
    /// Returns `None` when either side would be empty.
    pub fn from_section(section: &Section) -> Option<Self> {
        let heading = section.heading.trim();
        let answer = clean_answer_text(&section.body);
        if heading.is_empty() || answer.is_empty() {
            return None;
        }
        Some(Self {
            question: synthesize_question(heading),
            answer,
        })
    }
}

pub type Dataset = Vec<QaRecord>;

pub fn synthesize_question(heading: &str) -> String {
    format!("What does {} mean?", heading.trim())
}

/// Normalises line endings, collapses runs of blank lines and trims every
/// line. Line structure is preserved for lists and code.
pub fn clean_answer_text(text: &str) -> String {
    static BLANK_RUNS: OnceLock<Option<Regex>> = OnceLock::new();

    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let collapsed = match BLANK_RUNS.get_or_init(|| Regex::new(r"\n\s*\n\s*\n+").ok()) {
        Some(re) => re.replace_all(&normalized, "\n\n").into_owned(),
        None => normalized,
    };

    collapsed
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
