//! Claim-risk extraction.
//!
//! The documents of an analysis are formatted into one text block,
//! truncated, and sent through [`RISK_ANALYSIS_PROMPT`]. The reply is parsed
//! for numbered bold titles (`1. **Title**`). Exactly [`RISK_COUNT`] risks
//! come out: the first five parsed, or five placeholders when fewer than
//! five parse. A partial list is never returned.

use anyhow::Result;
use regex::Regex;
use std::sync::{Arc, LazyLock};

use crate::config::AnalysisConfig;
use crate::llm::ChatModel;
use crate::models::{DocumentRecord, RiskRecord};
use crate::prompts::{head_chars, render, RISK_ANALYSIS_PROMPT};

pub const RISK_COUNT: usize = 5;

/// Characters of the raw model reply shown when parsing falls back.
pub const RAW_EXCERPT_CHARS: usize = 200;

pub const PLACEHOLDER_DESCRIPTION: &str =
    "The analysis result could not be loaded. Check the API key and the uploaded files.";

static RISK_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.\s*\*\*([^*]+)\*\*").expect("valid risk heading regex"));

static RISK_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.\s*\*\*").expect("valid risk marker regex"));

/// Result of one risk analysis.
#[derive(Debug, Clone)]
pub struct RiskAnalysis {
    pub risks: Vec<RiskRecord>,
    /// The model's reply, verbatim.
    pub raw_response: String,
    /// True when the reply did not contain five parseable risks.
    pub fallback: bool,
}

impl RiskAnalysis {
    /// Start of the raw reply, for diagnosing a fallback.
    pub fn raw_excerpt(&self) -> &str {
        head_chars(&self.raw_response, RAW_EXCERPT_CHARS)
    }
}

/// Format documents as header blocks followed by their leading text.
pub fn format_documents_for_prompt(
    documents: &[DocumentRecord],
    max_document_chars: usize,
) -> String {
    let rule = "=".repeat(50);
    let mut formatted = String::new();
    for doc in documents {
        formatted.push_str(&format!("\n{}\n", rule));
        formatted.push_str(&format!("Category: {}\n", doc.category.label()));
        formatted.push_str(&format!("File: {}\n", doc.filename));
        formatted.push_str(&format!("{}\n", rule));
        formatted.push_str(&format!("{}...\n", head_chars(&doc.text, max_document_chars)));
    }
    formatted
}

/// Parse every `N. **Title**` entry of a model reply.
///
/// A description runs from the end of its heading to the next `N. **`
/// marker or the end of the text. A leading `:` is dropped.
pub fn parse_risks(text: &str) -> Vec<RiskRecord> {
    RISK_HEADING
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let title = caps.get(1)?.as_str().trim().to_string();
            let rest = &text[whole.end()..];
            let end = RISK_MARKER.find(rest).map_or(rest.len(), |m| m.start());
            let description = rest[..end]
                .trim()
                .trim_start_matches(':')
                .trim()
                .to_string();
            Some(RiskRecord { title, description })
        })
        .collect()
}

/// Five placeholder risks shown when parsing fails.
pub fn placeholder_risks() -> Vec<RiskRecord> {
    (1..=RISK_COUNT)
        .map(|i| RiskRecord {
            title: format!("Risk {}", i),
            description: PLACEHOLDER_DESCRIPTION.to_string(),
        })
        .collect()
}

/// Apply the all-or-nothing rule to a model reply.
pub fn select_risks(raw_response: String) -> RiskAnalysis {
    let mut risks = parse_risks(&raw_response);
    if risks.len() >= RISK_COUNT {
        risks.truncate(RISK_COUNT);
        RiskAnalysis {
            risks,
            raw_response,
            fallback: false,
        }
    } else {
        tracing::warn!(
            parsed = risks.len(),
            "risk reply did not contain {} risks, using placeholders",
            RISK_COUNT
        );
        RiskAnalysis {
            risks: placeholder_risks(),
            raw_response,
            fallback: true,
        }
    }
}

pub struct RiskExtractor {
    model: Arc<dyn ChatModel>,
    max_prompt_chars: usize,
    max_document_chars: usize,
}

impl RiskExtractor {
    pub fn new(model: Arc<dyn ChatModel>, config: &AnalysisConfig) -> Self {
        Self {
            model,
            max_prompt_chars: config.max_prompt_chars,
            max_document_chars: config.max_document_chars,
        }
    }

    /// Build the analysis prompt for a document set.
    pub fn build_prompt(&self, documents: &[DocumentRecord]) -> String {
        let formatted = format_documents_for_prompt(documents, self.max_document_chars);
        render(
            RISK_ANALYSIS_PROMPT,
            &[("documents", head_chars(&formatted, self.max_prompt_chars))],
        )
    }

    /// Ask the model for the top risks of `documents`.
    ///
    /// Model errors propagate; an unparseable reply does not.
    pub async fn extract(&self, documents: &[DocumentRecord]) -> Result<RiskAnalysis> {
        let prompt = self.build_prompt(documents);
        tracing::info!(
            model = self.model.model_name(),
            documents = documents.len(),
            prompt_chars = prompt.chars().count(),
            "requesting risk analysis"
        );
        let reply = self.model.complete_prompt(&prompt).await?;
        Ok(select_risks(reply))
    }
}
