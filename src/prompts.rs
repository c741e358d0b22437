//! Prompt text and placeholder rendering.
//!
//! Templates use `{name}` placeholders filled by [`render`]. The system and
//! persona prompts are only defaults: sessions start from `[prompts]` in the
//! config and may replace them at runtime.

use crate::config::PromptsConfig;

pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a senior construction-claim consultant. You answer questions about \
a construction project using only the project documents provided as context. \
Cite the document category and file name for every fact you rely on. If the \
documents do not support an answer, say so plainly.";

pub const DEFAULT_CONTRACTOR_PROMPT: &str = "\
From the contractor's point of view: identify entitlements to time and cost, \
notice obligations the contractor must meet, and the evidence needed to \
support a claim.";

pub const DEFAULT_OWNER_PROMPT: &str = "\
From the owner's point of view: identify defenses, contractual limits on \
liability, gaps in the contractor's notices or records, and ways to \
mitigate exposure.";

pub const DEFAULT_ARBITRATOR_PROMPT: &str = "\
From a neutral arbitrator's point of view: weigh both positions against the \
contract terms and the record, and give a balanced assessment of the likely \
outcome.";

/// Risk analysis prompt. Placeholder: `{documents}`.
pub const RISK_ANALYSIS_PROMPT: &str = "\
You are reviewing the documents of a construction project to find the claim \
risks that matter most.

Documents:
{documents}

Identify the five most significant claim risks in these documents. Consider \
delays, scope changes, payment disputes, defects, notice failures and \
contract ambiguities.

Answer in exactly this format, one entry per risk:

1. **Risk title**
Description of the risk, the documents it comes from, and why it matters.

2. **Risk title**
Description...

Continue up to 5.";

/// Answer prompt. Placeholders: `{risk_title}`, `{question}`, `{context}`,
/// `{persona_1_instruction}`, `{persona_2_instruction}`,
/// `{persona_3_instruction}`.
pub const ANSWER_TEMPLATE: &str = "\
Claim risk under discussion: {risk_title}

Question: {question}

Relevant project documents:
{context}

Answer the question using the documents above, then give the three \
viewpoints below, each under its own heading.

### Contractor
{persona_1_instruction}

### Owner
{persona_2_instruction}

### Arbitrator
{persona_3_instruction}";

/// Follow-up prompt. Placeholders: `{risk_title}`, `{history}`.
pub const FOLLOW_UP_PROMPT: &str = "\
Based on the claim risk and the conversation below, suggest three questions \
the user is likely to ask next.

**Risk**: {risk_title}

**Conversation**:
{history}

Write each question on its own line, numbered like this:
1. [question 1]
2. [question 2]
3. [question 3]

Questions should be specific and practical and should cover legal, \
technical and contractual angles.";

/// Context line used when retrieval finds nothing.
pub const NO_CONTEXT: &str = "No relevant documents were found.";

/// Replace every `{key}` in `template` with its value.
///
/// Values are inserted verbatim, so braces inside document text are never
/// treated as placeholders.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replaced = after.find('}').and_then(|close| {
            let key = &after[..close];
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (close, *v))
        });
        match replaced {
            Some((close, value)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// The first `n` characters of `text`.
pub fn head_chars(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((i, _)) => &text[..i],
        None => text,
    }
}

/// The last `n` characters of `text`.
pub fn tail_chars(text: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match text.char_indices().rev().nth(n - 1) {
        Some((i, _)) => &text[i..],
        None => text,
    }
}

/// The system prompt and the three persona instructions of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSettings {
    pub system: String,
    pub contractor: String,
    pub owner: String,
    pub arbitrator: String,
}

impl From<&PromptsConfig> for PromptSettings {
    fn from(config: &PromptsConfig) -> Self {
        Self {
            system: config.system.clone(),
            contractor: config.contractor.clone(),
            owner: config.owner.clone(),
            arbitrator: config.arbitrator.clone(),
        }
    }
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self::from(&PromptsConfig::default())
    }
}
