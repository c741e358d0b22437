//! Retrieval-augmented answers and follow-up question suggestions.

use anyhow::Result;
use std::sync::Arc;

use crate::config::AnalysisConfig;
use crate::llm::ChatModel;
use crate::models::{ChatMessage, RetrievedChunk};
use crate::prompts::{
    render, tail_chars, PromptSettings, ANSWER_TEMPLATE, FOLLOW_UP_PROMPT, NO_CONTEXT,
};
use crate::retrieve::Retriever;

/// Hits retrieved per answer.
pub const ANSWER_TOP_K: usize = 5;

/// Follow-up questions kept per suggestion round.
pub const MAX_FOLLOW_UPS: usize = 3;

/// Render retrieved chunks as the answer prompt's context block.
///
/// Falls back to [`NO_CONTEXT`] when nothing was retrieved.
pub fn build_context(hits: &[RetrievedChunk]) -> String {
    if hits.is_empty() {
        return NO_CONTEXT.to_string();
    }
    let rule = "-".repeat(50);
    let mut context = String::new();
    for hit in hits {
        context.push_str(&format!(
            "\n[{} - {}]\n",
            hit.metadata.category, hit.metadata.filename
        ));
        context.push_str(&format!("{}\n", hit.content));
        context.push_str(&format!("{}\n", rule));
    }
    context
}

/// The last `turns` messages as `role: content` lines.
pub fn conversation_tail(transcript: &[ChatMessage], turns: usize) -> String {
    let start = transcript.len().saturating_sub(turns);
    transcript[start..]
        .iter()
        .map(|m| format!("{}: {}", m.role.as_str(), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Extract up to three questions from a model reply.
///
/// Only lines starting with a digit or a bullet (`-`, `*`, `•`) count; the
/// number or bullet marker is stripped.
pub fn parse_follow_up_questions(reply: &str) -> Vec<String> {
    reply
        .lines()
        .map(str::trim)
        .filter(|line| {
            line.starts_with(|c: char| c.is_ascii_digit() || matches!(c, '-' | '*' | '•'))
        })
        .map(strip_list_marker)
        .filter(|q| !q.is_empty())
        .map(str::to_string)
        .take(MAX_FOLLOW_UPS)
        .collect()
}

fn strip_list_marker(line: &str) -> &str {
    let rest = line.trim_start_matches(|c: char| c.is_ascii_digit());
    let rest = if rest.len() < line.len() {
        rest.strip_prefix('.')
            .or_else(|| rest.strip_prefix(')'))
            .unwrap_or(rest)
    } else {
        rest
    };
    rest.trim_start_matches(['-', '*', '•']).trim()
}

pub struct ChatResponder {
    model: Arc<dyn ChatModel>,
    retriever: Arc<Retriever>,
    history_turns: usize,
    history_chars: usize,
}

impl ChatResponder {
    pub fn new(
        model: Arc<dyn ChatModel>,
        retriever: Arc<Retriever>,
        config: &AnalysisConfig,
    ) -> Self {
        Self {
            model,
            retriever,
            history_turns: config.history_turns,
            history_chars: config.history_chars,
        }
    }

    /// Answer `question` about `risk_title` from the indexed documents.
    pub async fn answer(
        &self,
        risk_title: &str,
        question: &str,
        prompts: &PromptSettings,
    ) -> Result<String> {
        let query = format!("{} {}", risk_title, question);
        let hits = self.retriever.retrieve_k(&query, ANSWER_TOP_K).await?;
        tracing::debug!(hits = hits.len(), "context retrieved for answer");

        let context = build_context(&hits);
        let user_prompt = render(
            ANSWER_TEMPLATE,
            &[
                ("risk_title", risk_title),
                ("question", question),
                ("context", &context),
                ("persona_1_instruction", &prompts.contractor),
                ("persona_2_instruction", &prompts.owner),
                ("persona_3_instruction", &prompts.arbitrator),
            ],
        );

        self.model
            .complete(&[
                ChatMessage::system(prompts.system.as_str()),
                ChatMessage::user(user_prompt),
            ])
            .await
    }

    /// Suggest questions the user may ask next about `risk_title`.
    pub async fn follow_up_questions(
        &self,
        risk_title: &str,
        transcript: &[ChatMessage],
    ) -> Result<Vec<String>> {
        let conversation = conversation_tail(transcript, self.history_turns);
        let prompt = render(
            FOLLOW_UP_PROMPT,
            &[
                ("risk_title", risk_title),
                ("history", tail_chars(&conversation, self.history_chars)),
            ],
        );
        let reply = self.model.complete_prompt(&prompt).await?;
        Ok(parse_follow_up_questions(&reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChunkMetadata;

    #[test]
    fn context_block_lists_each_hit() {
        let hits = vec![RetrievedChunk {
            content: "Clause 20.1 requires notice within 28 days.".to_string(),
            metadata: ChunkMetadata {
                category: "Contract".to_string(),
                filename: "gcc.pdf".to_string(),
                chunk_index: 4,
            },
            distance: 0.12,
        }];
        let context = build_context(&hits);
        assert_eq!(
            context,
            format!(
                "\n[Contract - gcc.pdf]\nClause 20.1 requires notice within 28 days.\n{}\n",
                "-".repeat(50)
            )
        );
    }

    #[test]
    fn empty_context_uses_fallback_line() {
        assert_eq!(build_context(&[]), NO_CONTEXT);
    }

    #[test]
    fn conversation_tail_keeps_last_turns() {
        let transcript = vec![
            ChatMessage::assistant("greeting"),
            ChatMessage::user("q1"),
            ChatMessage::assistant("a1"),
            ChatMessage::user("q2"),
        ];
        assert_eq!(
            conversation_tail(&transcript, 3),
            "user: q1\nassistant: a1\nuser: q2"
        );
        assert_eq!(conversation_tail(&transcript[..1], 3), "assistant: greeting");
    }

    #[test]
    fn follow_ups_strip_markers_and_cap_at_three() {
        let reply = "Here are some questions:\n\n\
                     1. What notice period applies?\n\
                     2) Who bears the cost of the redesign?\n\
                     - Was the delay concurrent?\n\
                     • Can liquidated damages be capped?\n";
        assert_eq!(
            parse_follow_up_questions(reply),
            vec![
                "What notice period applies?",
                "Who bears the cost of the redesign?",
                "Was the delay concurrent?",
            ]
        );
    }

    #[test]
    fn follow_ups_keep_inner_periods() {
        let reply = "1. Does clause 8.4 allow an extension?\n* \n";
        assert_eq!(
            parse_follow_up_questions(reply),
            vec!["Does clause 8.4 allow an extension?"]
        );
    }

    #[test]
    fn follow_ups_ignore_unmarked_lines() {
        assert!(parse_follow_up_questions("No questions today.").is_empty());
    }
}
