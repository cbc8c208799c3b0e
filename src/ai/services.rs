use tracing::warn;

use super::client::AiClient;
use super::dto::JournalTextRequest;
use super::fallback::NO_ENTRY_RECOMMENDATION;
use crate::error::{AppError, AppResult};

pub const NO_ENTRY_COMMENT: &str = "No journal entry for this week.";
/// Returned when the service answered with no text.
pub const PLACEHOLDER_COMMENT: &str = "A week captured in your memory.";
pub const PLACEHOLDER_RECOMMENDATION: &str = "No recommendation generated.";

const MAX_JOURNAL_CHARS: usize = 1500;
const COMMENT_MAX_TOKENS: u32 = 200;
const RECOMMEND_MAX_TOKENS: u32 = 300;

struct Entry {
    keywords: String,
    text: String,
}

fn entry(req: &JournalTextRequest) -> Entry {
    Entry {
        keywords: req.keywords.trim().to_string(),
        text: req.text.trim().chars().take(MAX_JOURNAL_CHARS).collect(),
    }
}

fn comment_prompt(e: &Entry, year: Option<i32>, week: Option<u32>) -> String {
    let when = match (week, year) {
        (Some(w), Some(y)) => format!(" from Week {}, {y}", w + 1),
        _ => String::new(),
    };
    format!(
        "You are reading a weekly journal entry{when}. Read through the person's week and write \
         a warm, emotional one-line summary or reflection that captures the feelings, mood and \
         essence of this week, like a friend who truly understands what it meant to them. \
         Keep it to ONE SENTENCE ONLY.\n\n\
         Keywords: {}\nJournal: {}\n\n\
         Reply with only the one-line summary about this week, no extra text.",
        e.keywords, e.text
    )
}

fn recommend_prompt(e: &Entry) -> String {
    format!(
        "You are a warm, caring friend reading a weekly journal. Based on this week's journal, \
         suggest ONE concrete action or challenge for NEXT WEEK. Be warm, personal and specific. \
         It must be ONE LINE ONLY.\n\n\
         Keywords: {}\nJournal: {}\n\n\
         Reply with only ONE recommendation for next week, one line, no extra text.",
        e.keywords, e.text
    )
}

pub fn first_line(s: &str) -> String {
    s.trim().lines().next().unwrap_or_default().trim().to_string()
}

async fn generate(ai: Option<&dyn AiClient>, prompt: &str, max_tokens: u32) -> AppResult<String> {
    let ai = ai.ok_or_else(|| AppError::UpstreamUnavailable("AI service not configured".into()))?;
    let raw = ai.complete(prompt, max_tokens).await.map_err(|e| {
        warn!(error = %format!("{e:#}"), "AI generation failed");
        AppError::UpstreamFailed(e.to_string())
    })?;
    Ok(first_line(&raw))
}

pub async fn comment(ai: Option<&dyn AiClient>, req: &JournalTextRequest) -> AppResult<String> {
    let e = entry(req);
    if e.keywords.is_empty() && e.text.is_empty() {
        return Ok(NO_ENTRY_COMMENT.to_string());
    }
    let text = generate(ai, &comment_prompt(&e, req.year, req.week), COMMENT_MAX_TOKENS).await?;
    Ok(if text.is_empty() {
        PLACEHOLDER_COMMENT.to_string()
    } else {
        text
    })
}

pub async fn recommend(ai: Option<&dyn AiClient>, req: &JournalTextRequest) -> AppResult<String> {
    let e = entry(req);
    if e.keywords.is_empty() && e.text.is_empty() {
        return Ok(NO_ENTRY_RECOMMENDATION.to_string());
    }
    let text = generate(ai, &recommend_prompt(&e), RECOMMEND_MAX_TOKENS).await?;
    Ok(if text.is_empty() {
        PLACEHOLDER_RECOMMENDATION.to_string()
    } else {
        text
    })
}
