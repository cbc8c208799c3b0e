use serde::{Deserialize, Serialize};

/// Body of `/api/comment` and `/api/recommend`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JournalTextRequest {
    #[serde(default)]
    pub keywords: String,
    #[serde(default)]
    pub text: String,
    /// Calendar year of the entry, for the prompt only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    /// Week index within the year (0..=51); shown 1-based in the prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommentResponse {
    pub comment: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendResponse {
    pub recommendation: String,
}
