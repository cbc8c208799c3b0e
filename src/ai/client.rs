use std::time::Duration;

use anyhow::Context;
use axum::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::AiConfig;

const API_VERSION: &str = "2024-02-15-preview";

/// Text-in/text-out generation service.
#[async_trait]
pub trait AiClient: Send + Sync {
    /// Returns the model's raw text; empty when the answer carried none.
    async fn complete(&self, prompt: &str, max_tokens: u32) -> anyhow::Result<String>;
}

/// Which upstream wire format the endpoint speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamApi {
    ChatCompletions,
    Responses,
}

pub struct AzureOpenAi {
    http: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    api: UpstreamApi,
}

impl AzureOpenAi {
    pub fn new(cfg: &AiConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("build AI http client")?;
        let url = endpoint_url(&cfg.endpoint, &cfg.model);
        let api = detect_api(&url);
        debug!(%url, ?api, "AI client configured");
        Ok(Self {
            http,
            url,
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            api,
        })
    }
}

/// A full chat/responses URL is used verbatim; anything else is treated as the
/// resource base URL and expanded to the model's chat-completions deployment.
pub fn endpoint_url(endpoint: &str, model: &str) -> String {
    let url = endpoint.trim();
    if url.contains("/chat/completions") || url.contains("/responses") {
        return url.to_string();
    }
    format!(
        "{}/openai/deployments/{}/chat/completions?api-version={API_VERSION}",
        url.trim_end_matches('/'),
        model
    )
}

pub fn detect_api(url: &str) -> UpstreamApi {
    if url.contains("/responses") {
        UpstreamApi::Responses
    } else {
        UpstreamApi::ChatCompletions
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum RequestBody<'a> {
    Chat {
        messages: [ChatMessageOut<'a>; 1],
        max_tokens: u32,
        temperature: f32,
    },
    Responses {
        model: &'a str,
        input: &'a str,
    },
}

#[derive(Serialize)]
struct ChatMessageOut<'a> {
    role: &'static str,
    content: &'a str,
}

#[async_trait]
impl AiClient for AzureOpenAi {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> anyhow::Result<String> {
        let body = match self.api {
            UpstreamApi::ChatCompletions => RequestBody::Chat {
                messages: [ChatMessageOut {
                    role: "user",
                    content: prompt,
                }],
                max_tokens,
                temperature: 0.7,
            },
            UpstreamApi::Responses => RequestBody::Responses {
                model: &self.model,
                input: prompt,
            },
        };

        let res = self
            .http
            .post(&self.url)
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .context("AI request")?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            let snippet: String = text.chars().take(200).collect();
            error!(%status, body = %snippet, "AI upstream error");
            anyhow::bail!("AI upstream returned {status}");
        }

        let bytes = res.bytes().await.context("read AI response")?;
        decode_completion(self.api, &bytes)
    }
}

#[derive(Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChatMessageIn>,
}

#[derive(Deserialize)]
struct ChatMessageIn {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ResponsesResult {
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OutputItem {
    Message {
        #[serde(default)]
        content: Vec<ContentPart>,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    OutputText { text: String },
    #[serde(other)]
    Other,
}

/// Extracts the generated text from one documented shape per API:
/// `choices[0].message.content` or the first `output_text` part of the first
/// `message` output item. Any other valid JSON yields an empty string.
pub fn decode_completion(api: UpstreamApi, body: &[u8]) -> anyhow::Result<String> {
    let text = match api {
        UpstreamApi::ChatCompletions => {
            let parsed: ChatCompletion =
                serde_json::from_slice(body).context("decode chat completion")?;
            parsed
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message)
                .and_then(|m| m.content)
        }
        UpstreamApi::Responses => {
            let parsed: ResponsesResult =
                serde_json::from_slice(body).context("decode responses output")?;
            parsed.output.into_iter().find_map(|item| match item {
                OutputItem::Message { content } => content.into_iter().find_map(|p| match p {
                    ContentPart::OutputText { text } if !text.is_empty() => Some(text),
                    _ => None,
                }),
                OutputItem::Other => None,
            })
        }
    };
    Ok(text.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_endpoint_expands_to_deployment_url() {
        assert_eq!(
            endpoint_url("https://res.openai.azure.com/", "gpt-5-mini"),
            "https://res.openai.azure.com/openai/deployments/gpt-5-mini/chat/completions?api-version=2024-02-15-preview"
        );
        let full = "https://res.openai.azure.com/openai/responses?api-version=x";
        assert_eq!(endpoint_url(full, "m"), full);
        assert_eq!(detect_api(full), UpstreamApi::Responses);
        assert_eq!(
            detect_api(&endpoint_url("https://res", "m")),
            UpstreamApi::ChatCompletions
        );
    }

    #[test]
    fn decodes_chat_completion() {
        let body = br#"{"choices":[{"message":{"role":"assistant","content":"A calm week."}}]}"#;
        assert_eq!(
            decode_completion(UpstreamApi::ChatCompletions, body).unwrap(),
            "A calm week."
        );
    }

    #[test]
    fn decodes_responses_output() {
        let body = br#"{"output":[
            {"type":"reasoning","summary":[]},
            {"type":"message","content":[{"type":"output_text","text":"Call a friend."}]}
        ]}"#;
        assert_eq!(
            decode_completion(UpstreamApi::Responses, body).unwrap(),
            "Call a friend."
        );
    }

    #[test]
    fn unexpected_shapes_decode_to_empty() {
        assert_eq!(
            decode_completion(UpstreamApi::ChatCompletions, br#"{"choices":[]}"#).unwrap(),
            ""
        );
        assert_eq!(
            decode_completion(UpstreamApi::Responses, br#"{"text":"ignored"}"#).unwrap(),
            ""
        );
        assert!(decode_completion(UpstreamApi::Responses, b"not json").is_err());
    }
}
