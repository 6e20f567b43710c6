use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::AppError;

pub const DEFAULT_STORY_LANGUAGE: &str = "zh-CN";
const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_STORY_TOKENS: u32 = 1024;

#[async_trait]
pub trait StoryTeller: Send + Sync {
    async fn tell_story(&self, topic: &str, language: &str) -> Result<String, AppError>;
}

pub fn story_instructions(topic: &str, language: &str) -> String {
    format!(
        "You are a storyteller. You will be given a topic and you will need to tell a story within 300 words about it.\n\nTopic: {topic}\nLanguage: {language}"
    )
}

/// Used when no model credentials are configured.
#[derive(Debug, Default)]
pub struct UnconfiguredStoryTeller;

#[async_trait]
impl StoryTeller for UnconfiguredStoryTeller {
    async fn tell_story(&self, _topic: &str, _language: &str) -> Result<String, AppError> {
        Err(AppError::upstream(
            "story_model_unconfigured",
            "storytelling model is not configured (set ANTHROPIC_API_KEY)",
        ))
    }
}

#[derive(Debug)]
pub struct AnthropicStoryTeller {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: String,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicStoryTeller {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::internal(format!("failed to build http client: {err}")))?;

        Ok(Self {
            client,
            api_key,
            model,
        })
    }
}

#[async_trait]
impl StoryTeller for AnthropicStoryTeller {
    async fn tell_story(&self, topic: &str, language: &str) -> Result<String, AppError> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: MAX_STORY_TOKENS,
            system: story_instructions(topic, language),
            messages: vec![ChatMessage {
                role: "user",
                content: topic,
            }],
        };

        debug!(model = %self.model, language = %language, "requesting story");
        let response = self
            .client
            .post(ANTHROPIC_MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|err| {
                AppError::upstream("story_request_failed", format!("story request failed: {err}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "story model returned an error status");
            return Err(AppError::upstream(
                "story_request_failed",
                format!("story model responded with status {status}"),
            ));
        }

        let body: MessagesResponse = response.json().await.map_err(|err| {
            AppError::upstream("story_response_invalid", format!("invalid story response: {err}"))
        })?;

        extract_story(body)
    }
}

fn extract_story(body: MessagesResponse) -> Result<String, AppError> {
    let story = body
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect::<Vec<_>>()
        .join("");

    if story.trim().is_empty() {
        return Err(AppError::upstream(
            "story_response_empty",
            "story model returned no text",
        ));
    }
    Ok(story)
}
