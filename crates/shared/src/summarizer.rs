use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;

const MAX_BULLETS: usize = 3;
const MAX_BULLET_CHARS: usize = 160;
const TRUNCATED_BULLET_CHARS: usize = 157;
const MAX_PROMPT_BODY_CHARS: usize = 8000;
const TEMPERATURE: f32 = 0.3;
const SYSTEM_PROMPT: &str = "You write crisp, factual bullet summaries.";

/// Outcome of asking the language model for a summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Summary {
    Generated(String),
    Unavailable(String),
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
}

#[derive(Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Summarizer backed by an OpenAI-compatible chat-completions endpoint.
pub struct OpenAiSummarizer {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiSummarizer {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    /// One attempt, no retries. Every failure becomes `Summary::Unavailable`.
    pub async fn summarize_article(&self, title: &str, body: &str) -> Summary {
        match self.try_summarize(title, body).await {
            Ok(text) if !text.is_empty() => Summary::Generated(text),
            Ok(_) => Summary::Unavailable("empty response from language model".to_string()),
            Err(e) => Summary::Unavailable(format!("{:#}", e)),
        }
    }

    async fn try_summarize(&self, title: &str, body: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: build_prompt(title, body),
                },
            ],
            temperature: TEMPERATURE,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to OpenAI API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            anyhow::bail!("OpenAI API error {}: {}", status, error_text);
        }

        let chat_response = response
            .json::<ChatResponse>()
            .await
            .context("Failed to parse OpenAI API response")?;

        let text = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        Ok(text.trim().to_string())
    }
}

/// Summarization strategy, chosen once from configuration.
pub enum Summarizer {
    OpenAi(OpenAiSummarizer),
    Local,
}

impl Summarizer {
    /// Use the language model when an API key is configured, otherwise the
    /// local fallback.
    pub fn from_config(config: &Config) -> Result<Self> {
        match &config.openai_api_key {
            Some(key) => Ok(Self::OpenAi(OpenAiSummarizer::new(
                key.clone(),
                config.openai_base_url.clone(),
                config.openai_model.clone(),
            )?)),
            None => Ok(Self::Local),
        }
    }

    /// Never fails and never returns an empty string.
    pub async fn summarize(&self, title: &str, body: &str) -> String {
        match self {
            Self::OpenAi(llm) => match llm.summarize_article(title, body).await {
                Summary::Generated(text) => text,
                Summary::Unavailable(reason) => {
                    tracing::warn!(%title, %reason, "LLM summary unavailable, using fallback");
                    fallback_summary(title, body)
                }
            },
            Self::Local => fallback_summary(title, body),
        }
    }
}

/// Deterministic bullet extraction from the first sentences of the body.
///
/// Cuts are made at a character count, not a word boundary.
pub fn fallback_summary(title: &str, body: &str) -> String {
    let bullets: Vec<String> = body
        .trim()
        .split(". ")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .take(MAX_BULLETS)
        .map(|s| format!("- {}", shorten(s)))
        .collect();

    if bullets.is_empty() {
        format!("- {}: (no content available)", title)
    } else {
        bullets.join("\n")
    }
}

fn shorten(sentence: &str) -> String {
    if sentence.chars().count() > MAX_BULLET_CHARS {
        let kept: String = sentence.chars().take(TRUNCATED_BULLET_CHARS).collect();
        format!("{}...", kept)
    } else {
        sentence.to_string()
    }
}

fn build_prompt(title: &str, body: &str) -> String {
    let excerpt: String = body.chars().take(MAX_PROMPT_BODY_CHARS).collect();
    format!(
        "Summarize the article titled \"{}\" into 3-5 concise bullets for a newsletter.\n\
         Use neutral tone; each bullet under 22 words.\n\
         Article:\n{}\n",
        title, excerpt
    )
}
