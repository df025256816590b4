use crate::config::{AiProvider, AiSettings};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error};

const GEMINI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const GROQ_BASE: &str = "https://api.groq.com/openai/v1";

/// A text-completion backend: one prompt in, one free-text reply out.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String>;
}

pub fn from_settings(settings: &AiSettings, api_key: &str) -> anyhow::Result<Box<dyn CompletionProvider>> {
    let client = Client::builder()
        .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
        .user_agent("warden-bot (moderation classifier)")
        .build()?;

    let provider: Box<dyn CompletionProvider> = match settings.provider {
        AiProvider::Gemini => Box::new(GeminiProvider {
            client,
            base_url: settings.base_url.clone().unwrap_or_else(|| GEMINI_BASE.to_string()),
            model: settings.model.clone(),
            api_key: api_key.to_string(),
        }),
        AiProvider::OpenAi => Box::new(OpenAiProvider {
            client,
            base_url: settings.base_url.clone().unwrap_or_else(|| GROQ_BASE.to_string()),
            model: settings.model.clone(),
            api_key: api_key.to_string(),
        }),
    };
    Ok(provider)
}

pub struct GeminiProvider {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[async_trait]
impl CompletionProvider for GeminiProvider {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url.trim_end_matches('/'), self.model);
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });
        debug!("POST {}", url);

        let resp = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            error!("generateContent failed {}: {}", status, text);
            anyhow::bail!("Gemini API error {}: {}", status, text);
        }

        let body: Value = resp.json().await?;
        gemini_text(&body)
            .ok_or_else(|| anyhow::anyhow!("missing candidate text in generateContent response: {}", body))
    }
}

fn gemini_text(body: &Value) -> Option<String> {
    let parts = body["candidates"][0]["content"]["parts"].as_array()?;
    let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();
    if text.is_empty() { None } else { Some(text) }
}

/// OpenAI-compatible `chat/completions` endpoint (Groq, OpenAI, local servers).
pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }]
        });
        debug!("POST {}", url);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            error!("chat/completions failed {}: {}", status, text);
            anyhow::bail!("Completion API error {}: {}", status, text);
        }

        let body: Value = resp.json().await?;
        body["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("missing 'choices[0].message.content' in response: {}", body))
    }
}
