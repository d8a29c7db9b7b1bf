/// Chat completion client (answer composer).
///
/// Formats retrieved records into a prompt and forwards it to an
/// OpenRouter-compatible chat completions endpoint. Everything before this
/// point — ranking and top-K selection — is the retrieval core; this layer
/// only concatenates context and performs the HTTP call.
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::store::SearchHit;

/// Separator between context snippets.
const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// System instruction sent with every request.
const SYSTEM_PROMPT: &str = "You are a senior developer assistant. Answer clearly and concisely.";

/// Default request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

/// Client for an OpenRouter-compatible chat completions API.
pub struct ChatClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl ChatClient {
    pub fn new(api_key: String, base_url: String, model: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .context("failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key,
            base_url,
            model,
        })
    }

    /// Answer `question` using the retrieved records as context.
    pub async fn ask(&self, question: &str, hits: &[SearchHit<'_>]) -> Result<String> {
        let context = build_context(hits);
        let prompt = build_prompt(&context, question);

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
        };

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", "http://localhost")
            .header("X-Title", "codeask")
            .json(&request)
            .send()
            .await
            .context("chat completion request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("chat completion returned {status}: {body}");
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .context("failed to parse chat completion response")?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .context("chat completion response had no choices")
    }
}

/// Concatenate retrieved records into the context block.
pub fn build_context(hits: &[SearchHit<'_>]) -> String {
    hits.iter()
        .map(|h| format!("File: {}\n\n{}", h.record.file_path, h.record.content))
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

/// Wrap context and question into the user prompt.
pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "You are a helpful AI code assistant. Use the code snippets below to answer \
         the user's question.\n\n{context}\n\n---\n\nUser question: \"{question}\"\n\nAnswer:"
    )
}
