use std::sync::Arc;

use async_trait::async_trait;

use crate::metrics::{CallCounter, CallKind};
use crate::model::Thread;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4.1-mini";

const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 1000;
const REPLIES_IN_PROMPT: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("missing api key (set OPENAI_API_KEY)")]
    MissingApiKey,
    #[error("request failed: {0}")]
    Transport(String),
    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("unexpected response: {0}")]
    Response(String),
    #[error("output text is empty")]
    EmptyOutput,
}

/// Text generation backend. Implementations are chosen at construction.
#[async_trait]
pub trait Summarizer: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(
        &self,
        prompt: &str,
        system_instruction: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, ServiceError>;
}

/// OpenAI Responses API (`POST {base_url}/responses`).
#[derive(Debug, Clone)]
pub struct OpenAiSummarizer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAiSummarizer {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            client,
            endpoint: responses_endpoint(base_url),
            api_key: api_key.to_owned(),
            model: model.to_owned(),
        }
    }

    pub fn from_env(client: reqwest::Client) -> Result<Self, ServiceError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ServiceError::MissingApiKey)?;
        let base_url = std::env::var("BOARD_EXPLORER_OPENAI_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_OPENAI_BASE_URL.to_owned());
        let model = std::env::var("BOARD_EXPLORER_OPENAI_MODEL")
            .unwrap_or_else(|_| DEFAULT_OPENAI_MODEL.to_owned());
        Ok(Self::new(client, &base_url, &api_key, &model))
    }
}

pub fn responses_endpoint(base_url: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    format!("{base_url}/responses")
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(
        &self,
        prompt: &str,
        system_instruction: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, ServiceError> {
        let mut body = serde_json::json!({
            "model": self.model,
            "instructions": system_instruction,
            "input": prompt,
            "max_output_tokens": max_tokens,
            "text": { "format": { "type": "text" } },
            "store": false,
        });

        // GPT-5 family models reject sampling params like `temperature`.
        if !self.model.starts_with("gpt-5")
            && let Some(obj) = body.as_object_mut()
        {
            obj.insert("temperature".to_owned(), serde_json::json!(temperature));
        }

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| ServiceError::Transport(format!("POST {}: {err}", self.endpoint)))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|err| ServiceError::Transport(format!("read response body: {err}")))?;
        if !status.is_success() {
            let message = parse_error_message(&raw).unwrap_or(raw);
            return Err(ServiceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let value: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|err| ServiceError::Response(format!("parse json: {err}")))?;
        extract_output_text(&value)
    }
}

fn parse_error_message(raw_json: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw_json).ok()?;
    let message = value.get("error")?.get("message")?.as_str()?.to_owned();
    Some(message)
}

fn extract_output_text(value: &serde_json::Value) -> Result<String, ServiceError> {
    let output = value
        .get("output")
        .and_then(|v| v.as_array())
        .ok_or_else(|| ServiceError::Response("missing `output` array".to_owned()))?;

    let mut text = String::new();
    for item in output {
        if item.get("type").and_then(|v| v.as_str()) != Some("message") {
            continue;
        }
        let Some(content) = item.get("content").and_then(|v| v.as_array()) else {
            continue;
        };
        for part in content {
            if part.get("type").and_then(|v| v.as_str()) != Some("output_text") {
                continue;
            }
            if let Some(part_text) = part.get("text").and_then(|v| v.as_str()) {
                text.push_str(part_text);
            }
        }
    }

    if text.trim().is_empty() {
        return Err(ServiceError::EmptyOutput);
    }
    Ok(text)
}

/// Offline backend: echoes the opening lines of the prompt's thread text.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExcerptSummarizer;

#[async_trait]
impl Summarizer for ExcerptSummarizer {
    fn name(&self) -> &str {
        "excerpt"
    }

    async fn generate(
        &self,
        prompt: &str,
        _system_instruction: &str,
        _temperature: f32,
        max_tokens: u32,
    ) -> Result<String, ServiceError> {
        let excerpt: String = prompt
            .lines()
            .map(str::trim)
            .filter(|line| line.starts_with("OP:"))
            .map(|line| line.trim_start_matches("OP:").trim())
            .next()
            .unwrap_or_default()
            .chars()
            .take(max_tokens as usize)
            .collect();
        if excerpt.is_empty() {
            return Err(ServiceError::EmptyOutput);
        }
        Ok(excerpt)
    }
}

/// Per-thread summarization on top of a [`Summarizer`]. Failures never
/// propagate; the thread gets a placeholder summary instead.
#[derive(Clone)]
pub struct ThreadSummarizer {
    backend: Arc<dyn Summarizer>,
    counter: Arc<CallCounter>,
    module: String,
    source_name: String,
}

impl ThreadSummarizer {
    pub fn new(
        backend: Arc<dyn Summarizer>,
        counter: Arc<CallCounter>,
        module: &str,
        source_name: &str,
    ) -> Self {
        Self {
            backend,
            counter,
            module: module.to_owned(),
            source_name: source_name.to_owned(),
        }
    }

    pub async fn summarize(&self, thread: &mut Thread, board_label: &str) {
        let prompt = build_prompt(thread, &self.source_name, board_label);
        let instruction = system_instruction(&self.source_name);

        self.counter.increment(CallKind::Llm, &self.module);
        thread.summary = match self
            .backend
            .generate(&prompt, &instruction, TEMPERATURE, MAX_TOKENS)
            .await
        {
            Ok(summary) => summary.trim().to_owned(),
            Err(err) => {
                tracing::warn!(
                    backend = self.backend.name(),
                    thread_id = thread.thread_id,
                    %err,
                    "summary failed; using placeholder"
                );
                format!("summary unavailable: {err}")
            }
        };
    }

    pub async fn summarize_all(&self, threads: &mut [Thread], board_label: impl Fn(&str) -> String) {
        for thread in threads.iter_mut() {
            let label = board_label(&thread.board);
            self.summarize(thread, &label).await;
        }
    }
}

/// Title, opening post and the first few replies.
pub fn build_prompt(thread: &Thread, source_name: &str, board_label: &str) -> String {
    let mut content = format!("Title: {}\n\n", thread.title);
    let mut posts = thread.posts.iter();
    if let Some(op) = posts.next()
        && !op.com.trim().is_empty()
    {
        content.push_str(&format!("OP: {}\n\n", op.com.trim()));
    }
    for (i, reply) in posts
        .filter(|reply| !reply.com.trim().is_empty())
        .take(REPLIES_IN_PROMPT)
        .enumerate()
    {
        content.push_str(&format!("Reply {}: {}\n\n", i + 1, reply.com.trim()));
    }

    format!(
        "Summarize the following {source_name} thread.\n\n\
         Board: {board_label}\n\
         {content}\
         Use this format:\n\
         1. What the thread is about (1-2 sentences)\n\
         2. Main points of discussion (3-5 bullets)\n\
         3. Overall tone of the thread\n\n\
         Tone down hostile content and focus on the technical discussion.\n"
    )
}

fn system_instruction(source_name: &str) -> String {
    format!(
        "You summarize {source_name} threads. Analyse the posts objectively and \
         focus on technical discussion and information. Neutralize aggression and \
         hate speech; extract only useful information, preferring anything about \
         AI and technology."
    )
}
