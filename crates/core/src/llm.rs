//! # LLM Generation Collaborator
//!
//! The shipped [`Generate`] implementation: an OpenAI-compatible
//! chat-completions client. Prompt assembly happens here, not in the
//! pipeline — each stage call carries the topic plus every earlier stage's
//! output, so a later stage can build on (or restate in full) what came
//! before it. Retry with backoff also lives here, beneath the `generate`
//! call and invisible to the pipeline.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;
use crate::generate::Generate;
use crate::models::ModelConfig;
use crate::pipeline::context::PipelineContext;
use crate::pipeline::stage::Stage;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const BACKOFF_BASE: Duration = Duration::from_millis(500);
const DEFAULT_MAX_RETRIES: u32 = 2;

/// Chat-completions client for one provider/model.
pub struct LlmGenerator {
    client: reqwest::Client,
    config: ModelConfig,
    api_key: String,
    max_retries: u32,
}

impl LlmGenerator {
    /// Build a generator with an explicit API key.
    pub fn new(config: ModelConfig, api_key: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            config,
            api_key: api_key.into(),
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }

    /// Build a generator, loading the API key from the provider's
    /// environment variable.
    pub fn from_env(config: ModelConfig) -> anyhow::Result<Self> {
        let env = config.provider.api_key_env();
        let api_key = std::env::var(env)
            .map_err(|_| anyhow::anyhow!("{} is not set ({})", env, config.provider.display_name()))?;
        Self::new(config, api_key)
    }

    /// Override the retry budget for rate-limited and transient failures.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    async fn request_once(&self, system: &str, user: &str) -> Result<String, GenerationError> {
        let url = format!("{}/chat/completions", self.config.effective_base_url());
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &detail));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Unclassified(format!("malformed response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| GenerationError::Unclassified("response contained no choices".into()))
    }
}

#[async_trait]
impl Generate for LlmGenerator {
    async fn generate(
        &self,
        ctx: &PipelineContext,
        stage: &Stage,
    ) -> Result<String, GenerationError> {
        let system = system_prompt(stage);
        let user = user_prompt(ctx);

        let mut attempt = 0;
        loop {
            match self.request_once(&system, &user).await {
                Ok(text) => return Ok(text),
                Err(err) if attempt < self.max_retries && is_retryable(&err) => {
                    let backoff = BACKOFF_BASE * 2u32.pow(attempt);
                    tracing::warn!(
                        stage = %stage.name,
                        attempt,
                        "generation failed, retrying in {:?}: {err}",
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn is_retryable(err: &GenerationError) -> bool {
    matches!(
        err,
        GenerationError::RateLimited(_) | GenerationError::Transient(_)
    )
}

fn classify_request_error(err: reqwest::Error) -> GenerationError {
    if err.is_timeout() || err.is_connect() {
        GenerationError::Transient(err.to_string())
    } else {
        GenerationError::Unclassified(err.to_string())
    }
}

fn classify_status(status: StatusCode, detail: &str) -> GenerationError {
    let detail = detail.chars().take(200).collect::<String>();
    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            GenerationError::RateLimited(format!("{status}: {detail}"))
        }
        StatusCode::REQUEST_TIMEOUT => GenerationError::Transient(format!("{status}: {detail}")),
        s if s.is_server_error() => GenerationError::Transient(format!("{status}: {detail}")),
        _ => GenerationError::Unclassified(format!("{status}: {detail}")),
    }
}

/// System message: the stage's instructions plus its output hint.
fn system_prompt(stage: &Stage) -> String {
    match &stage.expected_output {
        Some(hint) => format!("{}\n\nExpected output: {}", stage.instructions, hint),
        None => stage.instructions.clone(),
    }
}

/// User message: the topic followed by every earlier stage's output, in
/// execution order, so nothing produced so far is hidden from this stage.
fn user_prompt(ctx: &PipelineContext) -> String {
    let mut prompt = format!("Topic: {}\n", ctx.topic());
    for output in ctx.outputs() {
        prompt.push_str(&format!("\n## Output of stage '{}'\n{}\n", output.stage, output.text));
    }
    prompt
}

// === Wire types (OpenAI chat-completions subset) ===

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}
