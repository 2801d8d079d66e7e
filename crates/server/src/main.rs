//! Dossier Server
//!
//! Axum service around the briefing pipeline: accepts a topic, runs the
//! analyst/writer/presenter crew on a background task, streams progress
//! events over SSE, and serves the split result (report + slides). Also
//! ships a headless `run` subcommand that prints the briefing to stdout.

use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json,
    },
    routing::{get, post},
    Router,
};
use clap::{Parser, Subcommand};
use dossier_core::{
    crew, splitter, ChannelReporter, FanoutReporter, LlmGenerator, LlmProvider, ModelConfig,
    ProgressEvent, ProgressReporter, StageOutput, StageState, TracingReporter,
};
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use std::{
    convert::Infallible,
    net::SocketAddr,
    sync::{Arc, RwLock},
};
use tokio::{net::TcpListener, sync::broadcast};
use tracing_subscriber::EnvFilter;

/// Application state
struct AppState {
    status: RwLock<RunStatus>,
    last_result: RwLock<Option<RunOutcome>>,
    event_tx: broadcast::Sender<ProgressEvent>,
    /// Model defaults from the CLI; per-request settings override them.
    model: ModelConfig,
}

type SharedState = Arc<AppState>;

#[derive(Clone, Serialize)]
struct RunStatus {
    /// "idle", "running", "complete", or "failed"
    status: String,
    active_stage: Option<String>,
    error: Option<String>,
}

impl Default for RunStatus {
    fn default() -> Self {
        Self {
            status: "idle".to_string(),
            active_stage: None,
            error: None,
        }
    }
}

/// A finished briefing, as served by `/api/result`.
#[derive(Clone, Serialize)]
struct RunOutcome {
    topic: String,
    report: String,
    slides: Vec<String>,
    outputs: Vec<StageOutput>,
    elapsed_ms: u64,
}

// === API Types ===

#[derive(Debug, Deserialize)]
struct StartRunRequest {
    topic: String,
    settings: Option<ApiSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiSettings {
    provider: Option<String>,
    model: Option<String>,
    base_url: Option<String>,
}

#[derive(Serialize)]
struct ApiResponse {
    success: bool,
    message: String,
}

/// Keeps `RunStatus.active_stage` in step with the event feed.
struct StatusReporter {
    state: SharedState,
}

impl ProgressReporter for StatusReporter {
    fn report(&self, event: &ProgressEvent) {
        let mut status = lock_write(&self.state.status);
        match event.state {
            StageState::Active => status.active_stage = Some(event.stage.clone()),
            StageState::Succeeded | StageState::Failed => status.active_stage = None,
            StageState::Pending => {}
        }
    }
}

/// Write-lock that shrugs off poisoning; status display beats consistency
/// after a panicked writer.
fn lock_write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn lock_read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Parser)]
#[command(author, version, about = "Dossier - topic-to-briefing pipeline")]
struct Args {
    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand, Clone)]
enum CliCommand {
    /// Start the Dossier server (default)
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Default LLM provider (openai, openrouter, grok, deepseek)
        #[arg(long)]
        provider: Option<String>,
        /// Default model name
        #[arg(long)]
        model: Option<String>,
        /// Base URL override for OpenAI-compatible endpoints
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Run one briefing and print it (CLI mode, no server)
    Run {
        /// The topic to brief on
        topic: String,
        #[arg(long)]
        provider: Option<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        base_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match args.command.unwrap_or(CliCommand::Serve {
        port: 8080,
        provider: None,
        model: None,
        base_url: None,
    }) {
        CliCommand::Serve {
            port,
            provider,
            model,
            base_url,
        } => serve(port, resolve_model(provider, model, base_url)?).await,
        CliCommand::Run {
            topic,
            provider,
            model,
            base_url,
        } => run_once(&topic, resolve_model(provider, model, base_url)?).await,
    }
}

/// Build the effective model config from CLI flags.
fn resolve_model(
    provider: Option<String>,
    model: Option<String>,
    base_url: Option<String>,
) -> anyhow::Result<ModelConfig> {
    let provider = match provider {
        Some(name) => parse_provider(&name)
            .ok_or_else(|| anyhow::anyhow!("unknown provider '{name}'"))?,
        None => LlmProvider::default(),
    };
    let mut config = ModelConfig::for_provider(provider);
    if let Some(model) = model {
        config.model = model;
    }
    config.base_url = base_url;
    Ok(config)
}

fn parse_provider(name: &str) -> Option<LlmProvider> {
    match name.to_lowercase().as_str() {
        "openai" => Some(LlmProvider::OpenAI),
        "openrouter" => Some(LlmProvider::OpenRouter),
        "grok" => Some(LlmProvider::Grok),
        "deepseek" => Some(LlmProvider::DeepSeek),
        _ => None,
    }
}

// === Server mode ===

async fn serve(port: u16, model: ModelConfig) -> anyhow::Result<()> {
    let (event_tx, _) = broadcast::channel::<ProgressEvent>(100);

    let state: SharedState = Arc::new(AppState {
        status: RwLock::new(RunStatus::default()),
        last_result: RwLock::new(None),
        event_tx,
        model,
    });

    let app = Router::new()
        .route("/api/run", post(start_run))
        .route("/api/status", get(get_status))
        .route("/api/events", get(events))
        .route("/api/result", get(get_result))
        .with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("dossier listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Kick off a briefing run.
///
/// The topic must be non-empty (the pipeline treats that as a caller
/// precondition, so it is enforced here) and only one run may be active at
/// a time, matching the single user-triggered request this serves.
async fn start_run(
    State(state): State<SharedState>,
    Json(req): Json<StartRunRequest>,
) -> impl IntoResponse {
    let topic = req.topic.trim().to_string();
    if topic.is_empty() {
        return reply(StatusCode::BAD_REQUEST, false, "topic must not be empty");
    }

    let config = match apply_settings(state.model.clone(), req.settings.unwrap_or_default()) {
        Ok(config) => config,
        Err(e) => return reply(StatusCode::BAD_REQUEST, false, &e.to_string()),
    };

    // Missing API keys surface before the run starts, not mid-pipeline.
    let generator = match LlmGenerator::from_env(config) {
        Ok(generator) => generator,
        Err(e) => return reply(StatusCode::BAD_REQUEST, false, &e.to_string()),
    };

    {
        let mut status = lock_write(&state.status);
        if status.status == "running" {
            return reply(StatusCode::CONFLICT, false, "a run is already in progress");
        }
        status.status = "running".to_string();
        status.active_stage = None;
        status.error = None;
    }

    let run_state = state.clone();
    let run_topic = topic.clone();
    tokio::spawn(async move {
        execute_run(run_state, run_topic, generator).await;
    });

    reply(
        StatusCode::OK,
        true,
        &format!("briefing started for topic: {topic}"),
    )
}

/// One full run: pending roster, pipeline, split, status bookkeeping.
async fn execute_run(state: SharedState, topic: String, generator: LlmGenerator) {
    let reporter = FanoutReporter::new()
        .with(TracingReporter)
        .with(ChannelReporter::new(state.event_tx.clone()))
        .with(StatusReporter {
            state: state.clone(),
        });

    let pipeline = crew::briefing_pipeline();

    // Announce the roster so the feed shows the whole pipeline up front.
    for stage in pipeline.stages() {
        reporter.report(&ProgressEvent::new(&stage.name, StageState::Pending, "queued"));
    }

    match pipeline.run(&topic, &generator, &reporter).await {
        Ok(result) => {
            let briefing =
                splitter::split(&result.final_text, crew::SLIDE_SENTINEL, crew::MIN_SLIDE_LEN);
            let elapsed_ms = result.elapsed.as_millis() as u64;
            tracing::info!(
                elapsed_ms,
                slides = briefing.fragments.len(),
                "briefing complete"
            );

            *lock_write(&state.last_result) = Some(RunOutcome {
                topic,
                report: briefing.document,
                slides: briefing.fragments,
                outputs: result.outputs,
                elapsed_ms,
            });

            let mut status = lock_write(&state.status);
            status.status = "complete".to_string();
            status.active_stage = None;
        }
        Err(e) => {
            tracing::error!("briefing failed: {e}");
            let mut status = lock_write(&state.status);
            status.status = "failed".to_string();
            status.active_stage = None;
            status.error = Some(e.to_string());
        }
    }
}

/// Merge per-request settings over the server defaults.
fn apply_settings(mut config: ModelConfig, settings: ApiSettings) -> anyhow::Result<ModelConfig> {
    if let Some(ref name) = settings.provider {
        let provider =
            parse_provider(name).ok_or_else(|| anyhow::anyhow!("unknown provider '{name}'"))?;
        config = ModelConfig::for_provider(provider);
    }
    if let Some(model) = settings.model {
        config.model = model;
    }
    if let Some(base_url) = settings.base_url {
        config.base_url = Some(base_url);
    }
    Ok(config)
}

fn reply(code: StatusCode, success: bool, message: &str) -> (StatusCode, Json<ApiResponse>) {
    (
        code,
        Json(ApiResponse {
            success,
            message: message.to_string(),
        }),
    )
}

async fn get_status(State(state): State<SharedState>) -> Json<RunStatus> {
    Json(lock_read(&state.status).clone())
}

async fn get_result(State(state): State<SharedState>) -> impl IntoResponse {
    match lock_read(&state.last_result).clone() {
        Some(outcome) => Json(outcome).into_response(),
        None => reply(StatusCode::NOT_FOUND, false, "no completed run yet").into_response(),
    }
}

/// SSE endpoint for real-time progress events with heartbeat
async fn events(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.event_tx.subscribe();

    let stream = stream::unfold(rx, |mut rx| async move {
        let timeout = tokio::time::timeout(std::time::Duration::from_secs(15), rx.recv()).await;

        match timeout {
            Ok(Ok(event)) => {
                let json = serde_json::to_string(&event).unwrap_or_default();
                Some((Ok(Event::default().data(json)), rx))
            }
            // Lagged receivers skip ahead; a closed channel ends the stream.
            Ok(Err(broadcast::error::RecvError::Lagged(_))) => {
                Some((Ok(Event::default().comment("lagged")), rx))
            }
            Ok(Err(broadcast::error::RecvError::Closed)) => None,
            Err(_) => Some((Ok(Event::default().comment("heartbeat")), rx)),
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

// === CLI mode ===

async fn run_once(topic: &str, model: ModelConfig) -> anyhow::Result<()> {
    let topic = topic.trim();
    anyhow::ensure!(!topic.is_empty(), "topic must not be empty");

    let generator = LlmGenerator::from_env(model)?;
    let result = crew::briefing_pipeline()
        .run(topic, &generator, &TracingReporter)
        .await?;

    let briefing = splitter::split(&result.final_text, crew::SLIDE_SENTINEL, crew::MIN_SLIDE_LEN);

    println!("{}", briefing.document);
    for (i, slide) in briefing.fragments.iter().enumerate() {
        println!("\n--- Slide {} ---\n{}", i + 1, slide);
    }
    tracing::info!(
        elapsed_ms = result.elapsed.as_millis() as u64,
        "briefing complete"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_provider() {
        assert_eq!(parse_provider("OpenAI"), Some(LlmProvider::OpenAI));
        assert_eq!(parse_provider("deepseek"), Some(LlmProvider::DeepSeek));
        assert_eq!(parse_provider("anthropic"), None);
    }

    #[test]
    fn test_resolve_model_rejects_unknown_provider() {
        assert!(resolve_model(Some("claude".into()), None, None).is_err());
        let config = resolve_model(Some("grok".into()), Some("grok-2-latest".into()), None).unwrap();
        assert_eq!(config.provider, LlmProvider::Grok);
        assert_eq!(config.model, "grok-2-latest");
    }

    #[test]
    fn test_apply_settings_overrides_defaults() {
        let base = ModelConfig::default();
        let merged = apply_settings(
            base,
            ApiSettings {
                provider: Some("deepseek".into()),
                model: Some("deepseek-reasoner".into()),
                base_url: Some("http://localhost:9000/v1".into()),
            },
        )
        .unwrap();
        assert_eq!(merged.provider, LlmProvider::DeepSeek);
        assert_eq!(merged.model, "deepseek-reasoner");
        assert_eq!(merged.base_url.as_deref(), Some("http://localhost:9000/v1"));
    }

    #[test]
    fn test_start_run_request_deserialization() {
        let req: StartRunRequest =
            serde_json::from_str(r#"{"topic":"KI-Trends 2026"}"#).unwrap();
        assert_eq!(req.topic, "KI-Trends 2026");
        assert!(req.settings.is_none());

        let req: StartRunRequest = serde_json::from_str(
            r#"{"topic":"rust","settings":{"provider":"openrouter"}}"#,
        )
        .unwrap();
        assert_eq!(
            req.settings.unwrap().provider.as_deref(),
            Some("openrouter")
        );
    }

    #[test]
    fn test_default_status_is_idle() {
        let status = RunStatus::default();
        assert_eq!(status.status, "idle");
        assert!(status.active_stage.is_none());
        assert!(status.error.is_none());
    }
}
