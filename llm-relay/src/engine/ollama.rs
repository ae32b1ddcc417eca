//! Ollama inference engine implementation.

use std::collections::VecDeque;
use std::sync::{Arc, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures_util::stream;
use llm_relay_common::{
    completion_id, created_now, ChatCompletionChunk, ChatCompletionRequest, InitProgressReport,
    Usage, UsageExtra,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use super::ndjson::{parse_line, LineBuffer};
use super::{ChunkStream, EngineFactory, InferenceEngine, InitProgressCallback, SamplingConfig};
use crate::config::EngineConfig;
use crate::error::{Error, Result};

/// Ollama inference engine.
///
/// Communicates with an Ollama server. Ollama itself is stateless between
/// requests, so the engine remembers which model was loaded and with which
/// sampling configuration, and applies both to every chat request.
pub struct OllamaEngine {
    http_client: Client,
    base_url: String,
    keep_alive: String,
    pull_missing: bool,
    progress_callback: std::sync::RwLock<Option<InitProgressCallback>>,
    loaded: RwLock<Option<LoadedModel>>,
    last_message: Arc<Mutex<Option<String>>>,
}

#[derive(Debug, Clone)]
struct LoadedModel {
    model_id: String,
    sampling: SamplingConfig,
}

impl OllamaEngine {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), &EngineConfig::with_base_url(base_url))
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http_client = builder
            .build()
            .map_err(|e| Error::Communication(e.to_string()))?;
        Ok(Self::with_client(http_client, config))
    }

    fn with_client(http_client: Client, config: &EngineConfig) -> Self {
        Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            keep_alive: config.keep_alive.clone(),
            pull_missing: config.pull_missing,
            progress_callback: std::sync::RwLock::new(None),
            loaded: RwLock::new(None),
            last_message: Arc::new(Mutex::new(None)),
        }
    }

    /// Factory building a fresh engine from `config` on every call.
    pub fn factory(config: EngineConfig) -> impl EngineFactory {
        move || {
            OllamaEngine::from_config(&config).map(|e| Arc::new(e) as Arc<dyn InferenceEngine>)
        }
    }

    fn report_progress(&self, report: InitProgressReport) {
        let callback = self
            .progress_callback
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(callback) = callback {
            callback(&report);
        }
    }

    async fn pull_model(&self, model_id: &str, started: Instant) -> Result<()> {
        let url = format!("{}/api/pull", self.base_url);
        let request = OllamaPullRequest {
            model: model_id.to_string(),
            stream: true,
        };

        tracing::debug!("Pulling model {} from {}", model_id, url);

        let mut response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Communication(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::LoadFailed(format!(
                "Failed to pull model {}: {} {}",
                model_id, status, body
            )));
        }

        let mut lines = LineBuffer::new();
        loop {
            while let Some(line) = lines.next_line() {
                self.handle_pull_line(model_id, &line, started)?;
            }
            match response
                .chunk()
                .await
                .map_err(|e| Error::Communication(e.to_string()))?
            {
                Some(bytes) => lines.push(&bytes),
                None => break,
            }
        }
        if let Some(line) = lines.take_remainder() {
            self.handle_pull_line(model_id, &line, started)?;
        }

        Ok(())
    }

    fn handle_pull_line(&self, model_id: &str, line: &str, started: Instant) -> Result<()> {
        let status: OllamaPullStatus = parse_line(line)?;
        if let Some(error) = status.error {
            return Err(Error::LoadFailed(format!(
                "Failed to pull model {}: {}",
                model_id, error
            )));
        }

        let fraction = match (status.completed, status.total) {
            (Some(completed), Some(total)) if total > 0 => Some(completed as f64 / total as f64),
            _ => None,
        };
        let text = match fraction {
            Some(f) => format!("{} ({:.0}%)", status.status, f * 100.0),
            None => status.status,
        };

        tracing::debug!("Pull progress for {}: {}", model_id, text);
        self.report_progress(InitProgressReport::new(
            fraction.unwrap_or(0.0),
            started.elapsed().as_secs_f64(),
            text,
        ));
        Ok(())
    }

    /// Loads the model into memory by sending an empty prompt with `keep_alive`.
    async fn warm_model(&self, model_id: &str, config: &SamplingConfig) -> Result<()> {
        let url = format!("{}/api/generate", self.base_url);

        let request = OllamaGenerateRequest {
            model: model_id.to_string(),
            prompt: String::new(),
            stream: false,
            keep_alive: Some(self.keep_alive.clone()),
            options: Some(OllamaOptions {
                temperature: Some(config.temperature),
                top_p: Some(config.top_p),
                num_predict: None,
            }),
        };

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Communication(e.to_string()))?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::LoadFailed(format!(
                "Failed to load model {}: {}",
                model_id, body
            )));
        }

        Ok(())
    }
}

// ============================================================================
// Ollama API types
// ============================================================================

#[derive(Debug, Serialize)]
struct OllamaPullRequest {
    model: String,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaPullStatus {
    #[serde(default)]
    status: String,
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    completed: Option<u64>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct OllamaGenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    keep_alive: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    keep_alive: Option<String>,
    options: OllamaOptions,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// One line of a streamed `/api/chat` response.
#[derive(Debug, Deserialize)]
struct OllamaChatStreamLine {
    #[serde(default)]
    message: Option<OllamaMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
    // Durations are reported in nanoseconds.
    #[serde(default)]
    total_duration: Option<u64>,
    #[serde(default)]
    load_duration: Option<u64>,
    #[serde(default)]
    prompt_eval_duration: Option<u64>,
    #[serde(default)]
    eval_duration: Option<u64>,
}

impl OllamaChatStreamLine {
    fn usage(&self) -> Usage {
        let prompt_tokens = self.prompt_eval_count.unwrap_or(0);
        let completion_tokens = self.eval_count.unwrap_or(0);

        Usage::new(prompt_tokens, completion_tokens).with_extra(UsageExtra {
            e2e_latency_s: nanos_to_secs(self.total_duration),
            prefill_tokens_per_s: tokens_per_sec(prompt_tokens, self.prompt_eval_duration),
            decode_tokens_per_s: tokens_per_sec(completion_tokens, self.eval_duration),
            time_to_first_token_s: nanos_to_secs(self.load_duration)
                + nanos_to_secs(self.prompt_eval_duration),
        })
    }
}

fn nanos_to_secs(nanos: Option<u64>) -> f64 {
    nanos.map(|n| n as f64 / 1e9).unwrap_or(0.0)
}

fn tokens_per_sec(tokens: u32, nanos: Option<u64>) -> f64 {
    match nanos {
        Some(n) if n > 0 => tokens as f64 / (n as f64 / 1e9),
        _ => 0.0,
    }
}

// ============================================================================
// Chunk stream
// ============================================================================

/// State driving one streamed `/api/chat` response.
struct ChatStreamState {
    response: reqwest::Response,
    lines: LineBuffer,
    pending: VecDeque<ChatCompletionChunk>,
    id: String,
    created: i64,
    model: String,
    include_usage: bool,
    accumulated: String,
    last_message: Arc<Mutex<Option<String>>>,
    body_ended: bool,
    finished: bool,
}

impl ChatStreamState {
    fn chunk(&self) -> ChatCompletionChunk {
        ChatCompletionChunk::empty(&self.id, self.created, &self.model)
    }

    async fn advance(mut self) -> Option<(Result<ChatCompletionChunk>, Self)> {
        loop {
            if let Some(chunk) = self.pending.pop_front() {
                return Some((Ok(chunk), self));
            }
            if self.finished {
                return None;
            }

            let line = if let Some(line) = self.lines.next_line() {
                line
            } else if self.body_ended {
                match self.lines.take_remainder() {
                    Some(line) => line,
                    None => {
                        self.finished = true;
                        let err = Error::Communication(
                            "chat stream ended before completion".to_string(),
                        );
                        return Some((Err(err), self));
                    }
                }
            } else {
                match self.response.chunk().await {
                    Ok(Some(bytes)) => self.lines.push(&bytes),
                    Ok(None) => self.body_ended = true,
                    Err(e) => {
                        self.finished = true;
                        return Some((Err(Error::Communication(e.to_string())), self));
                    }
                }
                continue;
            };

            if let Err(e) = self.handle_line(&line).await {
                self.finished = true;
                return Some((Err(e), self));
            }
        }
    }

    async fn handle_line(&mut self, line: &str) -> Result<()> {
        let parsed: OllamaChatStreamLine = parse_line(line)?;
        if let Some(error) = parsed.error {
            return Err(Error::InferenceFailed(error));
        }

        let content = parsed
            .message
            .as_ref()
            .and_then(|m| m.content.clone())
            .unwrap_or_default();
        if !content.is_empty() {
            self.accumulated.push_str(&content);
            let chunk = self.chunk().with_content(content);
            self.pending.push_back(chunk);
        }

        if parsed.done {
            let reason = parsed.done_reason.clone().unwrap_or_else(|| "stop".to_string());
            let chunk = self.chunk().with_finish_reason(reason);
            self.pending.push_back(chunk);
            if self.include_usage {
                let chunk = self.chunk().with_usage(parsed.usage());
                self.pending.push_back(chunk);
            }
            *self.last_message.lock().await = Some(std::mem::take(&mut self.accumulated));
            self.finished = true;
        }

        Ok(())
    }
}

// ============================================================================
// InferenceEngine implementation
// ============================================================================

#[async_trait]
impl InferenceEngine for OllamaEngine {
    fn engine_type(&self) -> &'static str {
        "ollama"
    }

    fn set_init_progress_callback(&self, callback: InitProgressCallback) {
        *self
            .progress_callback
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }

    async fn reload(&self, model_id: &str, config: &SamplingConfig) -> Result<()> {
        let started = Instant::now();
        *self.loaded.write().await = None;

        self.report_progress(InitProgressReport::new(
            0.0,
            0.0,
            format!("Start to fetch model {}", model_id),
        ));

        if self.pull_missing {
            self.pull_model(model_id, started).await?;
        }
        self.warm_model(model_id, config).await?;

        *self.loaded.write().await = Some(LoadedModel {
            model_id: model_id.to_string(),
            sampling: *config,
        });

        let elapsed = started.elapsed().as_secs_f64();
        self.report_progress(InitProgressReport::new(
            1.0,
            elapsed,
            format!("Finish loading model {} in {:.1}s", model_id, elapsed),
        ));
        tracing::info!("Model {} loaded in {:.1}s", model_id, elapsed);
        Ok(())
    }

    async fn chat_completion_stream(&self, request: ChatCompletionRequest) -> Result<ChunkStream> {
        let loaded = self
            .loaded
            .read()
            .await
            .clone()
            .ok_or_else(|| Error::ModelNotLoaded("no model has been loaded".to_string()))?;

        // The loaded model always serves the stream; `request.model` is ignored.
        let model_id = loaded.model_id;
        let include_usage = request.include_usage();

        let ollama_request = OllamaChatRequest {
            model: model_id.clone(),
            messages: request
                .messages
                .into_iter()
                .map(|m| OllamaMessage {
                    role: m.role,
                    content: Some(m.content),
                })
                .collect(),
            stream: true,
            keep_alive: Some(self.keep_alive.clone()),
            options: OllamaOptions {
                temperature: Some(request.temperature.unwrap_or(loaded.sampling.temperature)),
                top_p: Some(request.top_p.unwrap_or(loaded.sampling.top_p)),
                num_predict: request.max_tokens,
            },
        };

        let url = format!("{}/api/chat", self.base_url);

        tracing::debug!("Sending chat request to Ollama: {} model={}", url, model_id);

        let response = self
            .http_client
            .post(&url)
            .json(&ollama_request)
            .send()
            .await
            .map_err(|e| Error::Communication(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::InferenceFailed(format!("{}: {}", status, body)));
        }

        *self.last_message.lock().await = None;

        let state = ChatStreamState {
            response,
            lines: LineBuffer::new(),
            pending: VecDeque::new(),
            id: completion_id(),
            created: created_now(),
            model: model_id,
            include_usage,
            accumulated: String::new(),
            last_message: self.last_message.clone(),
            body_ended: false,
            finished: false,
        };

        Ok(Box::pin(stream::unfold(state, ChatStreamState::advance)))
    }

    async fn get_message(&self) -> Result<String> {
        self.last_message
            .lock()
            .await
            .clone()
            .ok_or_else(|| Error::InferenceFailed("no message has been generated".to_string()))
    }
}
