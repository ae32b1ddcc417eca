//! Inference engine abstraction layer.
//!
//! This module defines the `InferenceEngine` trait that hides the backend
//! doing the actual model loading and generation. The session layer only
//! ever talks to engines through this trait.

mod ndjson;
mod ollama;

pub use ollama::OllamaEngine;

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use llm_relay_common::{ChatCompletionChunk, ChatCompletionRequest, InitProgressReport};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Sampling configuration applied when a model is (re)loaded.
///
/// Values are passed through to the engine unvalidated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
    pub temperature: f32,
    pub top_p: f32,
}

/// Callback an engine invokes while loading a model.
pub type InitProgressCallback = Arc<dyn Fn(&InitProgressReport) + Send + Sync>;

/// One-shot, finite sequence of streamed completion chunks.
pub type ChunkStream = BoxStream<'static, Result<ChatCompletionChunk>>;

/// Primary trait for inference engines.
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    /// Unique identifier for this engine type (e.g., "ollama").
    fn engine_type(&self) -> &'static str;

    /// Register the callback receiving model load progress.
    ///
    /// Replaces any previously registered callback.
    fn set_init_progress_callback(&self, callback: InitProgressCallback);

    /// Load (or reload) a model with the given sampling configuration.
    async fn reload(&self, model_id: &str, config: &SamplingConfig) -> Result<()>;

    /// Start a streaming chat completion.
    async fn chat_completion_stream(&self, request: ChatCompletionRequest) -> Result<ChunkStream>;

    /// Canonical text of the most recent completed response.
    async fn get_message(&self) -> Result<String>;
}

/// Constructs fresh engine instances for a session.
pub trait EngineFactory: Send + Sync {
    fn create(&self) -> Result<Arc<dyn InferenceEngine>>;
}

impl<F> EngineFactory for F
where
    F: Fn() -> Result<Arc<dyn InferenceEngine>> + Send + Sync,
{
    fn create(&self) -> Result<Arc<dyn InferenceEngine>> {
        self()
    }
}
