//! Chat session: owns the engine and drives initialization and streaming.

use std::sync::Arc;

use futures_util::StreamExt;
use llm_relay_common::{ChatCompletionRequest, ChatMessage, InitProgressReport, Usage};
use tokio::sync::{Mutex, RwLock};

use crate::config::{Config, LoadFailurePolicy};
use crate::engine::{EngineFactory, InferenceEngine, OllamaEngine, SamplingConfig};
use crate::error::{Error, Result};
use crate::handler::StreamHandler;
use crate::progress::{ProgressCallback, ProgressRelay};

/// Final result of a streamed completion.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamedCompletion {
    /// The engine's canonical text of the response
    pub message: String,
    /// Last usage statistics reported during the stream
    pub usage: Usage,
}

/// Holds the engine used for chat and the progress listener fed while it
/// loads.
///
/// A session can be shared behind an `Arc`. `initialize` calls are
/// serialized; a stream keeps using the engine it started with even if a
/// concurrent `initialize` replaces it.
pub struct ChatSession {
    factory: Box<dyn EngineFactory>,
    engine: RwLock<Option<Arc<dyn InferenceEngine>>>,
    progress: Arc<ProgressRelay>,
    init_lock: Mutex<()>,
    load_failure: LoadFailurePolicy,
}

impl ChatSession {
    pub fn new(factory: impl EngineFactory + 'static) -> Self {
        Self::with_policy(factory, LoadFailurePolicy::default())
    }

    pub fn with_policy(
        factory: impl EngineFactory + 'static,
        load_failure: LoadFailurePolicy,
    ) -> Self {
        Self {
            factory: Box::new(factory),
            engine: RwLock::new(None),
            progress: Arc::new(ProgressRelay::new()),
            init_lock: Mutex::new(()),
            load_failure,
        }
    }

    /// Session backed by an Ollama engine built from `config`.
    pub fn from_config(config: &Config) -> Self {
        Self::with_policy(
            OllamaEngine::factory(config.engine.clone()),
            config.session.load_failure,
        )
    }

    /// Replace the progress listener used during `initialize`.
    pub fn set_progress_callback<F>(&self, callback: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let callback: ProgressCallback = Arc::new(callback);
        self.progress.set(callback);
    }

    pub fn clear_progress_callback(&self) {
        self.progress.clear();
    }

    pub async fn is_initialized(&self) -> bool {
        self.engine.read().await.is_some()
    }

    /// Build a fresh engine and load `model_id` on it.
    ///
    /// Returns once the model is ready. Errors are logged and returned; what
    /// the session keeps on failure depends on its [`LoadFailurePolicy`].
    pub async fn initialize(&self, model_id: &str, temperature: f32, top_p: f32) -> Result<()> {
        let _guard = self.init_lock.lock().await;

        let engine = self.factory.create().map_err(|e| {
            tracing::error!("Error creating engine for model {}: {}", model_id, e);
            e
        })?;
        tracing::info!(
            "Created {} engine, loading model {}",
            engine.engine_type(),
            model_id
        );

        let relay = self.progress.clone();
        engine.set_init_progress_callback(Arc::new(move |report: &InitProgressReport| {
            relay.report(report)
        }));

        if self.load_failure == LoadFailurePolicy::ReplaceOnConstruct {
            *self.engine.write().await = Some(engine.clone());
        }

        let config = SamplingConfig { temperature, top_p };
        if let Err(e) = engine.reload(model_id, &config).await {
            tracing::error!("Error loading model {}: {}", model_id, e);
            return Err(e);
        }

        *self.engine.write().await = Some(engine);
        tracing::info!("Model {} ready", model_id);
        Ok(())
    }

    /// Stream a chat completion, reporting through `handler`.
    ///
    /// Never fails itself: every error, including a missing engine or missing
    /// usage data, is passed to `handler.on_error`.
    pub async fn stream_chat<H: StreamHandler>(
        &self,
        messages: Vec<ChatMessage>,
        handler: &mut H,
    ) {
        let result = self
            .complete_streaming(messages, |text| handler.on_update(text))
            .await;

        match result {
            Ok(completion) => handler.on_finish(completion.message, completion.usage),
            Err(e) => {
                tracing::warn!("Chat stream failed: {}", e);
                handler.on_error(e);
            }
        }
    }

    /// Stream a chat completion, calling `on_update` with the accumulated text
    /// after every content chunk.
    pub async fn complete_streaming<F>(
        &self,
        messages: Vec<ChatMessage>,
        mut on_update: F,
    ) -> Result<StreamedCompletion>
    where
        F: FnMut(&str),
    {
        // Snapshot so a concurrent re-initialization cannot swap the engine mid-stream.
        let engine = self
            .engine
            .read()
            .await
            .clone()
            .ok_or(Error::EngineNotInitialized)?;

        let request = ChatCompletionRequest::streaming(messages);
        tracing::debug!(
            "Starting chat stream on {} engine ({} messages)",
            engine.engine_type(),
            request.messages.len()
        );

        let mut chunks = engine.chat_completion_stream(request).await?;
        let mut current = String::new();
        let mut usage = None;

        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            if let Some(delta) = chunk.content_delta() {
                current.push_str(delta);
                on_update(&current);
            }
            if let Some(chunk_usage) = chunk.usage {
                usage = Some(chunk_usage);
            }
        }

        let message = engine.get_message().await?;
        let usage = usage.ok_or(Error::UsageUnavailable)?;

        tracing::debug!(
            "Chat stream finished: {} prompt + {} completion tokens",
            usage.prompt_tokens,
            usage.completion_tokens
        );
        Ok(StreamedCompletion { message, usage })
    }
}
