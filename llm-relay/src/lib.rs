//! llm-relay
//!
//! Drives an inference engine for chat: loads a model with progress
//! reporting, then streams chat completions while collecting usage
//! statistics. The engine itself sits behind [`InferenceEngine`]; an Ollama
//! implementation is included.

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod handler;
pub mod progress;
pub mod session;

pub use catalog::{available_models, ModelCatalog, PREBUILT_MODEL_LIST};
pub use config::{Config, LoadFailurePolicy};
pub use engine::{
    ChunkStream, EngineFactory, InferenceEngine, InitProgressCallback, OllamaEngine,
    SamplingConfig,
};
pub use error::{Error, Result};
pub use handler::{StreamCallbacks, StreamHandler};
pub use progress::{ProgressCallback, ProgressRelay};
pub use session::{ChatSession, StreamedCompletion};

pub use llm_relay_common as common;
