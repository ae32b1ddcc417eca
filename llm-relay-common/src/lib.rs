//! llm-relay common types
//!
//! Shared types used by inference engines and the chat session layer.

pub mod chat;
pub mod model;
pub mod progress;

pub use chat::{
    completion_id, created_now, ChatCompletionChunk, ChatCompletionRequest, ChatMessage,
    ChunkChoice, ChunkDelta, StreamOptions, Usage, UsageExtra,
};
pub use model::{ModelRecord, ModelType};
pub use progress::InitProgressReport;
