//! Model records published by an engine.

use serde::{Deserialize, Serialize};

/// Kind of model a record describes.
///
/// Only `Llm` models can serve chat completions; the other kinds are listed
/// by engines but are not selectable for chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    #[default]
    Llm,
    Embedding,
    Vlm,
}

impl ModelType {
    pub fn is_chat(self) -> bool {
        matches!(self, ModelType::Llm)
    }
}

impl std::fmt::Display for ModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelType::Llm => write!(f, "llm"),
            ModelType::Embedding => write!(f, "embedding"),
            ModelType::Vlm => write!(f, "vlm"),
        }
    }
}

/// One entry of an engine's published model list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    /// Identifier passed to the engine when loading (e.g., "llama3.2:1b")
    pub model_id: String,
    #[serde(default)]
    pub model_type: ModelType,
    /// Approximate memory needed to run the model
    #[serde(default)]
    pub vram_required_mb: Option<f32>,
    /// Whether the model fits low-resource devices
    #[serde(default)]
    pub low_resource_required: bool,
}

impl ModelRecord {
    pub fn new(model_id: impl Into<String>, model_type: ModelType) -> Self {
        Self {
            model_id: model_id.into(),
            model_type,
            vram_required_mb: None,
            low_resource_required: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_type_serialization() {
        assert_eq!(serde_json::to_string(&ModelType::Llm).unwrap(), r#""llm""#);
        assert_eq!(
            serde_json::to_string(&ModelType::Embedding).unwrap(),
            r#""embedding""#
        );
        let parsed: ModelType = serde_json::from_str(r#""vlm""#).unwrap();
        assert_eq!(parsed, ModelType::Vlm);
    }

    #[test]
    fn test_model_type_is_chat() {
        assert!(ModelType::Llm.is_chat());
        assert!(!ModelType::Embedding.is_chat());
        assert!(!ModelType::Vlm.is_chat());
    }

    #[test]
    fn test_record_defaults_to_llm() {
        let record: ModelRecord = serde_json::from_str(r#"{"model_id": "qwen2.5:0.5b"}"#).unwrap();
        assert_eq!(record.model_type, ModelType::Llm);
        assert!(record.vram_required_mb.is_none());
        assert!(!record.low_resource_required);
    }
}
