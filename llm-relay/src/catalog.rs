//! Selectable chat models.
//!
//! The catalog is derived once from the prebuilt model list: embedding and
//! vision-language models are listed by the engine but cannot serve a plain
//! chat completion, so they are left out.

use llm_relay_common::{ModelRecord, ModelType};
use once_cell::sync::Lazy;

/// Ordered list of chat-capable model identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCatalog {
    ids: Vec<String>,
}

impl ModelCatalog {
    pub fn from_records(records: &[ModelRecord]) -> Self {
        let ids = records
            .iter()
            .filter(|r| !matches!(r.model_type, ModelType::Embedding | ModelType::Vlm))
            .map(|r| r.model_id.clone())
            .collect();
        Self { ids }
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn contains(&self, model_id: &str) -> bool {
        self.ids.iter().any(|id| id == model_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

// (model_id, type, vram_required_mb, low_resource_required)
const PREBUILT: &[(&str, ModelType, f32, bool)] = &[
    ("llama3.2:1b", ModelType::Llm, 1_300.0, true),
    ("llama3.2:3b", ModelType::Llm, 2_900.0, true),
    ("llama3.1:8b", ModelType::Llm, 5_600.0, false),
    ("qwen2.5:0.5b", ModelType::Llm, 700.0, true),
    ("qwen2.5:1.5b", ModelType::Llm, 1_400.0, true),
    ("qwen2.5:7b", ModelType::Llm, 5_200.0, false),
    ("qwen2.5-coder:1.5b", ModelType::Llm, 1_400.0, true),
    ("gemma2:2b", ModelType::Llm, 2_300.0, true),
    ("gemma2:9b", ModelType::Llm, 6_800.0, false),
    ("phi3.5:3.8b", ModelType::Llm, 3_200.0, false),
    ("mistral:7b", ModelType::Llm, 5_000.0, false),
    ("smollm2:360m", ModelType::Llm, 500.0, true),
    ("smollm2:1.7b", ModelType::Llm, 1_500.0, true),
    ("deepseek-r1:1.5b", ModelType::Llm, 1_400.0, true),
    ("deepseek-r1:7b", ModelType::Llm, 5_200.0, false),
    ("nomic-embed-text", ModelType::Embedding, 400.0, true),
    ("mxbai-embed-large", ModelType::Embedding, 800.0, true),
    ("all-minilm", ModelType::Embedding, 100.0, true),
    ("llava:7b", ModelType::Vlm, 5_500.0, false),
    ("llama3.2-vision:11b", ModelType::Vlm, 8_500.0, false),
    ("moondream", ModelType::Vlm, 1_900.0, true),
];

/// Every model the bundled engine publishes, including non-chat ones.
pub static PREBUILT_MODEL_LIST: Lazy<Vec<ModelRecord>> = Lazy::new(|| {
    PREBUILT
        .iter()
        .map(|&(id, model_type, vram, low_resource)| ModelRecord {
            model_id: id.to_string(),
            model_type,
            vram_required_mb: Some(vram),
            low_resource_required: low_resource,
        })
        .collect()
});

static AVAILABLE_MODELS: Lazy<ModelCatalog> =
    Lazy::new(|| ModelCatalog::from_records(&PREBUILT_MODEL_LIST));

/// Chat models selectable for [`crate::ChatSession::initialize`].
pub fn available_models() -> &'static [String] {
    AVAILABLE_MODELS.ids()
}

pub fn catalog() -> &'static ModelCatalog {
    &AVAILABLE_MODELS
}
