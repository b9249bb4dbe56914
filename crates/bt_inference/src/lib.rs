use std::path::PathBuf;

pub mod engine;
pub mod loader;
pub mod models;
pub mod preprocess;

pub const DEFAULT_ARCH: &str = "google/vit-base-patch16-224-in21k";
pub const DEFAULT_CHECKPOINT: &str = "brain.pth";
pub const NUM_LABELS: usize = 2;

/// Everything needed to construct a classifier and its preprocessing.
#[derive(Debug, Clone)]
pub struct Config {
    /// Classifier implementation, `vit` or `dummy`.
    pub model_name: String,
    /// Architecture preset used when no `config_json` is given.
    pub arch: String,
    /// HuggingFace-style `config.json` overriding the preset.
    pub config_json: Option<PathBuf>,
    /// Fine-tuned parameters (`.pth`, `.pt`, `.bin` or `.safetensors`).
    pub checkpoint: PathBuf,
    /// HuggingFace-style `preprocessor_config.json`.
    pub preprocessor_config: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_name: "vit".to_string(),
            arch: DEFAULT_ARCH.to_string(),
            config_json: None,
            checkpoint: PathBuf::from(DEFAULT_CHECKPOINT),
            preprocessor_config: None,
        }
    }
}

impl Config {
    pub fn dummy() -> Self {
        Self {
            model_name: "dummy".to_string(),
            ..Self::default()
        }
    }
}

pub mod prelude {
    pub use super::Config;
    pub use super::engine::Engine;
    pub use super::loader::ModelLoader;
    pub use super::models::create_model;
    pub use super::preprocess::FeatureExtractorConfig;
    pub use bt_core::{Error, ImageClassifier, PixelBatch, Prediction, Result, TumorClass};
}

pub use engine::Engine;
pub use loader::ModelLoader;
pub use models::create_model;
pub use preprocess::FeatureExtractorConfig;
