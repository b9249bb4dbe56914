use std::sync::Arc;

use bt_core::{Error, ImageClassifier, Result};

use crate::Config;

pub mod dummy;
pub mod vit;

pub use dummy::DummyClassifier;
pub use vit::VitClassifier;

/// Build the classifier named by `config.model_name`.
///
/// This reads the checkpoint from disk; callers that serve requests should go
/// through `ModelLoader` so it happens once.
pub fn create_model(config: &Config) -> Result<Arc<dyn ImageClassifier>> {
    match config.model_name.to_ascii_lowercase().as_str() {
        "vit" => Ok(Arc::new(VitClassifier::load(config)?)),
        "dummy" => Ok(Arc::new(DummyClassifier::new())),
        other => Err(Error::Config(format!(
            "unknown model '{}'. Available models: vit (default), dummy",
            other
        ))),
    }
}
