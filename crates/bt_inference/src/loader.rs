use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bt_core::{Error, ImageClassifier, Result};
use tokio::sync::OnceCell;
use tracing::info;

use crate::engine::Engine;
use crate::preprocess::FeatureExtractorConfig;
use crate::Config;

type Factory = dyn Fn(&Config) -> Result<Arc<dyn ImageClassifier>> + Send + Sync;

/// Builds the engine at most once and hands out the same instance afterwards.
///
/// The loader is an ordinary value owned by whoever starts the service; there
/// is no process-global cache behind it.
pub struct ModelLoader {
    config: Config,
    factory: Arc<Factory>,
    engine: OnceCell<Arc<Engine>>,
    loads: AtomicUsize,
}

impl fmt::Debug for ModelLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelLoader")
            .field("config", &self.config)
            .field("loaded", &self.engine.initialized())
            .field("loads", &self.load_count())
            .finish()
    }
}

impl ModelLoader {
    pub fn new(config: Config) -> Self {
        Self::with_factory(config, crate::models::create_model)
    }

    pub fn with_factory<F>(config: Config, factory: F) -> Self
    where
        F: Fn(&Config) -> Result<Arc<dyn ImageClassifier>> + Send + Sync + 'static,
    {
        Self {
            config,
            factory: Arc::new(factory),
            engine: OnceCell::new(),
            loads: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of times the model has actually been built.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Return the engine, building it on the first call only.
    pub async fn load(&self) -> Result<Arc<Engine>> {
        let engine = self.engine.get_or_try_init(|| self.build()).await?;
        Ok(Arc::clone(engine))
    }

    async fn build(&self) -> Result<Arc<Engine>> {
        self.loads.fetch_add(1, Ordering::SeqCst);

        let extractor = match &self.config.preprocessor_config {
            Some(path) => FeatureExtractorConfig::from_json_file(path)?,
            None => FeatureExtractorConfig::default(),
        };

        let config = self.config.clone();
        let factory = Arc::clone(&self.factory);
        let classifier = tokio::task::spawn_blocking(move || factory(&config))
            .await
            .map_err(|e| Error::Checkpoint(format!("model loading task failed: {}", e)))??;

        let engine = Engine::new(classifier, extractor)?;
        info!("✨ Model ready (using {})", engine.model_name());
        Ok(Arc::new(engine))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DummyClassifier;

    #[tokio::test]
    async fn test_second_load_returns_cached_instance() {
        let loader = ModelLoader::new(Config::dummy());
        let first = loader.load().await.unwrap();
        let second = loader.load().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loader.load_count(), 1);
    }

    #[tokio::test]
    async fn test_factory_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let loader = ModelLoader::with_factory(Config::dummy(), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(DummyClassifier::new()) as Arc<dyn ImageClassifier>)
        });

        for _ in 0..5 {
            loader.load().await.unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_load_is_reported() {
        let config = crate::Config {
            checkpoint: "/nonexistent/brain.pth".into(),
            ..crate::Config::default()
        };
        let loader = ModelLoader::new(config);
        assert!(matches!(loader.load().await, Err(Error::Checkpoint(_))));
    }

    #[tokio::test]
    async fn test_preprocessor_config_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preprocessor_config.json");
        std::fs::write(&path, r#"{"image_mean": [0.485, 0.456, 0.406], "size": 224}"#).unwrap();

        let config = crate::Config {
            preprocessor_config: Some(path),
            ..crate::Config::dummy()
        };
        let engine = ModelLoader::new(config).load().await.unwrap();
        assert_eq!(engine.extractor().image_mean, [0.485, 0.456, 0.406]);
    }
}
