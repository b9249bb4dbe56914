use std::fmt;
use std::sync::Arc;

use bt_core::{Error, ImageClassifier, PixelBatch, Prediction, Result};
use image::DynamicImage;
use tracing::debug;

use crate::preprocess::{self, FeatureExtractorConfig};

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Turn raw head outputs into a prediction.
pub fn predict_from_logits(logits: &[f32]) -> Result<Prediction> {
    if logits.len() != bt_core::TumorClass::ALL.len() {
        return Err(Error::Inference(format!(
            "expected {} logits, model produced {}",
            bt_core::TumorClass::ALL.len(),
            logits.len()
        )));
    }
    Prediction::from_probabilities(&softmax(logits))
}

/// A loaded classifier paired with the preprocessing it was trained with.
pub struct Engine {
    classifier: Arc<dyn ImageClassifier>,
    extractor: FeatureExtractorConfig,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("classifier", &self.classifier.name())
            .field("extractor", &self.extractor)
            .finish()
    }
}

impl Engine {
    pub fn new(classifier: Arc<dyn ImageClassifier>, extractor: FeatureExtractorConfig) -> Result<Self> {
        if extractor.size != classifier.input_size() {
            return Err(Error::Config(format!(
                "preprocessor produces {}px images but {} expects {}px",
                extractor.size,
                classifier.name(),
                classifier.input_size()
            )));
        }
        Ok(Self { classifier, extractor })
    }

    pub fn model_name(&self) -> &str {
        self.classifier.name()
    }

    pub fn extractor(&self) -> &FeatureExtractorConfig {
        &self.extractor
    }

    pub fn classify(&self, batch: &PixelBatch) -> Result<Prediction> {
        self.classifier.classify(batch)
    }

    pub fn predict_image(&self, image: &DynamicImage) -> Result<Prediction> {
        let batch = preprocess::preprocess(image, &self.extractor)?;
        let prediction = self.classify(&batch)?;
        debug!(
            "{} classified {}x{} image as {} ({})",
            self.model_name(),
            image.width(),
            image.height(),
            prediction.class,
            prediction.confidence_display()
        );
        Ok(prediction)
    }

    pub fn predict_bytes(&self, bytes: &[u8]) -> Result<Prediction> {
        let batch = preprocess::prepare_bytes(bytes, &self.extractor)?;
        let prediction = self.classify(&batch)?;
        debug!("{} classified {} bytes as {}", self.model_name(), bytes.len(), prediction.class);
        Ok(prediction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::dummy::DummyClassifier;
    use bt_core::TumorClass;
    use image::{Rgb, RgbImage};
    use std::io::Cursor;

    fn engine() -> Engine {
        Engine::new(Arc::new(DummyClassifier::new()), FeatureExtractorConfig::default()).unwrap()
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0]);
        assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        assert!(probs[1] > probs[0]);

        let probs = softmax(&[1000.0, -1000.0]);
        assert!(probs.iter().all(|p| p.is_finite()));
        assert!((probs[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_logit_count_is_checked() {
        assert!(predict_from_logits(&[0.1, 0.2, 0.3]).is_err());
        assert!(predict_from_logits(&[]).is_err());
    }

    #[test]
    fn test_black_image_prediction() {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::new(100, 80))
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();

        let prediction = engine().predict_bytes(&bytes).unwrap();
        let total: f32 = prediction.probabilities.iter().sum();
        assert!((total * 100.0 - 100.0).abs() < 1e-3);

        let max = prediction.probabilities.iter().copied().fold(0.0, f32::max);
        assert_eq!(prediction.confidence_display(), format!("{:.2}%", max * 100.0));
        assert!(TumorClass::ALL.contains(&prediction.class));
    }

    #[test]
    fn test_repeated_predictions_are_identical() {
        let engine = engine();
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(50, 50, Rgb([120, 60, 200])));
        let first = engine.predict_image(&image).unwrap();
        for _ in 0..3 {
            assert!(engine.predict_image(&image).unwrap().same_outcome(&first));
        }
    }

    #[test]
    fn test_mismatched_extractor_is_rejected() {
        let extractor = FeatureExtractorConfig {
            size: 384,
            ..FeatureExtractorConfig::default()
        };
        assert!(matches!(
            Engine::new(Arc::new(DummyClassifier::new()), extractor),
            Err(Error::Config(_))
        ));
    }
}
