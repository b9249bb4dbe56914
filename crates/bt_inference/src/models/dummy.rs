use std::fmt;

use bt_core::{Error, ImageClassifier, PixelBatch, Prediction, Result};

use crate::engine::predict_from_logits;

const INPUT_SIZE: usize = 224;

/// Deterministic stand-in that scores images by mean brightness.
///
/// Dark scans lean towards "No Tumor", bright ones towards "Tumor". No
/// checkpoint is needed, which makes it useful for demos and tests.
pub struct DummyClassifier;

impl fmt::Debug for DummyClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummyClassifier").finish()
    }
}

impl DummyClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DummyClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageClassifier for DummyClassifier {
    fn name(&self) -> &str {
        "Dummy"
    }

    fn input_size(&self) -> usize {
        INPUT_SIZE
    }

    fn classify(&self, batch: &PixelBatch) -> Result<Prediction> {
        let [_, channels, height, width] = batch.shape();
        if channels != 3 || height != INPUT_SIZE || width != INPUT_SIZE {
            return Err(Error::Inference(format!(
                "expected input [1, 3, {s}, {s}], got {:?}",
                batch.shape(),
                s = INPUT_SIZE
            )));
        }
        // Normalized pixels sit in [-1, 1]; scale so the extremes are confident.
        predict_from_logits(&[0.0, 4.0 * batch.mean()])
    }
}
