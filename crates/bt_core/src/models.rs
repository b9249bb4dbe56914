use std::fmt;

use crate::types::{PixelBatch, Prediction};
use crate::Result;

/// A two-class image classifier, immutable once constructed.
///
/// Implementations are shared read-only between requests, so `classify`
/// takes `&self` and must not mutate any state.
pub trait ImageClassifier: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Side length, in pixels, of the square input the model expects.
    fn input_size(&self) -> usize;

    /// Run a blocking forward pass over a single-item batch.
    fn classify(&self, batch: &PixelBatch) -> Result<Prediction>;
}
