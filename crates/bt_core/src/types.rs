use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// The two labels the classifier head is trained on, in head order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TumorClass {
    NoTumor,
    Tumor,
}

impl TumorClass {
    pub const ALL: [TumorClass; 2] = [TumorClass::NoTumor, TumorClass::Tumor];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        match self {
            TumorClass::NoTumor => 0,
            TumorClass::Tumor => 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TumorClass::NoTumor => "No Tumor",
            TumorClass::Tumor => "Tumor",
        }
    }

    /// Text shown on the result banner.
    pub fn headline(self) -> &'static str {
        match self {
            TumorClass::NoTumor => "No Tumor Detected",
            TumorClass::Tumor => "Tumor Detected",
        }
    }
}

impl fmt::Display for TumorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub class: TumorClass,
    /// Probability mass of `class`, as a percentage in `[0, 100]`.
    pub confidence: f32,
    /// Per-class probabilities indexed by `TumorClass::index`.
    pub probabilities: [f32; 2],
    pub analyzed_at: DateTime<Utc>,
}

impl Prediction {
    /// Build a prediction from a softmax output over the two classes.
    ///
    /// Ties resolve to `NoTumor`.
    pub fn from_probabilities(probabilities: &[f32]) -> Result<Self> {
        let probabilities: [f32; 2] = probabilities.try_into().map_err(|_| {
            Error::Inference(format!(
                "expected 2 class probabilities, got {}",
                probabilities.len()
            ))
        })?;
        if probabilities.iter().any(|p| !p.is_finite()) {
            return Err(Error::Inference("model produced non-finite probabilities".to_string()));
        }

        let class = if probabilities[1] > probabilities[0] {
            TumorClass::Tumor
        } else {
            TumorClass::NoTumor
        };
        let confidence = (probabilities[class.index()] * 100.0).clamp(0.0, 100.0);

        Ok(Self {
            class,
            confidence,
            probabilities,
            analyzed_at: Utc::now(),
        })
    }

    pub fn probability(&self, class: TumorClass) -> f32 {
        self.probabilities[class.index()]
    }

    /// Confidence formatted the way the result banner shows it.
    pub fn confidence_display(&self) -> String {
        format!("{:.2}%", self.confidence)
    }

    /// Compares the classification result, ignoring when it was produced.
    pub fn same_outcome(&self, other: &Prediction) -> bool {
        self.class == other.class
            && self.confidence == other.confidence
            && self.probabilities == other.probabilities
    }
}

/// Channel-first pixel data for a single-item batch, shaped `[1, C, H, W]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBatch {
    data: Vec<f32>,
    channels: usize,
    height: usize,
    width: usize,
}

impl PixelBatch {
    pub fn new(data: Vec<f32>, channels: usize, height: usize, width: usize) -> Result<Self> {
        let expected = channels * height * width;
        if data.len() != expected {
            return Err(Error::Inference(format!(
                "pixel buffer holds {} values, shape [1, {}, {}, {}] needs {}",
                data.len(),
                channels,
                height,
                width,
                expected
            )));
        }
        Ok(Self { data, channels, height, width })
    }

    pub fn shape(&self) -> [usize; 4] {
        [1, self.channels, self.height, self.width]
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn mean(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().sum::<f32>() / self.data.len() as f32
    }
}
