use std::fmt;
use std::fs;
use std::path::Path;

use bt_core::{Error, ImageClassifier, PixelBatch, Prediction, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::vit::{Config as VitConfig, Model};
use tracing::info;

use crate::engine::predict_from_logits;
use crate::{Config, NUM_LABELS};

const BASE_PATCH16_224: [&str; 3] = [
    "vit-base-patch16-224",
    "google/vit-base-patch16-224",
    "google/vit-base-patch16-224-in21k",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CheckpointFormat {
    Pickle,
    Safetensors,
}

impl CheckpointFormat {
    fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        match ext.as_deref() {
            Some("pth") | Some("pt") | Some("bin") => Ok(Self::Pickle),
            Some("safetensors") => Ok(Self::Safetensors),
            _ => Err(Error::Checkpoint(format!(
                "cannot tell the format of {}; expected .pth, .pt, .bin or .safetensors",
                path.display()
            ))),
        }
    }
}

/// Resolve the architecture from `config.json` or a named preset.
pub fn resolve_architecture(config: &Config) -> Result<VitConfig> {
    if let Some(path) = &config.config_json {
        let raw = fs::read_to_string(path)?;
        return serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("invalid ViT config {}: {}", path.display(), e)));
    }

    if BASE_PATCH16_224.iter().any(|name| name.eq_ignore_ascii_case(&config.arch)) {
        Ok(VitConfig::vit_base_patch16_224())
    } else {
        Err(Error::Config(format!(
            "unknown architecture '{}'. Available: {}",
            config.arch,
            BASE_PATCH16_224.join(", ")
        )))
    }
}

/// Vision transformer with a two-unit classification head.
///
/// Parameter names follow `ViTForImageClassification` (`vit.*` for the
/// backbone, `classifier.*` for the head), so a `state_dict()` saved from the
/// fine-tuning run loads as is. There is no dropout in this graph, every
/// forward pass is deterministic.
pub struct VitClassifier {
    model: Model,
    device: Device,
    input_size: usize,
    channels: usize,
}

impl fmt::Debug for VitClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VitClassifier")
            .field("model", &"<candle ViT>")
            .field("device", &self.device)
            .field("input_size", &self.input_size)
            .finish()
    }
}

impl VitClassifier {
    pub fn load(config: &Config) -> Result<Self> {
        let architecture = resolve_architecture(config)?;
        Self::from_checkpoint(&config.checkpoint, &architecture, &Device::Cpu)
    }

    pub fn from_checkpoint(path: &Path, architecture: &VitConfig, device: &Device) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::Checkpoint(format!("checkpoint {} not found", path.display())));
        }

        let vb = match CheckpointFormat::from_path(path)? {
            CheckpointFormat::Safetensors => {
                let tensors = candle_core::safetensors::load(path, device).map_err(|e| {
                    Error::Checkpoint(format!("failed to read {}: {}", path.display(), e))
                })?;
                VarBuilder::from_tensors(tensors, DType::F32, device)
            }
            CheckpointFormat::Pickle => VarBuilder::from_pth(path, DType::F32, device).map_err(|e| {
                Error::Checkpoint(format!("failed to read {}: {}", path.display(), e))
            })?,
        };

        let model = Model::new(architecture, NUM_LABELS, vb).map_err(|e| {
            Error::Checkpoint(format!(
                "{} does not match a {}-class ViT: {}",
                path.display(),
                NUM_LABELS,
                e
            ))
        })?;

        info!(
            "🧠 Loaded ViT checkpoint {} ({} layers, {}px input)",
            path.display(),
            architecture.num_hidden_layers,
            architecture.image_size
        );

        Ok(Self {
            model,
            device: device.clone(),
            input_size: architecture.image_size,
            channels: architecture.num_channels,
        })
    }

    fn logits(&self, batch: &PixelBatch) -> candle_core::Result<Vec<f32>> {
        let input = Tensor::from_slice(batch.data(), batch.shape().to_vec(), &self.device)?;
        let output = self.model.forward(&input)?;
        output.flatten_all()?.to_dtype(DType::F32)?.to_vec1::<f32>()
    }
}

impl ImageClassifier for VitClassifier {
    fn name(&self) -> &str {
        "ViT"
    }

    fn input_size(&self) -> usize {
        self.input_size
    }

    fn classify(&self, batch: &PixelBatch) -> Result<Prediction> {
        let expected = [1, self.channels, self.input_size, self.input_size];
        if batch.shape() != expected {
            return Err(Error::Inference(format!(
                "expected input {:?}, got {:?}",
                expected,
                batch.shape()
            )));
        }
        let logits = self
            .logits(batch)
            .map_err(|e| Error::Inference(format!("forward pass failed: {}", e)))?;
        predict_from_logits(&logits)
    }
}
