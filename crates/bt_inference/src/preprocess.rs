//! Image decoding and conversion to model input.
//!
//! The defaults reproduce the ViT-in21k feature extractor: bilinear resize to
//! 224x224, rescale by 1/255, then normalize every channel with mean 0.5 and
//! std 0.5 so values land in `[-1, 1]`.

use std::fs;
use std::path::Path;

use bt_core::{Error, PixelBatch, Result};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Deserializer};

/// Formats accepted by the upload form.
pub const ACCEPTED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FeatureExtractorConfig {
    #[serde(deserialize_with = "deserialize_size")]
    pub size: usize,
    pub do_resize: bool,
    pub do_rescale: bool,
    pub rescale_factor: f32,
    pub do_normalize: bool,
    pub image_mean: [f32; 3],
    pub image_std: [f32; 3],
}

impl Default for FeatureExtractorConfig {
    fn default() -> Self {
        Self {
            size: 224,
            do_resize: true,
            do_rescale: true,
            rescale_factor: 1.0 / 255.0,
            do_normalize: true,
            image_mean: [0.5, 0.5, 0.5],
            image_std: [0.5, 0.5, 0.5],
        }
    }
}

// `size` is an integer in older extractor configs and `{height, width}` in newer ones.
fn deserialize_size<'de, D>(deserializer: D) -> std::result::Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Size {
        Square(usize),
        Dims { height: usize, width: usize },
        Shortest { shortest_edge: usize },
    }

    match Size::deserialize(deserializer)? {
        Size::Square(size) | Size::Shortest { shortest_edge: size } => Ok(size),
        Size::Dims { height, width } if height == width => Ok(height),
        Size::Dims { height, width } => Err(serde::de::Error::custom(format!(
            "non-square input size {}x{} is not supported",
            height, width
        ))),
    }
}

impl FeatureExtractorConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(Error::Config("preprocessor size must be positive".to_string()));
        }
        if self.image_std.iter().any(|s| *s == 0.0) {
            return Err(Error::Config("preprocessor image_std must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// Whether a file name carries one of the accepted extensions.
pub fn has_accepted_extension(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ACCEPTED_EXTENSIONS.iter().any(|a| a.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Decode uploaded bytes, sniffing the format from content.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    if bytes.is_empty() {
        return Err(Error::Decode("the uploaded file is empty".to_string()));
    }

    let format = image::guess_format(bytes)
        .map_err(|_| Error::Decode("the file is not a recognizable image".to_string()))?;
    if !matches!(format, ImageFormat::Jpeg | ImageFormat::Png) {
        return Err(Error::UnsupportedFormat(format!(
            "{:?} (accepted: {})",
            format,
            ACCEPTED_EXTENSIONS.join(", ")
        )));
    }

    image::load_from_memory_with_format(bytes, format).map_err(|e| Error::Decode(e.to_string()))
}

/// Convert a decoded image into a `[1, 3, size, size]` batch.
pub fn preprocess(image: &DynamicImage, config: &FeatureExtractorConfig) -> Result<PixelBatch> {
    let rgb = image.to_rgb8();
    let rgb = if config.do_resize {
        let side = config.size as u32;
        image::imageops::resize(&rgb, side, side, FilterType::Triangle)
    } else {
        rgb
    };

    let (width, height) = rgb.dimensions();
    let (width, height) = (width as usize, height as usize);
    let plane = width * height;
    let mut data = vec![0.0f32; 3 * plane];

    for (i, pixel) in rgb.pixels().enumerate() {
        for channel in 0..3 {
            let mut value = pixel[channel] as f32;
            if config.do_rescale {
                value *= config.rescale_factor;
            }
            if config.do_normalize {
                value = (value - config.image_mean[channel]) / config.image_std[channel];
            }
            data[channel * plane + i] = value;
        }
    }

    PixelBatch::new(data, 3, height, width)
}

/// Decode and preprocess in one step.
pub fn prepare_bytes(bytes: &[u8], config: &FeatureExtractorConfig) -> Result<PixelBatch> {
    let image = decode_image(bytes)?;
    preprocess(&image, config)
}
