// pixbatch/src/core/mod.rs
pub mod item;
pub mod processor;
pub mod store;

use std::fmt;
use thiserror::Error;

pub use item::{ImageItem, IngestedImage, ItemId, ItemState, ItemStatus, ProcessedImage};
pub use processor::{ImageProcessor, ProcessOutcome};
pub use store::ItemStore;

/// Largest pixel count accepted per axis, both for decoding and for fixed sizes.
pub const MAX_DIMENSION: u32 = 100_000;

pub const MIN_QUALITY: f32 = 0.1;
pub const MAX_QUALITY: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeAlgorithm {
    Bilinear,
    Bicubic,
    Lanczos3,
}

/// Output encodings the pipeline can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::WebP => "webp",
        }
    }

    /// Lossless encodings ignore the quality setting.
    pub fn is_lossy(self) -> bool {
        !matches!(self, OutputFormat::Png)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Jpeg => "JPEG",
            OutputFormat::Png => "PNG",
            OutputFormat::WebP => "WebP",
        };
        f.write_str(name)
    }
}

/// How target dimensions are derived from an image's natural size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeMode {
    Original,
    Percentage,
    FixedWidth,
    FixedHeight,
}

/// Settings for one batch run. Immutable while the run is in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingOptions {
    pub format: OutputFormat,
    /// 0.1..=1.0, only consulted by lossy encoders.
    pub quality: f32,
    pub resize_mode: ResizeMode,
    /// Percentage under `Percentage`, pixels under the fixed modes.
    pub resize_value: i32,
    /// Only consulted by the fixed modes.
    pub maintain_aspect_ratio: bool,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Jpeg,
            quality: 0.8,
            resize_mode: ResizeMode::Original,
            resize_value: 100,
            maintain_aspect_ratio: true,
        }
    }
}

impl ProcessingOptions {
    /// Checks the options the way a settings form would before a run.
    ///
    /// The pipeline itself never calls this: the dimension resolver clamps
    /// out-of-range values instead of failing every item in the batch.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_QUALITY..=MAX_QUALITY).contains(&self.quality) {
            return Err(ImageToolError::InvalidParameter(format!(
                "Quality must be between {} and {}, got {}",
                MIN_QUALITY, MAX_QUALITY, self.quality
            )));
        }

        match self.resize_mode {
            ResizeMode::Original => {}
            ResizeMode::Percentage => {
                if self.resize_value <= 0 || self.resize_value > 100 {
                    return Err(ImageToolError::InvalidParameter(format!(
                        "Percentage must be between 1 and 100, got {}",
                        self.resize_value
                    )));
                }
            }
            ResizeMode::FixedWidth | ResizeMode::FixedHeight => {
                if self.resize_value <= 0 || self.resize_value as u32 > MAX_DIMENSION {
                    return Err(ImageToolError::InvalidParameter(format!(
                        "Size must be between 1 and {} pixels, got {}",
                        MAX_DIMENSION, self.resize_value
                    )));
                }
            }
        }

        Ok(())
    }

    /// Quality on the 1..=100 scale used by the encoders.
    pub fn encoder_quality(&self) -> u8 {
        let quality = if self.quality.is_nan() {
            MAX_QUALITY
        } else {
            self.quality.clamp(MIN_QUALITY, MAX_QUALITY)
        };
        (quality * 100.0).round() as u8
    }
}

/// Errors surfaced to callers outside the per-item pipeline.
#[derive(Error, Debug)]
pub enum ImageToolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Processing error: {0}")]
    ProcessingError(String),

    #[error("Memory limit exceeded: {0}")]
    MemoryLimitExceeded(String),
}

pub type Result<T> = std::result::Result<T, ImageToolError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Decode,
    Encode,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Decode => f.write_str("decode"),
            FailureKind::Encode => f.write_str("encode"),
        }
    }
}

/// Why a single item could not be converted. Never aborts a batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} error: {detail}")]
pub struct ProcessingFailure {
    pub kind: FailureKind,
    pub detail: String,
}

impl ProcessingFailure {
    pub fn decode(detail: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Decode,
            detail: detail.into(),
        }
    }

    pub fn encode(detail: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Encode,
            detail: detail.into(),
        }
    }
}

/// Summary of one batch run.
#[derive(Debug, Default, Clone)]
pub struct ProcessingStats {
    pub processed_count: usize,
    pub failed_count: usize,
    /// Results that arrived for items removed mid-run.
    pub discarded_count: usize,
    pub total_size_before: u64,
    pub total_size_after: u64,
    pub errors: Vec<(ItemId, String)>,
}

impl ProcessingStats {
    /// Percentage of bytes saved across completed items.
    pub fn overall_savings(&self) -> f64 {
        crate::utils::calculate_savings(self.total_size_before, self.total_size_after)
    }
}
