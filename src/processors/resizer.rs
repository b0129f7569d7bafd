// pixbatch/src/processors/resizer.rs
use crate::core::{ProcessingFailure, ProcessingOptions, ResizeAlgorithm, ResizeMode, MAX_DIMENSION};
use image::{imageops::FilterType, DynamicImage, GenericImageView};

/// Computes the target size for an image of natural size `width` x `height`.
///
/// Pure: no I/O, no hidden state. Rounding is half away from zero
/// (`f64::round`) and both axes are clamped to at least one pixel, so a
/// non-positive `resize_value` degrades to a 1px axis instead of failing.
pub fn resolve_dimensions(width: u32, height: u32, options: &ProcessingOptions) -> (u32, u32) {
    let w = width.max(1) as f64;
    let h = height.max(1) as f64;
    let value = options.resize_value as f64;

    let (target_w, target_h) = match options.resize_mode {
        ResizeMode::Original => (w, h),
        ResizeMode::Percentage => ((w * value / 100.0).round(), (h * value / 100.0).round()),
        ResizeMode::FixedWidth => {
            if options.maintain_aspect_ratio {
                (value, (value * h / w).round())
            } else {
                (value, h)
            }
        }
        ResizeMode::FixedHeight => {
            if options.maintain_aspect_ratio {
                ((value * w / h).round(), value)
            } else {
                (w, value)
            }
        }
    };

    (clamp_axis(target_w), clamp_axis(target_h))
}

fn clamp_axis(value: f64) -> u32 {
    // `as` saturates, so huge values land on u32::MAX rather than wrapping.
    (value.max(1.0)) as u32
}

/// Same ceiling the `image` crate applies to decoder allocations by default.
const DEFAULT_MAX_ALLOC: u64 = 512 * 1024 * 1024;

/// Resamples pixel surfaces with a smoothing filter.
#[derive(Debug, Clone)]
pub struct Resizer {
    algorithm: ResizeAlgorithm,
    max_alloc: u64,
}

impl Resizer {
    pub fn new(algorithm: ResizeAlgorithm) -> Self {
        Self {
            algorithm,
            max_alloc: DEFAULT_MAX_ALLOC,
        }
    }

    pub fn with_max_alloc(mut self, max_alloc: u64) -> Self {
        self.max_alloc = max_alloc;
        self
    }

    pub fn algorithm(&self) -> ResizeAlgorithm {
        self.algorithm
    }

    /// Produces a surface of exactly `width` x `height`.
    ///
    /// An unchanged size hands the input back without touching its pixels.
    /// Targets larger than `MAX_DIMENSION` per axis, or whose buffers would
    /// exceed the allocation budget, fail instead of being attempted.
    pub fn resample(
        &self,
        image: DynamicImage,
        width: u32,
        height: u32,
    ) -> Result<DynamicImage, ProcessingFailure> {
        if image.dimensions() == (width, height) {
            log::debug!("Image dimensions unchanged, skipping resize");
            return Ok(image);
        }

        self.check_target(&image, width, height)?;

        log::debug!(
            "Resizing image from {}x{} to {}x{} ({:?})",
            image.width(),
            image.height(),
            width,
            height,
            self.algorithm
        );

        Ok(image.resize_exact(width, height, self.filter_type()))
    }

    fn check_target(
        &self,
        image: &DynamicImage,
        width: u32,
        height: u32,
    ) -> Result<(), ProcessingFailure> {
        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(ProcessingFailure::encode(format!(
                "Target size {}x{} exceeds maximum {}x{}",
                width, height, MAX_DIMENSION, MAX_DIMENSION
            )));
        }

        // resize_exact samples vertically into an RGBA f32 buffer of
        // source width x target height, then horizontally into the output.
        let intermediate = u64::from(image.width())
            .saturating_mul(u64::from(height))
            .saturating_mul(16);
        let output = u64::from(width)
            .saturating_mul(u64::from(height))
            .saturating_mul(u64::from(image.color().bytes_per_pixel()));
        let required = intermediate.saturating_add(output);

        if required > self.max_alloc {
            return Err(ProcessingFailure::encode(format!(
                "Resizing to {}x{} needs {} bytes, over the {} byte limit",
                width, height, required, self.max_alloc
            )));
        }

        Ok(())
    }

    fn filter_type(&self) -> FilterType {
        match self.algorithm {
            ResizeAlgorithm::Bilinear => FilterType::Triangle,
            ResizeAlgorithm::Bicubic => FilterType::CatmullRom,
            ResizeAlgorithm::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

impl Default for Resizer {
    fn default() -> Self {
        Self::new(ResizeAlgorithm::Lanczos3)
    }
}
