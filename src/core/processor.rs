// pixbatch/src/core/processor.rs
use super::{ImageItem, ProcessedImage, ProcessingFailure, ProcessingOptions};
use crate::processors::codec::{ImageCodec, RustCodec};
use crate::processors::resolve_dimensions;
use image::GenericImageView;

/// Terminal result of converting one image.
pub type ProcessOutcome = std::result::Result<ProcessedImage, ProcessingFailure>;

/// Runs decode, resolve, resample and encode for a single image.
///
/// Every failure is returned as a [`ProcessingFailure`]; nothing escapes as
/// a panic or a caller-level error.
pub struct ImageProcessor<C = RustCodec> {
    codec: C,
}

impl ImageProcessor<RustCodec> {
    pub fn new() -> Self {
        Self::with_codec(RustCodec::new())
    }
}

impl Default for ImageProcessor<RustCodec> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ImageCodec> ImageProcessor<C> {
    pub fn with_codec(codec: C) -> Self {
        Self { codec }
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn process_item(&self, item: &ImageItem, options: &ProcessingOptions) -> ProcessOutcome {
        self.process(item.original(), options)
    }

    pub fn process(&self, original: &[u8], options: &ProcessingOptions) -> ProcessOutcome {
        let decoded = self.codec.decode(original)?;
        let (width, height) = decoded.dimensions();

        let (target_w, target_h) = resolve_dimensions(width, height, options);
        // The decoded surface moves into the resampler, so at most one
        // surface is alive at a time.
        let resampled = if (target_w, target_h) == (width, height) {
            decoded
        } else {
            self.codec.resample(decoded, target_w, target_h)?
        };

        let bytes = self
            .codec
            .encode(&resampled, options.format, options.encoder_quality())?;
        if bytes.is_empty() {
            return Err(ProcessingFailure::encode(format!(
                "{} encoder produced no data",
                options.format
            )));
        }

        log::debug!(
            "Converted {}x{} ({} bytes) to {}x{} {} ({} bytes)",
            width,
            height,
            original.len(),
            target_w,
            target_h,
            options.format,
            bytes.len()
        );

        Ok(ProcessedImage {
            bytes,
            format: options.format,
            width: target_w,
            height: target_h,
        })
    }
}
