// pixbatch/src/processors/compressor.rs
use crate::core::{OutputFormat, ProcessingFailure};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder};
use oxipng::{optimize_from_memory, Options};

/// Encodes pixel surfaces into output payloads.
#[derive(Debug, Clone)]
pub struct Compressor {
    optimize_png: bool,
}

impl Compressor {
    pub fn new() -> Self {
        Self { optimize_png: true }
    }

    pub fn with_png_optimization(mut self, optimize: bool) -> Self {
        self.optimize_png = optimize;
        self
    }

    /// Encodes `image` as `format`. `quality` is 1..=100 and is ignored by
    /// PNG. An empty encoder result counts as a failure.
    pub fn compress_to_bytes(
        &self,
        image: &DynamicImage,
        format: OutputFormat,
        quality: u8,
    ) -> Result<Vec<u8>, ProcessingFailure> {
        let quality = quality.clamp(1, 100);
        if format.is_lossy() {
            log::debug!(
                "Encoding {}x{} image as {} (quality {})",
                image.width(),
                image.height(),
                format,
                quality
            );
        } else {
            log::debug!(
                "Encoding {}x{} image as {} (lossless, quality ignored)",
                image.width(),
                image.height(),
                format
            );
        }

        let bytes = match format {
            OutputFormat::Jpeg => self.encode_jpeg(image, quality)?,
            OutputFormat::Png => self.encode_png(image)?,
            OutputFormat::WebP => self.encode_webp(image, quality)?,
        };

        if bytes.is_empty() {
            return Err(ProcessingFailure::encode(format!(
                "{} encoder produced no data",
                format
            )));
        }

        Ok(bytes)
    }

    // JPEG has no alpha channel; it is dropped.
    fn encode_jpeg(&self, image: &DynamicImage, quality: u8) -> Result<Vec<u8>, ProcessingFailure> {
        let rgb = image.to_rgb8();
        let mut buffer = Vec::new();
        JpegEncoder::new_with_quality(&mut buffer, quality)
            .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
            .map_err(|e| ProcessingFailure::encode(format!("JPEG encode failed: {}", e)))?;
        Ok(buffer)
    }

    fn encode_png(&self, image: &DynamicImage) -> Result<Vec<u8>, ProcessingFailure> {
        let mut buffer = Vec::new();
        let encoder = PngEncoder::new(&mut buffer);
        let result = if image.color().has_alpha() {
            let rgba = image.to_rgba8();
            encoder.write_image(rgba.as_raw(), rgba.width(), rgba.height(), ExtendedColorType::Rgba8)
        } else {
            let rgb = image.to_rgb8();
            encoder.write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        };
        result.map_err(|e| ProcessingFailure::encode(format!("PNG encode failed: {}", e)))?;

        if self.optimize_png {
            return Ok(self.optimize_png_bytes(buffer));
        }
        Ok(buffer)
    }

    fn encode_webp(&self, image: &DynamicImage, quality: u8) -> Result<Vec<u8>, ProcessingFailure> {
        let rgba = image.to_rgba8();
        let encoder = webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height());
        let memory = encoder
            .encode_simple(false, quality as f32)
            .map_err(|e| ProcessingFailure::encode(format!("WebP encode failed: {:?}", e)))?;
        Ok(memory.to_vec())
    }

    /// Lossless recompression. Falls back to the input when oxipng fails.
    fn optimize_png_bytes(&self, data: Vec<u8>) -> Vec<u8> {
        match optimize_from_memory(&data, &Options::default()) {
            Ok(optimized) if !optimized.is_empty() && optimized.len() < data.len() => optimized,
            Ok(_) => data,
            Err(e) => {
                log::warn!("PNG optimization failed, keeping unoptimized output: {}", e);
                data
            }
        }
    }
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new()
    }
}
