// pixbatch/src/processors/loader.rs
use super::metadata::{swaps_axes, MetadataProcessor};
use crate::core::{ProcessingFailure, MAX_DIMENSION};
use crate::utils::image_format_to_string;
use image::{DynamicImage, GenericImageView, ImageReader, Limits};
use std::io::Cursor;

/// Decodes in-memory image payloads, enforcing size limits.
#[derive(Clone)]
pub struct Loader {
    max_dimensions: Option<(u32, u32)>,
    max_bytes: Option<usize>,
}

impl Loader {
    pub fn new() -> Self {
        Self {
            max_dimensions: Some((MAX_DIMENSION, MAX_DIMENSION)),
            max_bytes: None,
        }
    }

    pub fn with_max_dimensions(mut self, width: u32, height: u32) -> Self {
        self.max_dimensions = Some((width, height));
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }

    /// Decodes `data` into an upright pixel surface.
    ///
    /// The EXIF orientation is applied, so the surface's size is the natural
    /// size of the image as displayed.
    pub fn decode(&self, data: &[u8]) -> Result<DynamicImage, ProcessingFailure> {
        self.check_payload(data)?;

        let mut image = self
            .reader(data)?
            .decode()
            .map_err(|e| ProcessingFailure::decode(format!("Failed to decode image: {}", e)))?;

        let orientation = MetadataProcessor::new().orientation(data);
        image.apply_orientation(orientation);

        let (width, height) = image.dimensions();
        log::debug!(
            "Decoded image: {}x{} pixels, color: {:?}, orientation: {:?}",
            width,
            height,
            image.color(),
            orientation
        );

        Ok(image)
    }

    /// Natural (display-oriented) size and format name without a full decode.
    pub fn probe(&self, data: &[u8]) -> Result<(u32, u32, String), ProcessingFailure> {
        self.check_payload(data)?;

        let reader = self.reader(data)?;
        let format = reader
            .format()
            .map(image_format_to_string)
            .unwrap_or_else(|| "Unknown".to_string());
        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| ProcessingFailure::decode(format!("Failed to read dimensions: {}", e)))?;
        self.check_dimensions(width, height)?;

        if swaps_axes(MetadataProcessor::new().orientation(data)) {
            Ok((height, width, format))
        } else {
            Ok((width, height, format))
        }
    }

    fn reader<'a>(&self, data: &'a [u8]) -> Result<ImageReader<Cursor<&'a [u8]>>, ProcessingFailure> {
        let mut reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| ProcessingFailure::decode(format!("Failed to read image header: {}", e)))?;

        if reader.format().is_none() {
            return Err(ProcessingFailure::decode(
                "Unrecognized or unsupported image format",
            ));
        }

        let mut limits = Limits::default();
        if let Some((max_w, max_h)) = self.max_dimensions {
            limits.max_image_width = Some(max_w);
            limits.max_image_height = Some(max_h);
        }
        reader.limits(limits);

        Ok(reader)
    }

    fn check_payload(&self, data: &[u8]) -> Result<(), ProcessingFailure> {
        if data.is_empty() {
            return Err(ProcessingFailure::decode("Image payload is empty"));
        }

        if let Some(max_bytes) = self.max_bytes {
            if data.len() > max_bytes {
                return Err(ProcessingFailure::decode(format!(
                    "Payload of {} bytes exceeds limit of {} bytes",
                    data.len(),
                    max_bytes
                )));
            }
        }

        Ok(())
    }

    fn check_dimensions(&self, width: u32, height: u32) -> Result<(), ProcessingFailure> {
        if let Some((max_w, max_h)) = self.max_dimensions {
            if width > max_w || height > max_h {
                return Err(ProcessingFailure::decode(format!(
                    "Image dimensions {}x{} exceed maximum {}x{}",
                    width, height, max_w, max_h
                )));
            }
        }
        Ok(())
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}
