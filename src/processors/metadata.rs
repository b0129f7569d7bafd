// pixbatch/src/processors/metadata.rs
use exif::{Exif, In, Reader, Tag};
use image::metadata::Orientation;
use std::io::Cursor;

/// Reads EXIF data straight from an in-memory image payload.
pub struct MetadataProcessor;

impl MetadataProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Parsed EXIF block, or `None` when the payload carries none or it is
    /// unreadable. Metadata problems never fail a conversion.
    pub fn read_metadata(&self, bytes: &[u8]) -> Option<Exif> {
        let mut cursor = Cursor::new(bytes);
        match Reader::new().read_from_container(&mut cursor) {
            Ok(exif) => Some(exif),
            Err(exif::Error::NotFound(_)) => None,
            Err(e) => {
                log::debug!("Ignoring unreadable EXIF data: {}", e);
                None
            }
        }
    }

    pub fn has_metadata(&self, bytes: &[u8]) -> bool {
        self.read_metadata(bytes).is_some()
    }

    /// Display orientation recorded by the camera. Defaults to upright.
    pub fn orientation(&self, bytes: &[u8]) -> Orientation {
        self.read_metadata(bytes)
            .and_then(|exif| {
                exif.get_field(Tag::Orientation, In::PRIMARY)
                    .and_then(|field| field.value.get_uint(0))
            })
            .and_then(|value| u8::try_from(value).ok())
            .and_then(Orientation::from_exif)
            .unwrap_or(Orientation::NoTransforms)
    }

    /// Human-readable values of the commonly shown EXIF fields.
    pub fn extract_common_metadata(&self, exif: &Exif) -> Vec<(String, String)> {
        exif.fields()
            .filter(|field| field.ifd_num == In::PRIMARY)
            .filter(|field| {
                matches!(
                    field.tag,
                    Tag::ImageDescription
                        | Tag::Make
                        | Tag::Model
                        | Tag::DateTime
                        | Tag::DateTimeOriginal
                        | Tag::ExposureTime
                        | Tag::FNumber
                        | Tag::FocalLength
                        | Tag::PhotographicSensitivity
                        | Tag::Orientation
                        | Tag::Software
                        | Tag::Artist
                        | Tag::Copyright
                )
            })
            .map(|field| {
                (
                    field.tag.to_string(),
                    field.display_value().with_unit(exif).to_string(),
                )
            })
            .collect()
    }
}

impl Default for MetadataProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether an orientation swaps width and height.
pub fn swaps_axes(orientation: Orientation) -> bool {
    matches!(
        orientation,
        Orientation::Rotate90
            | Orientation::Rotate270
            | Orientation::Rotate90FlipH
            | Orientation::Rotate270FlipH
    )
}
