mod cli;
mod core;
mod processors;
mod utils;

pub use crate::cli::{Algorithm, Cli, Commands, FormatArg, ResizeModeArg};
pub use crate::core::{
    FailureKind, ImageItem, ImageProcessor, ImageToolError, IngestedImage, ItemId, ItemState,
    ItemStatus, ItemStore, OutputFormat, ProcessOutcome, ProcessedImage, ProcessingFailure,
    ProcessingOptions, ProcessingStats, ResizeAlgorithm, ResizeMode, Result, MAX_DIMENSION,
    MAX_QUALITY, MIN_QUALITY,
};
pub use crate::processors::{
    resolve_dimensions, BatchProcessor, Compressor, ImageCodec, Loader, MetadataProcessor,
    Resizer, RunScope, RustCodec,
};
pub use crate::utils::{
    calculate_aspect_ratio, calculate_savings, collect_image_paths, format_file_size,
    generate_output_path, is_supported_format, sanitize_filename,
};

pub mod prelude {
    pub use crate::{
        BatchProcessor, ImageCodec, ImageProcessor, IngestedImage, ItemStatus, ItemStore,
        OutputFormat, ProcessingOptions, ResizeMode, RustCodec,
    };
}

// Re-export commonly used types
pub use image::DynamicImage;
