// pixbatch/src/processors/codec.rs
//! The decode/resample/encode capability the pipeline is built on.
//!
//! [`ImageCodec`] is the seam: the transform pipeline and batch controller
//! only talk to the trait, so tests can swap in a recording mock.
//! [`RustCodec`] is the production implementation on top of the `image`
//! crate, oxipng and libwebp.

use super::{Compressor, Loader, Resizer};
use crate::core::{OutputFormat, ProcessingFailure, ResizeAlgorithm};
use image::DynamicImage;

pub trait ImageCodec: Sync {
    /// Decodes raw bytes into a pixel surface.
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, ProcessingFailure>;

    /// Returns a surface of exactly `width` x `height`, handing `image` back
    /// untouched when it already has that size. Fails when the target is
    /// too large to allocate.
    fn resample(
        &self,
        image: DynamicImage,
        width: u32,
        height: u32,
    ) -> Result<DynamicImage, ProcessingFailure>;

    /// Encodes a surface. `quality` is 1..=100 and ignored by lossless formats.
    fn encode(
        &self,
        image: &DynamicImage,
        format: OutputFormat,
        quality: u8,
    ) -> Result<Vec<u8>, ProcessingFailure>;
}

#[derive(Clone, Default)]
pub struct RustCodec {
    loader: Loader,
    resizer: Resizer,
    compressor: Compressor,
}

impl RustCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_loader(mut self, loader: Loader) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_algorithm(mut self, algorithm: ResizeAlgorithm) -> Self {
        self.resizer = Resizer::new(algorithm);
        self
    }

    pub fn with_png_optimization(mut self, optimize: bool) -> Self {
        self.compressor = self.compressor.with_png_optimization(optimize);
        self
    }

    pub fn loader(&self) -> &Loader {
        &self.loader
    }
}

impl ImageCodec for RustCodec {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, ProcessingFailure> {
        self.loader.decode(bytes)
    }

    fn resample(
        &self,
        image: DynamicImage,
        width: u32,
        height: u32,
    ) -> Result<DynamicImage, ProcessingFailure> {
        self.resizer.resample(image, width, height)
    }

    fn encode(
        &self,
        image: &DynamicImage,
        format: OutputFormat,
        quality: u8,
    ) -> Result<Vec<u8>, ProcessingFailure> {
        self.compressor.compress_to_bytes(image, format, quality)
    }
}
