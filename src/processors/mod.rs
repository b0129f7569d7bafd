// pixbatch/src/processors/mod.rs
mod batch;
pub mod codec;
mod compressor;
mod loader;
mod metadata;
mod resizer;

pub use batch::{BatchProcessor, RunScope};
pub use codec::{ImageCodec, RustCodec};
pub use compressor::Compressor;
pub use loader::Loader;
pub use metadata::MetadataProcessor;
pub use resizer::{resolve_dimensions, Resizer};

