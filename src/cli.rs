// pixbatch/src/cli.rs
use crate::core::{OutputFormat, ResizeAlgorithm, ResizeMode};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pixbatch")]
#[command(version, about = "Batch image converter: resize, re-encode and compress")]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert a set of images with one set of options
    Convert {
        /// Image files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Directory the converted images are written to
        #[arg(short, long)]
        output: PathBuf,

        /// Output encoding
        #[arg(short, long, value_enum, default_value_t = FormatArg::Jpeg)]
        format: FormatArg,

        /// Encoder quality between 0.1 and 1.0 (ignored for PNG)
        #[arg(short, long, default_value_t = 0.8)]
        quality: f32,

        /// How the target size is derived
        #[arg(short, long, value_enum, default_value_t = ResizeModeArg::Original)]
        resize: ResizeModeArg,

        /// Percentage or pixel count, depending on --resize
        #[arg(long, default_value_t = 100, allow_negative_numbers = true)]
        value: i32,

        /// Keep the aspect ratio under fixed-width/fixed-height
        #[arg(long, default_value_t = true, action = ArgAction::Set)]
        keep_aspect: bool,

        /// Resampling filter
        #[arg(short, long, value_enum, default_value_t = Algorithm::Lanczos3)]
        algorithm: Algorithm,

        /// Number of images converted at once
        #[arg(short, long, default_value_t = 1)]
        threads: usize,

        /// Descend into subdirectories
        #[arg(short = 'R', long)]
        recursive: bool,

        /// Skip lossless oxipng recompression of PNG output
        #[arg(long)]
        no_png_optimize: bool,
    },

    /// Show size, format and EXIF details of an image
    Info {
        input: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatArg {
    Jpeg,
    Png,
    Webp,
}

impl From<FormatArg> for OutputFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Jpeg => OutputFormat::Jpeg,
            FormatArg::Png => OutputFormat::Png,
            FormatArg::Webp => OutputFormat::WebP,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResizeModeArg {
    Original,
    Percentage,
    FixedWidth,
    FixedHeight,
}

impl From<ResizeModeArg> for ResizeMode {
    fn from(mode: ResizeModeArg) -> Self {
        match mode {
            ResizeModeArg::Original => ResizeMode::Original,
            ResizeModeArg::Percentage => ResizeMode::Percentage,
            ResizeModeArg::FixedWidth => ResizeMode::FixedWidth,
            ResizeModeArg::FixedHeight => ResizeMode::FixedHeight,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Algorithm {
    Bilinear,
    Bicubic,
    Lanczos3,
}

impl From<Algorithm> for ResizeAlgorithm {
    fn from(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Bilinear => ResizeAlgorithm::Bilinear,
            Algorithm::Bicubic => ResizeAlgorithm::Bicubic,
            Algorithm::Lanczos3 => ResizeAlgorithm::Lanczos3,
        }
    }
}
