use anyhow::{bail, Context};
use clap::Parser;
use log::LevelFilter;
use pixbatch::{
    calculate_aspect_ratio, collect_image_paths, format_file_size,
    generate_output_path, BatchProcessor, Cli, Commands, IngestedImage, ItemStore, Loader,
    MetadataProcessor, ProcessingOptions, RustCodec,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .init();

    match cli.command {
        Commands::Convert {
            inputs,
            output,
            format,
            quality,
            resize,
            value,
            keep_aspect,
            algorithm,
            threads,
            recursive,
            no_png_optimize,
        } => {
            let options = ProcessingOptions {
                format: format.into(),
                quality,
                resize_mode: resize.into(),
                resize_value: value,
                maintain_aspect_ratio: keep_aspect,
            };
            let codec = RustCodec::new()
                .with_algorithm(algorithm.into())
                .with_png_optimization(!no_png_optimize);

            process_convert(&inputs, &output, &options, codec, threads, recursive)?;
        }
        Commands::Info { input } => {
            process_info(&input)?;
        }
    }

    Ok(())
}

fn process_convert(
    inputs: &[PathBuf],
    output: &Path,
    options: &ProcessingOptions,
    codec: RustCodec,
    threads: usize,
    recursive: bool,
) -> anyhow::Result<()> {
    options.validate()?;

    if output.exists() && !output.is_dir() {
        bail!("Output path exists but is not a directory: {}", output.display());
    }

    let paths = collect_image_paths(inputs, recursive)?;
    if paths.is_empty() {
        log::warn!("No image files found");
        return Ok(());
    }

    let store = Arc::new(ItemStore::new());
    let ingested = ingest(&store, &paths, codec.loader());
    if ingested == 0 {
        bail!("None of the {} input files could be read as images", paths.len());
    }

    let batch = BatchProcessor::with_codec(Arc::clone(&store), codec, threads)?.with_progress(true);
    let stats = batch.run(options);

    std::fs::create_dir_all(output)
        .with_context(|| format!("Failed to create output directory {}", output.display()))?;

    for (_, name, image) in store.completed() {
        let path = generate_output_path(output, &name, image.format);
        std::fs::write(&path, &image.bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        log::info!(
            "Saved {} ({}x{}, {})",
            path.display(),
            image.width,
            image.height,
            format_file_size(image.size())
        );
    }

    for (id, message) in &stats.errors {
        let name = store.get(*id).map(|item| item.name().to_string()).unwrap_or_default();
        eprintln!("Failed: {} ({})", name, message);
    }

    println!(
        "Converted {} of {} images to {} ({} -> {}, {:.1}% smaller)",
        stats.processed_count,
        ingested,
        output.display(),
        format_file_size(stats.total_size_before),
        format_file_size(stats.total_size_after),
        stats.overall_savings()
    );

    Ok(())
}

/// Reads each file and adds it to the store. Files whose header cannot be
/// read are reported and left out.
fn ingest(store: &ItemStore, paths: &[PathBuf], loader: &Loader) -> usize {
    let mut count = 0;

    for path in paths {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };

        let (width, height, _) = match loader.probe(&bytes) {
            Ok(info) => info,
            Err(e) => {
                log::warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        store.add(IngestedImage {
            name,
            bytes,
            width,
            height,
        });
        count += 1;
    }

    count
}

fn process_info(input: &Path) -> anyhow::Result<()> {
    if !input.exists() {
        bail!("File does not exist: {}", input.display());
    }

    let bytes = std::fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let (width, height, format) = Loader::new().probe(&bytes)?;
    let aspect_ratio = calculate_aspect_ratio(width, height);

    let metadata_processor = MetadataProcessor::new();
    let exif = metadata_processor.read_metadata(&bytes);

    println!("=== Image Information ===");
    println!("File: {}", input.display());
    println!("Size: {}", format_file_size(bytes.len() as u64));
    println!("Dimensions: {} x {} pixels", width, height);
    println!("Aspect Ratio: {:.2}:1", aspect_ratio);
    println!("Format: {}", format);
    println!("Has EXIF metadata: {}", exif.is_some());

    if let Some(exif) = exif {
        println!("\n=== EXIF Metadata ===");
        for (tag, value) in metadata_processor.extract_common_metadata(&exif) {
            println!("{:25}: {}", tag, value);
        }
    }

    Ok(())
}
