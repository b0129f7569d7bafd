// pixbatch/src/utils/mod.rs
use crate::core::{ImageToolError, OutputFormat, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: [&str; 8] = ["jpg", "jpeg", "png", "gif", "bmp", "tiff", "tif", "webp"];

/// Picks a path in `output_dir` for a converted image named after `source_name`.
///
/// The stem is sanitized and the extension follows `format`. Existing files
/// are never overwritten: `_1`, `_2`, ... suffixes are appended instead.
pub fn generate_output_path(output_dir: &Path, source_name: &str, format: OutputFormat) -> PathBuf {
    let stem = Path::new(source_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .map(sanitize_filename)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "image".to_string());
    let extension = format.extension();

    let mut candidate = output_dir.join(format!("{}.{}", stem, extension));
    let mut counter = 1;
    while candidate.exists() {
        candidate = output_dir.join(format!("{}_{}.{}", stem, counter, extension));
        counter += 1;
    }
    candidate
}

/// Expands the given files and directories into a sorted list of image paths.
pub fn collect_image_paths(inputs: &[PathBuf], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for input in inputs {
        if !input.exists() {
            return Err(ImageToolError::InvalidParameter(format!(
                "Input does not exist: {}",
                input.display()
            )));
        }

        if input.is_file() {
            paths.push(input.clone());
            continue;
        }

        let walker = if recursive {
            WalkDir::new(input)
        } else {
            WalkDir::new(input).max_depth(1)
        };

        let mut found: Vec<PathBuf> = walker
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| is_supported_format(entry.path()))
            .map(|entry| entry.into_path())
            .collect();
        found.sort();
        paths.extend(found);
    }

    Ok(paths)
}

pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let base = 1024_f64;
    let bytes_f64 = bytes as f64;
    let exponent = ((bytes_f64.log10() / base.log10()).floor() as usize).min(UNITS.len() - 1);
    let size = bytes_f64 / base.powi(exponent as i32);

    format!("{:.2} {}", size, UNITS[exponent])
}

pub fn calculate_aspect_ratio(width: u32, height: u32) -> f32 {
    if height == 0 {
        0.0
    } else {
        width as f32 / height as f32
    }
}

/// Percentage saved going from `original_size` to `new_size`, never negative.
pub fn calculate_savings(original_size: u64, new_size: u64) -> f64 {
    if original_size == 0 {
        return 0.0;
    }

    let savings = (original_size as f64 - new_size as f64) / original_size as f64 * 100.0;
    savings.max(0.0)
}

pub fn is_supported_format(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

pub fn sanitize_filename(filename: &str) -> String {
    let invalid_chars = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];
    filename
        .chars()
        .map(|c| if invalid_chars.contains(&c) { '_' } else { c })
        .collect()
}

pub fn image_format_to_string(format: image::ImageFormat) -> String {
    match format {
        image::ImageFormat::Jpeg => "JPEG",
        image::ImageFormat::Png => "PNG",
        image::ImageFormat::Gif => "GIF",
        image::ImageFormat::WebP => "WebP",
        image::ImageFormat::Tiff => "TIFF",
        image::ImageFormat::Bmp => "BMP",
        image::ImageFormat::Ico => "ICO",
        image::ImageFormat::Avif => "AVIF",
        _ => "Unknown",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn file_sizes_are_humanized() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512.00 B");
        assert_eq!(format_file_size(1536), "1.50 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5.00 MB");
    }

    #[test]
    fn savings_never_negative() {
        assert_eq!(calculate_savings(200, 50), 75.0);
        assert_eq!(calculate_savings(100, 300), 0.0);
        assert_eq!(calculate_savings(0, 10), 0.0);
    }

    #[test]
    fn aspect_ratio_handles_zero_height() {
        assert_eq!(calculate_aspect_ratio(1000, 500), 2.0);
        assert_eq!(calculate_aspect_ratio(10, 0), 0.0);
    }

    #[test]
    fn supported_extensions_are_case_insensitive() {
        assert!(is_supported_format(Path::new("a/photo.JPG")));
        assert!(is_supported_format(Path::new("shot.webp")));
        assert!(!is_supported_format(Path::new("notes.txt")));
        assert!(!is_supported_format(Path::new("no_extension")));
    }

    #[test]
    fn sanitize_replaces_reserved_characters() {
        assert_eq!(sanitize_filename("a:b*c?.png"), "a_b_c_.png");
    }

    #[test]
    fn output_path_uses_format_extension_and_avoids_overwrites() {
        let tmp = tempfile::TempDir::new().unwrap();
        let first = generate_output_path(tmp.path(), "holiday.png", OutputFormat::WebP);
        assert_eq!(first, tmp.path().join("holiday.webp"));

        fs::write(&first, b"x").unwrap();
        let second = generate_output_path(tmp.path(), "holiday.png", OutputFormat::WebP);
        assert_eq!(second, tmp.path().join("holiday_1.webp"));
    }

    #[test]
    fn output_path_falls_back_to_generic_stem() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = generate_output_path(tmp.path(), "", OutputFormat::Jpeg);
        assert_eq!(path, tmp.path().join("image.jpg"));
    }

    #[test]
    fn collect_filters_and_sorts() {
        let tmp = tempfile::TempDir::new().unwrap();
        fs::write(tmp.path().join("b.png"), b"").unwrap();
        fs::write(tmp.path().join("a.jpg"), b"").unwrap();
        fs::write(tmp.path().join("readme.md"), b"").unwrap();
        fs::create_dir(tmp.path().join("nested")).unwrap();
        fs::write(tmp.path().join("nested/c.webp"), b"").unwrap();

        let flat = collect_image_paths(&[tmp.path().to_path_buf()], false).unwrap();
        assert_eq!(
            flat,
            vec![tmp.path().join("a.jpg"), tmp.path().join("b.png")]
        );

        let deep = collect_image_paths(&[tmp.path().to_path_buf()], true).unwrap();
        assert_eq!(deep.len(), 3);
    }

    #[test]
    fn collect_rejects_missing_input() {
        let result = collect_image_paths(&[PathBuf::from("/definitely/not/here")], false);
        assert!(matches!(result, Err(ImageToolError::InvalidParameter(_))));
    }
}
