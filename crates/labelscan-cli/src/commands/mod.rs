//! CLI subcommands.

pub mod batch;
pub mod config;
pub mod process;

/// Raster formats accepted as label images.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tiff", "tif", "webp"];

/// Largest accepted input file.
pub const MAX_INPUT_BYTES: u64 = 10 * 1024 * 1024;

/// Lowercased extension of `path`, or an empty string.
pub fn extension_of(path: &std::path::Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}
