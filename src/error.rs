//! Error types for archive loading, export and annotation commits.

use thiserror::Error;

/// Faults raised while turning an uploaded archive into a base image.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// The upload is not a zip archive at all
    #[error("Please upload a ZIP file.")]
    NotZip,

    /// The archive could not be parsed
    #[error("Error reading ZIP file: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// The archive parsed but holds no `.png` entry
    #[error("No PNG file found in the ZIP.")]
    NoPng,

    /// I/O error while reading the archive or one of its entries
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The PNG entry failed to decode
    #[error("Failed to decode '{name}': {source}")]
    Decode {
        /// Archive entry name
        name: String,
        #[source]
        source: image::ImageError,
    },

    /// The decoded image has a zero width or height
    #[error("Image '{name}' has no pixels ({width}x{height})")]
    EmptyImage {
        name: String,
        width: u32,
        height: u32,
    },
}

/// Faults raised while building the output bundle.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to encode PNG: {0}")]
    Encode(#[from] image::ImageError),

    #[error("Failed to write ZIP archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reasons an annotation is refused by the drawing store.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationError {
    #[error("Annotation label must not be empty")]
    EmptyLabel,

    #[error("Annotation path must contain at least one point")]
    EmptyPath,
}

/// Faults raised while reading the configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
