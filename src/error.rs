use std::path::PathBuf;
use thiserror::Error;

use crate::validation::ValidationReport;

/// The main error type for hoplabel operations.
#[derive(Debug, Error)]
pub enum HoplabelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse Darknet label {path}:{line}: {message}")]
    DarknetParse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Failed to parse KITTI label {path}:{line}: {message}")]
    KittiParse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Object rejected: {message}")]
    Validation { message: String },

    #[error("No known label format found in {path} (meta id {meta_id})")]
    FormatNotFound { path: PathBuf, meta_id: u32 },

    #[error("Meta lookup failed: {0}")]
    MetaLookup(String),

    #[error("Meta file '{name}' not found in {folder} or any parent")]
    MetaNotFound { name: String, folder: PathBuf },

    #[error("Failed to parse meta JSON from {path}: {source}")]
    MetaJsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse editor config from {path}: {source}")]
    ConfigJsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse label JSON from {path}: {source}")]
    HopJsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write label JSON to {path}: {source}")]
    HopJsonWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse COCO JSON from {path}: {source}")]
    CocoJsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write COCO JSON to {path}: {source}")]
    CocoJsonWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write crop windows to {path}: {source}")]
    CropWindowsWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to read image dimensions from {path}: {source}")]
    ImageSize {
        path: PathBuf,
        #[source]
        source: imagesize::ImageError,
    },

    #[error("Invalid category value: {0}")]
    InvalidCategory(i32),

    #[error("Validation failed with {error_count} error(s) and {warning_count} warning(s)")]
    ValidationFailed {
        error_count: usize,
        warning_count: usize,
        report: ValidationReport,
    },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}
