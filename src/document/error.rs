use std::path::PathBuf;

use thiserror::Error;

use crate::ocr::OcrError;
use crate::utils::error::ImageError;

/// The detected structure of a page does not match its layout.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("{page}: expected at least {required} boxes, found {found}")]
    InsufficientBoxes {
        page: &'static str,
        required: usize,
        found: usize,
    },

    #[error("{page}: table {field} needs {required} {axis} lines, found {found}")]
    InsufficientGridLines {
        page: &'static str,
        field: &'static str,
        axis: &'static str,
        required: usize,
        found: usize,
    },

    #[error("{page}: invalid layout descriptor: {message}")]
    InvalidDescriptor { page: &'static str, message: String },
}

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Document path {path} is not a directory")]
    NotADirectory { path: PathBuf },

    #[error("Failed to read document directory")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Failed to load page image {path}")]
    ImageLoadError {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Document has {found} pages, page {required} is required")]
    MissingPage { required: usize, found: usize },

    #[error("Page layout mismatch")]
    Layout {
        #[from]
        source: LayoutError,
    },

    #[error("Text recognition failed")]
    Ocr {
        #[from]
        source: OcrError,
    },

    #[error("Image processing failed")]
    Image {
        #[from]
        source: ImageError,
    },
}
