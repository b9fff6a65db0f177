pub mod analysis;
pub mod error;
pub mod form_box;
pub mod layout;
pub mod page_type;
pub mod record;
pub mod table;

use std::fs;
use std::path::{Path, PathBuf};

use image::RgbImage;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, instrument};

pub use analysis::{field_columns, AnalysisResult, FailureRecord, PagePipeline};
pub use error::{DocumentError, LayoutError};
pub use form_box::{BoxOrder, FormBox};
pub use layout::LayoutDescriptor;
pub use page_type::PageType;
pub use record::{DocumentRecord, FieldType, FieldValue, PageRecord};
pub use table::{RowAnchor, TableGrid};

use crate::ocr::OcrEngine;

const PAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "tif", "tiff"];

static PAGE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{1,2}").expect("invalid page number regex"));

/// First one or two digit number in a page file name.
pub fn page_number(file_name: &str) -> Option<u32> {
    PAGE_NUMBER
        .find(file_name)
        .and_then(|m| m.as_str().parse().ok())
}

pub fn is_page_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| PAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Number of pages needed to reach the last page type.
fn required_pages() -> usize {
    PageType::ALL
        .iter()
        .map(|p| p.page_index() + 1)
        .max()
        .unwrap_or(0)
}

/// One annual return: a directory holding an image per page.
#[derive(Debug, Clone)]
pub struct Document {
    name: String,
    pages: Vec<PathBuf>,
    min_pages: usize,
}

impl Document {
    /// Lists the page images of a document directory.
    ///
    /// Pages are ordered by the first number in their file name; files
    /// without one sort last, by name.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(DocumentError::NotADirectory {
                path: path.to_path_buf(),
            });
        }

        let mut pages = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry_path = entry?.path();
            if entry_path.is_file() && is_page_image(&entry_path) {
                pages.push(entry_path);
            }
        }

        pages.sort_by_cached_key(|page| {
            let file_name = page
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            (page_number(&file_name).unwrap_or(u32::MAX), file_name)
        });

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        debug!("Document {} has {} pages", name, pages.len());

        Ok(Self {
            name,
            pages,
            min_pages: required_pages(),
        })
    }

    /// Raises the page count below which the document is rejected. It never
    /// drops below the pages the layouts need.
    pub fn with_min_pages(mut self, min_pages: usize) -> Self {
        self.min_pages = min_pages.max(required_pages());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pages(&self) -> &[PathBuf] {
        &self.pages
    }

    pub fn load_page(&self, index: usize) -> Result<RgbImage, DocumentError> {
        let path = self.pages.get(index).ok_or(DocumentError::MissingPage {
            required: index + 1,
            found: self.pages.len(),
        })?;
        let image = image::open(path).map_err(|source| DocumentError::ImageLoadError {
            path: path.clone(),
            source,
        })?;
        Ok(image.to_rgb8())
    }

    /// Reads every page type of the document.
    ///
    /// Any page failure fails the whole document; field-level noise does not.
    #[instrument(skip(self, engine), fields(document = %self.name))]
    pub fn analyze(&self, engine: &dyn OcrEngine) -> Result<DocumentRecord, DocumentError> {
        if self.pages.len() < self.min_pages {
            return Err(DocumentError::MissingPage {
                required: self.min_pages,
                found: self.pages.len(),
            });
        }

        let pipeline = PagePipeline::new(engine);
        let mut records = Vec::with_capacity(PageType::ALL.len());
        for page_type in PageType::ALL {
            let image = self.load_page(page_type.page_index())?;
            records.push(pipeline.process_page(page_type, &image)?);
        }

        info!("Extracted {} pages", records.len());
        Ok(DocumentRecord::new(self.name.clone(), records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_number() {
        assert_eq!(page_number("scan_03.jpg"), Some(3));
        assert_eq!(page_number("page12.png"), Some(12));
        assert_eq!(page_number("2021_return_5.tif"), Some(20));
        assert_eq!(page_number("cover.png"), None);
    }

    #[test]
    fn test_is_page_image() {
        assert!(is_page_image(Path::new("a/1.JPG")));
        assert!(is_page_image(Path::new("a/1.tiff")));
        assert!(!is_page_image(Path::new("a/1.pdf")));
        assert!(!is_page_image(Path::new("a/notes")));
    }

    #[test]
    fn test_required_pages() {
        assert_eq!(required_pages(), 8);
    }
}
