pub mod batch;
pub mod detection;
pub mod document;
pub mod ocr;
pub mod text;
pub mod utils;

pub use batch::{BatchOptions, BatchRunner, DocumentOutcome};
pub use document::{
    AnalysisResult, Document, DocumentError, DocumentRecord, FieldType, FieldValue, FormBox,
    LayoutError, PageRecord, PageType,
};
pub use ocr::{OcrConfig, OcrEngine, OcrError, OcrLanguage, TesseractEngine};
pub use utils::config::AppConfig;
