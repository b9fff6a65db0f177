use std::fs;
use std::path::{Path, PathBuf};

use formsight::batch::{document_dirs, process_document};
use formsight::document::AnalysisResult;
use formsight::ocr::{OcrConfig, OcrEngine, OcrError, OcrLanguage};
use formsight::{BatchOptions, BatchRunner, DocumentOutcome};
use image::{GrayImage, Rgb, RgbImage};
use tempfile::TempDir;

struct SilentEngine;

impl OcrEngine for SilentEngine {
    fn recognize(
        &self,
        _region: &GrayImage,
        _language: OcrLanguage,
        _config: &OcrConfig,
    ) -> Result<String, OcrError> {
        Ok(String::new())
    }
}

struct PanickingEngine;

impl OcrEngine for PanickingEngine {
    fn recognize(
        &self,
        _region: &GrayImage,
        _language: OcrLanguage,
        _config: &OcrConfig,
    ) -> Result<String, OcrError> {
        panic!("engine crashed")
    }
}

fn options(workers: usize) -> BatchOptions {
    BatchOptions {
        workers,
        queue_capacity: 2,
        min_pages: 8,
    }
}

/// A document directory holding `pages` blank page images.
fn blank_document(root: &Path, name: &str, pages: usize) -> PathBuf {
    let dir = root.join(name);
    fs::create_dir(&dir).unwrap();
    for i in 1..=pages {
        RgbImage::from_pixel(120, 90, Rgb([255, 255, 255]))
            .save(dir.join(format!("page_{i}.png")))
            .unwrap();
    }
    dir
}

#[test]
fn test_one_outcome_per_document() {
    let root = TempDir::new().unwrap();
    let documents: Vec<PathBuf> = (0..5)
        .map(|i| blank_document(root.path(), &format!("doc_{i}"), 2))
        .collect();

    let outcomes = BatchRunner::new(&SilentEngine, options(3)).run(documents);

    let mut names: Vec<&str> = outcomes.iter().map(DocumentOutcome::document).collect();
    names.sort();
    assert_eq!(names, vec!["doc_0", "doc_1", "doc_2", "doc_3", "doc_4"]);
    assert!(outcomes.iter().all(|o| !o.is_success()));
}

#[test]
fn test_missing_pages_are_reported() {
    let root = TempDir::new().unwrap();
    let dir = blank_document(root.path(), "short", 3);

    let outcome = process_document(&SilentEngine, &dir, 8);

    assert_eq!(
        outcome,
        DocumentOutcome::Failure {
            document: "short".to_string(),
            diagnostic: "Document has 3 pages, page 8 is required".to_string(),
        }
    );
}

#[test]
fn test_blank_pages_fail_on_structure() {
    let root = TempDir::new().unwrap();
    let dir = blank_document(root.path(), "blank", 8);

    let outcome = process_document(&SilentEngine, &dir, 8);

    match outcome {
        DocumentOutcome::Failure { document, diagnostic } => {
            assert_eq!(document, "blank");
            assert!(
                diagnostic.contains("page_1: expected at least 8 boxes, found 0"),
                "{diagnostic}"
            );
        }
        DocumentOutcome::Success(_) => panic!("blank document should fail"),
    }
}

#[test]
fn test_panics_become_failures() {
    let root = TempDir::new().unwrap();
    let documents = vec![
        blank_document(root.path(), "a", 3),
        blank_document(root.path(), "b", 3),
    ];

    // Short documents fail before the engine is touched; the engine is only
    // here to show the pool keeps going.
    let outcomes = BatchRunner::new(&PanickingEngine, options(2)).run(documents);

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| !o.is_success()));
}

#[test]
fn test_empty_batch() {
    let outcomes = BatchRunner::new(&SilentEngine, options(4)).run(Vec::new());
    assert!(outcomes.is_empty());
}

#[test]
fn test_document_dirs_are_sorted() {
    let root = TempDir::new().unwrap();
    for name in ["zeta", "alpha", "mid"] {
        fs::create_dir(root.path().join(name)).unwrap();
    }
    fs::write(root.path().join("readme.txt"), "x").unwrap();

    let dirs = document_dirs(root.path()).unwrap();

    let names: Vec<_> = dirs
        .iter()
        .map(|d| d.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    assert!(document_dirs(&root.path().join("readme.txt")).is_err());
}

#[test]
fn test_outcomes_feed_the_result() {
    let root = TempDir::new().unwrap();
    let documents = vec![
        blank_document(root.path(), "second", 1),
        blank_document(root.path(), "first", 1),
    ];

    let mut result = AnalysisResult::new();
    result.extend(BatchRunner::new(&SilentEngine, options(2)).run(documents));
    result.sort();

    let mut csv = Vec::new();
    result.write_failures_csv(&mut csv).unwrap();
    let csv = String::from_utf8(csv).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("first,"));
    assert!(lines[2].starts_with("second,"));
}
