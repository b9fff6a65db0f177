//! Batch processing of many documents on a fixed pool of worker threads.
//!
//! Document directories are pushed through a bounded task channel; each
//! worker sends one tagged [`DocumentOutcome`] per task on the result
//! channel. Outcomes arrive in completion order. A failing or panicking
//! document becomes a `Failure` and never stops the pool.

use std::any::Any;
use std::error::Error;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::thread;

use crossbeam_channel::{bounded, unbounded};
use tracing::{debug, error, info, instrument};

use crate::document::{Document, DocumentError, DocumentRecord};
use crate::ocr::OcrEngine;
use crate::utils::config::AppConfig;

/// Result of processing one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentOutcome {
    Success(DocumentRecord),
    Failure { document: String, diagnostic: String },
}

impl DocumentOutcome {
    pub fn document(&self) -> &str {
        match self {
            DocumentOutcome::Success(record) => &record.document,
            DocumentOutcome::Failure { document, .. } => document,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, DocumentOutcome::Success(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    pub workers: usize,
    pub queue_capacity: usize,
    pub min_pages: usize,
}

impl BatchOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            workers: config.effective_worker_count(),
            queue_capacity: config.queue_capacity.max(1),
            min_pages: config.min_page_count,
        }
    }
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default_config())
    }
}

/// The error followed by each of its sources, separated by `: `.
pub fn diagnostic(err: &(dyn Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn document_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn analyze(
    engine: &dyn OcrEngine,
    path: &Path,
    min_pages: usize,
) -> Result<DocumentRecord, DocumentError> {
    Document::open(path)?.with_min_pages(min_pages).analyze(engine)
}

/// Processes one document directory, turning errors and panics into a
/// `Failure`.
pub fn process_document(
    engine: &dyn OcrEngine,
    path: &Path,
    min_pages: usize,
) -> DocumentOutcome {
    match panic::catch_unwind(AssertUnwindSafe(|| analyze(engine, path, min_pages))) {
        Ok(Ok(record)) => DocumentOutcome::Success(record),
        Ok(Err(e)) => {
            let diagnostic = diagnostic(&e);
            error!("Document {} failed: {}", path.display(), diagnostic);
            DocumentOutcome::Failure {
                document: document_name(path),
                diagnostic,
            }
        }
        Err(payload) => {
            let diagnostic = format!("panic: {}", panic_message(payload.as_ref()));
            error!("Document {} panicked: {}", path.display(), diagnostic);
            DocumentOutcome::Failure {
                document: document_name(path),
                diagnostic,
            }
        }
    }
}

/// Sub-directories of `root`, sorted by name.
pub fn document_dirs(root: &Path) -> Result<Vec<PathBuf>, DocumentError> {
    if !root.is_dir() {
        return Err(DocumentError::NotADirectory {
            path: root.to_path_buf(),
        });
    }

    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let path = entry?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

pub struct BatchRunner<'e> {
    engine: &'e dyn OcrEngine,
    options: BatchOptions,
}

impl<'e> BatchRunner<'e> {
    pub fn new(engine: &'e dyn OcrEngine, options: BatchOptions) -> Self {
        Self { engine, options }
    }

    /// Processes every document and returns one outcome per document, in
    /// completion order.
    #[instrument(skip(self, documents), fields(documents = documents.len()))]
    pub fn run(&self, documents: Vec<PathBuf>) -> Vec<DocumentOutcome> {
        let workers = self.options.workers.clamp(1, documents.len().max(1));
        let (task_tx, task_rx) = bounded::<PathBuf>(self.options.queue_capacity.max(1));
        let (result_tx, result_rx) = unbounded::<DocumentOutcome>();
        let total = documents.len();
        info!("Processing {} documents on {} workers", total, workers);

        thread::scope(|scope| {
            for worker in 0..workers {
                let task_rx = task_rx.clone();
                let result_tx = result_tx.clone();
                let engine = self.engine;
                let min_pages = self.options.min_pages;
                scope.spawn(move || {
                    for path in task_rx.iter() {
                        debug!("Worker {} took {}", worker, path.display());
                        let outcome = process_document(engine, &path, min_pages);
                        if result_tx.send(outcome).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(result_tx);

            for path in documents {
                if task_tx.send(path).is_err() {
                    break;
                }
            }
            drop(task_tx);

            let outcomes: Vec<DocumentOutcome> = result_rx.iter().collect();
            let failed = outcomes.iter().filter(|o| !o.is_success()).count();
            info!("{} of {} documents failed", failed, total);
            outcomes
        })
    }
}
