use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use formsight::batch::{self, BatchOptions, BatchRunner};
use formsight::{AnalysisResult, AppConfig, TesseractEngine};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "formsight")]
#[command(about = "Extracts the fields of scanned annual return forms")]
struct Args {
    /// Directory of document directories, or one document with --single
    path: PathBuf,

    /// Treat PATH as a single document directory
    #[arg(long)]
    single: bool,

    /// Number of worker threads (defaults to the configured value)
    #[arg(long, short = 'w')]
    workers: Option<usize>,

    /// Results file; stdout when omitted
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Failures file for CSV output; stderr when omitted
    #[arg(long)]
    failures: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,

    /// Configuration file (defaults to config/app_config.json)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "formsight=info".into()),
        )
        .with_writer(io::stderr)
        .init();

    let config = AppConfig::init(args.config.as_deref())?;
    let engine = TesseractEngine::from_config(config);

    let mut options = BatchOptions::from_config(config);
    if let Some(workers) = args.workers {
        options.workers = workers.max(1);
    }

    let mut result = AnalysisResult::new();
    if args.single {
        result.add_outcome(batch::process_document(
            &engine,
            &args.path,
            options.min_pages,
        ));
    } else {
        let documents = batch::document_dirs(&args.path)?;
        result.extend(BatchRunner::new(&engine, options).run(documents));
    }
    result.sort();
    info!(
        "{} documents extracted, {} failed",
        result.documents.len(),
        result.failures.len()
    );

    write_output(&args, &result)
}

fn open_output(path: Option<&PathBuf>, fallback: Box<dyn Write>) -> io::Result<Box<dyn Write>> {
    match path {
        Some(path) => Ok(Box::new(BufWriter::new(File::create(path)?))),
        None => Ok(fallback),
    }
}

fn write_output(args: &Args, result: &AnalysisResult) -> Result<(), Box<dyn std::error::Error>> {
    let output = open_output(args.output.as_ref(), Box::new(io::stdout().lock()))?;

    match args.format {
        OutputFormat::Json => {
            result.write_json(output)?;
        }
        OutputFormat::Csv => {
            result.write_results_csv(output)?;
            if !result.failures.is_empty() || args.failures.is_some() {
                let failures = open_output(args.failures.as_ref(), Box::new(io::stderr()))?;
                result.write_failures_csv(failures)?;
            }
        }
    }

    Ok(())
}
