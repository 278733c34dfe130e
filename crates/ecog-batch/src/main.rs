//! ECoG-Features: Extract labeled PSD features from a recording directory

use anyhow::{bail, Context, Result};
use clap::Parser;
use ecog_batch::{logging, Args, BatchConfig, BatchOrchestrator, CONFIG_ENV};
use ecog_core::{AnnotationDictionary, EdfLoader};
use ecog_processing::{PredictionFileEventSource, RecordingProcessor};
use tracing::info;

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init();

    let config = match std::env::var_os(CONFIG_ENV) {
        Some(path) => BatchConfig::load(&path)
            .with_context(|| format!("Failed to load configuration from {}", path.to_string_lossy()))?,
        None => BatchConfig::default(),
    };
    config.validate().context("Invalid configuration")?;

    if !args.edf_dir.is_dir() {
        bail!("Recording directory {} does not exist", args.edf_dir.display());
    }

    let dictionary = AnnotationDictionary::load(&args.annotations).with_context(|| {
        format!("Failed to load annotation dictionary {}", args.annotations.display())
    })?;
    let events = PredictionFileEventSource::load(&args.realtime_file, &args.classifier)
        .with_context(|| format!("Failed to load predictions {}", args.realtime_file.display()))?;

    info!(
        "Starting on {}: {} sessions in {}, output to {}",
        args.computer,
        dictionary.len(),
        args.annotations.display(),
        config.extraction.output_dir.display()
    );

    let workers = config.worker_count();
    let processor = RecordingProcessor::new(
        config.extraction,
        Box::new(EdfLoader),
        Box::new(events),
        dictionary,
    )?;
    let orchestrator = BatchOrchestrator::new(processor, workers)?.with_progress_bar(true);

    let runtime = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
    let summary = runtime.block_on(orchestrator.run(&args.edf_dir))?;

    info!(
        "{}: {} discovered, {} selected, {} written, {} skipped, {} failed",
        args.computer,
        summary.discovered,
        summary.selected,
        summary.written,
        summary.skipped,
        summary.failed
    );
    Ok(())
}
