//! Transfer pipeline: configuration, ingestion, transfer and output.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{debug, info, info_span};

use voyage_ingest::{IngestOptions, read_source_table};
use voyage_model::{ColumnMapping, MapperConfig};
use voyage_transfer::{TransferOptions, TransferOutcome, transfer};

/// Command-line values layered over the configuration file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub target_sheet: Option<String>,
    pub source_sheet: Option<String>,
}

/// One transfer invocation.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub source: PathBuf,
    pub target: PathBuf,
    /// Explicit output path; `None` uses the configured file name.
    pub output: Option<PathBuf>,
    pub config: MapperConfig,
    pub dry_run: bool,
}

/// Result of a transfer invocation.
#[derive(Debug)]
pub struct TransferRun {
    pub outcome: TransferOutcome,
    pub source_rows: usize,
    /// Where the document was written; `None` on a dry run.
    pub written_to: Option<PathBuf>,
}

/// Loads the configuration file (if any) and applies command-line overrides.
pub fn load_config(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<MapperConfig> {
    let mut config = MapperConfig::load_or_default(path).with_context(|| match path {
        Some(path) => format!("load config {}", path.display()),
        None => "load default config".to_string(),
    })?;
    if let Some(sheet) = &overrides.target_sheet {
        config.target_sheet = sheet.clone();
    }
    if let Some(sheet) = &overrides.source_sheet {
        config.source_sheet = Some(sheet.clone());
    }
    Ok(config)
}

/// The mapping the configuration selects.
pub fn active_mapping(config: &MapperConfig) -> Result<ColumnMapping> {
    config.column_mapping().context("build column mapping")
}

/// Output path: the explicit path, or the configured file name in the working directory.
pub fn resolve_output_path(output: Option<&Path>, config: &MapperConfig) -> PathBuf {
    output.map_or_else(|| PathBuf::from(&config.output_file_name), Path::to_path_buf)
}

/// Reads the source, runs the transfer and writes the result unless this is a dry run.
pub fn run_transfer(request: &TransferRequest) -> Result<TransferRun> {
    let span = info_span!("run", source = %request.source.display());
    let _guard = span.enter();
    let started = Instant::now();

    let mapping = active_mapping(&request.config)?;
    let ingest_options = IngestOptions::from_config(&request.config);
    let source = read_source_table(&request.source, &ingest_options)
        .with_context(|| format!("read source {}", request.source.display()))?;
    debug!(
        rows = source.height(),
        missing = source.missing_count(),
        "Source cells to fill"
    );

    let target = std::fs::read(&request.target)
        .with_context(|| format!("read target {}", request.target.display()))?;
    debug!(bytes = target.len(), "Read target workbook");

    let options = TransferOptions::from_config(&request.config);
    let outcome = transfer(&source, &target, &mapping, &options)?;

    let written_to = if request.dry_run {
        info!("Dry run, output not written");
        None
    } else {
        let path = resolve_output_path(request.output.as_deref(), &request.config);
        outcome
            .document
            .write_to(&path)
            .with_context(|| format!("write output {}", path.display()))?;
        info!(path = %path.display(), bytes = outcome.document.bytes.len(), "Wrote output workbook");
        Some(path)
    };

    info!(elapsed_ms = started.elapsed().as_millis(), "Run finished");
    Ok(TransferRun {
        source_rows: source.height(),
        outcome,
        written_to,
    })
}
