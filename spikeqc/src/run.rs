use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::info;
use serde::{Deserialize, Serialize};
use spikecore::{calculate_metrics, EngineInput};
use thiserror::Error;

use crate::availability::resolve_pc_features;
use crate::data::source::SortingSource;
use crate::error::QcError;
use crate::params::QualityMetricsArgs;
use crate::table::assemble::assemble_metrics_table;
use crate::table::csv_io::write_csv;
use crate::table::frame::MetricsTable;
use crate::table::merge::{merge_waveform_metrics, SuffixPolicy};

/// What a run reports to its caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Wall-clock seconds.
    pub execution_time: f64,
    /// `None` when the run failed before writing.
    pub quality_metrics_output_file: Option<PathBuf>,
}

/// A run that aborted; no output file was written.
#[derive(Error, Debug)]
#[error("quality metrics failed after {execution_time:.3} s: {error}")]
pub struct RunFailure {
    pub execution_time: f64,
    #[source]
    pub error: QcError,
}

impl RunFailure {
    pub fn summary(&self) -> RunSummary {
        RunSummary { execution_time: self.execution_time, quality_metrics_output_file: None }
    }
}

/// Run summary plus the parameters it was produced with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    #[serde(flatten)]
    pub summary: RunSummary,
    pub input_parameters: QualityMetricsArgs,
}

/// Loads, computes, assembles and merges; nothing is written.
pub fn compute_metrics_table(args: &QualityMetricsArgs, source: &dyn SortingSource) -> Result<MetricsTable, QcError> {
    let params = &args.quality_metrics_params;

    info!("Loading data from {}", source.describe());
    let availability = resolve_pc_features(params.include_pc_metrics, || source.load_pc_features())?;
    let sorting = source.load_sorting()?;
    sorting.check_channels(availability.features())?;
    info!(
        "{} spikes, {} units ({} good)",
        sorting.spikes.len(),
        sorting.units.len(),
        sorting.count_quality("good")
    );

    let input = EngineInput {
        spikes: &sorting.spikes,
        features: availability.features(),
        templates: sorting.templates.as_ref(),
    };
    let metrics = calculate_metrics(&input, &params.metrics)?;
    let table = assemble_metrics_table(&metrics)?;

    merge_waveform_metrics(
        table,
        &args.waveform_metrics.waveform_metrics_file,
        &SuffixPolicy::from(&args.merge_suffixes),
    )
}

/// Full run for one dataset: computes the merged table and writes it to
/// `quality_metrics_output_file`.
pub fn calculate_quality_metrics(
    args: &QualityMetricsArgs,
    source: &dyn SortingSource,
) -> Result<RunSummary, RunFailure> {
    let start = Instant::now();

    let result = compute_metrics_table(args, source).and_then(|table| {
        let output = args.output_file();
        info!("Saving data to {}", output.display());
        write_csv(&table, output)?;
        Ok(output.to_path_buf())
    });

    let execution_time = start.elapsed().as_secs_f64();
    info!("Total time: {:.2} seconds", execution_time);

    match result {
        Ok(path) => Ok(RunSummary { execution_time, quality_metrics_output_file: Some(path) }),
        Err(error) => Err(RunFailure { execution_time, error }),
    }
}

pub fn write_output_json(path: &Path, summary: &RunSummary, args: &QualityMetricsArgs) -> Result<(), QcError> {
    let manifest = RunManifest { summary: summary.clone(), input_parameters: args.clone() };
    let file = File::create(path).map_err(|e| QcError::io(path, e))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &manifest).map_err(|e| QcError::json(path, e))
}
