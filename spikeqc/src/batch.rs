use std::path::PathBuf;

use log::{info, warn};

use crate::data::source::{JsonDirectorySource, SortingSource};
use crate::params::QualityMetricsArgs;
use crate::run::{calculate_quality_metrics, RunFailure, RunSummary};

/// One dataset of a batch.
pub struct BatchJob {
    pub name: String,
    pub args: QualityMetricsArgs,
    pub source: Box<dyn SortingSource>,
}

#[derive(Debug)]
pub struct DatasetOutcome {
    pub name: String,
    pub result: Result<RunSummary, RunFailure>,
}

impl DatasetOutcome {
    pub fn summary(&self) -> RunSummary {
        match &self.result {
            Ok(summary) => summary.clone(),
            Err(failure) => failure.summary(),
        }
    }
}

/// Runs every job in order. A failed job is recorded and the batch moves on.
pub fn run_batch(jobs: Vec<BatchJob>) -> Vec<DatasetOutcome> {
    let total = jobs.len();
    jobs.into_iter()
        .enumerate()
        .map(|(i, job)| {
            info!("[{}/{}] {}", i + 1, total, job.name);
            let result = calculate_quality_metrics(&job.args, job.source.as_ref());
            if let Err(failure) = &result {
                warn!("{}: {}", job.name, failure);
            }
            DatasetOutcome { name: job.name, result }
        })
        .collect()
}

/// Runs one job per sorter output directory, writing `new_metrics.csv` into each.
///
/// Paths that are not directories are skipped with a warning. Every job starts from
/// `template`; only the sorter directory, the output file and the waveform-metrics
/// file are replaced per directory.
pub fn run_directories(dirs: &[PathBuf], template: &QualityMetricsArgs) -> Vec<DatasetOutcome> {
    let jobs = dirs
        .iter()
        .filter(|dir| {
            let ok = dir.is_dir();
            if !ok {
                warn!("Skipping {}: not a directory", dir.display());
            }
            ok
        })
        .map(|dir| {
            let defaults = QualityMetricsArgs::for_sorting_directory(dir);
            let mut args = template.clone();
            args.directories = defaults.directories;
            args.quality_metrics_params.quality_metrics_output_file =
                defaults.quality_metrics_params.quality_metrics_output_file;
            args.waveform_metrics = defaults.waveform_metrics;
            let source = JsonDirectorySource::new(dir, args.ephys_params.sample_rate);
            BatchJob { name: dir.display().to_string(), args, source: Box::new(source) }
        })
        .collect();
    run_batch(jobs)
}
