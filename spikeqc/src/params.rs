use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use spikecore::MetricsParams;

use crate::error::QcError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityMetricsParams {
    /// Request the PC-based metrics; downgraded at run time if no features are found.
    pub include_pc_metrics: bool,
    pub quality_metrics_output_file: PathBuf,
    #[serde(flatten)]
    pub metrics: MetricsParams,
}

impl Default for QualityMetricsParams {
    fn default() -> Self {
        Self {
            include_pc_metrics: true,
            quality_metrics_output_file: PathBuf::from("metrics.csv"),
            metrics: MetricsParams::default(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Directories {
    pub kilosort_output_directory: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EphysParams {
    /// Hz; converts sample indices to seconds.
    pub sample_rate: f64,
}

impl Default for EphysParams {
    fn default() -> Self {
        Self { sample_rate: 30000.0 }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WaveformMetricsParams {
    pub waveform_metrics_file: PathBuf,
}

/// Column suffixes applied when metrics and waveform tables share a column name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeSuffixes {
    pub quality_metrics: String,
    pub waveform_metrics: String,
}

impl Default for MergeSuffixes {
    fn default() -> Self {
        Self {
            quality_metrics: "_quality_metrics".to_string(),
            waveform_metrics: "_waveform_metrics".to_string(),
        }
    }
}

/// Input parameters of one quality-metrics run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityMetricsArgs {
    pub directories: Directories,
    pub ephys_params: EphysParams,
    pub quality_metrics_params: QualityMetricsParams,
    pub waveform_metrics: WaveformMetricsParams,
    pub merge_suffixes: MergeSuffixes,
}

impl QualityMetricsArgs {
    pub fn from_json_file(path: &Path) -> Result<Self, QcError> {
        let file = File::open(path).map_err(|e| QcError::io(path, e))?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| QcError::json(path, e))
    }

    /// Defaults for a single sorter output directory: metrics are written to
    /// `new_metrics.csv` and merged with `waveform_metrics.csv` from the same directory.
    pub fn for_sorting_directory(dir: &Path) -> Self {
        Self {
            directories: Directories { kilosort_output_directory: dir.to_path_buf() },
            quality_metrics_params: QualityMetricsParams {
                quality_metrics_output_file: dir.join("new_metrics.csv"),
                ..Default::default()
            },
            waveform_metrics: WaveformMetricsParams { waveform_metrics_file: dir.join("waveform_metrics.csv") },
            ..Default::default()
        }
    }

    pub fn output_file(&self) -> &Path {
        &self.quality_metrics_params.quality_metrics_output_file
    }
}
