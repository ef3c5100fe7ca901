use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use spikecore::{PcFeatureSet, SpikeRecordSet, TemplateSet};

use crate::data::sorting::{SortingData, UnitInfo};
use crate::error::LoadError;

pub const SORTING_FILE: &str = "sorting.json";
pub const PC_FEATURES_FILE: &str = "pc_features.json";

/// Loader seam between a sorter's output and the metrics run.
///
/// `load_pc_features` must report a missing feature file as
/// [`LoadError::NotFound`]; any other error aborts the run.
pub trait SortingSource {
    /// Short label for logs.
    fn describe(&self) -> String;

    fn load_sorting(&self) -> Result<SortingData, LoadError>;

    fn load_pc_features(&self) -> Result<PcFeatureSet, LoadError>;
}

/// Arrays that are already in memory.
#[derive(Clone, Debug, Default)]
pub struct InMemorySource {
    sorting: Option<SortingData>,
    pc_features: Option<PcFeatureSet>,
}

impl InMemorySource {
    pub fn new(sorting: SortingData) -> Self {
        Self { sorting: Some(sorting), pc_features: None }
    }

    pub fn with_pc_features(mut self, features: PcFeatureSet) -> Self {
        self.pc_features = Some(features);
        self
    }
}

impl SortingSource for InMemorySource {
    fn describe(&self) -> String {
        "in-memory sorting".to_string()
    }

    fn load_sorting(&self) -> Result<SortingData, LoadError> {
        self.sorting
            .clone()
            .ok_or_else(|| LoadError::NotFound { path: PathBuf::from(SORTING_FILE) })
    }

    fn load_pc_features(&self) -> Result<PcFeatureSet, LoadError> {
        self.pc_features
            .clone()
            .ok_or_else(|| LoadError::NotFound { path: PathBuf::from(PC_FEATURES_FILE) })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitRow {
    pub cluster_id: u32,
    pub group: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplatesFile {
    pub n_templates: usize,
    pub n_samples: usize,
    pub n_channels: usize,
    pub data: Vec<f32>,
}

/// Contents of `sorting.json`. Spike times are sample indices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortingFile {
    pub spike_times: Vec<u64>,
    pub spike_clusters: Vec<u32>,
    #[serde(default)]
    pub spike_templates: Option<Vec<u32>>,
    #[serde(default)]
    pub amplitudes: Option<Vec<f64>>,
    #[serde(default)]
    pub channel_map: Vec<u32>,
    #[serde(default)]
    pub cluster_group: Vec<UnitRow>,
    #[serde(default)]
    pub templates: Option<TemplatesFile>,
}

/// Contents of `pc_features.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PcFeaturesFile {
    pub n_spikes: usize,
    pub n_pcs: usize,
    pub n_channels: usize,
    /// `[spike][pc][channel]`
    pub pc_features: Vec<f32>,
    /// `[template][channel]`
    pub pc_feature_ind: Vec<u32>,
    /// Spike of each feature row, when features were extracted for a subsample.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spike_index: Option<Vec<usize>>,
}

/// A sorter output directory holding `sorting.json` and, optionally, `pc_features.json`.
#[derive(Clone, Debug)]
pub struct JsonDirectorySource {
    dir: PathBuf,
    sample_rate: f64,
}

impl JsonDirectorySource {
    pub fn new(dir: impl Into<PathBuf>, sample_rate: f64) -> Self {
        Self { dir: dir.into(), sample_rate }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<T, LoadError> {
        if !self.dir.is_dir() {
            return Err(LoadError::DirectoryMissing { path: self.dir.clone() });
        }
        let path = self.dir.join(name);
        let file = File::open(&path).map_err(|e| LoadError::from_io(&path, e))?;
        serde_json::from_reader(BufReader::new(file)).map_err(|source| LoadError::Parse { path, source })
    }
}

impl SortingSource for JsonDirectorySource {
    fn describe(&self) -> String {
        self.dir.display().to_string()
    }

    fn load_sorting(&self) -> Result<SortingData, LoadError> {
        let raw: SortingFile = self.read_json(SORTING_FILE)?;
        sorting_from_file(raw, self.sample_rate)
    }

    fn load_pc_features(&self) -> Result<PcFeatureSet, LoadError> {
        let raw: PcFeaturesFile = self.read_json(PC_FEATURES_FILE)?;
        let features = PcFeatureSet::new(raw.pc_features, raw.n_spikes, raw.n_pcs, raw.n_channels, raw.pc_feature_ind)?;
        match raw.spike_index {
            Some(index) => Ok(features.with_spike_index(index)?),
            None => Ok(features),
        }
    }
}

fn sorting_from_file(raw: SortingFile, sample_rate: f64) -> Result<SortingData, LoadError> {
    let n = raw.spike_times.len();
    let times: Vec<f64> = raw.spike_times.iter().map(|&s| s as f64 / sample_rate).collect();
    let templates = raw.spike_templates.unwrap_or_else(|| raw.spike_clusters.clone());
    let amplitudes = raw.amplitudes.unwrap_or_else(|| vec![1.0; n]);
    let spikes = SpikeRecordSet::new(times, raw.spike_clusters, templates, amplitudes)?;

    let template_set = match raw.templates {
        Some(t) => Some(TemplateSet::new(t.data, t.n_templates, t.n_samples, t.n_channels)?),
        None => None,
    };

    let mut sorting = SortingData::from_spikes(spikes);
    sorting.channel_map = raw.channel_map;
    sorting.templates = template_set;
    for row in raw.cluster_group {
        match sorting.units.iter_mut().find(|u| u.cluster_id == row.cluster_id) {
            Some(unit) => unit.quality = row.group,
            None => sorting.units.push(UnitInfo { cluster_id: row.cluster_id, quality: row.group }),
        }
    }
    sorting.units.sort_by_key(|u| u.cluster_id);

    Ok(sorting)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn test_sample_indices_become_seconds() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            SORTING_FILE,
            r#"{"spike_times": [300, 600, 30000], "spike_clusters": [2, 2, 7],
                "cluster_group": [{"cluster_id": 7, "group": "noise"}]}"#,
        );
        let source = JsonDirectorySource::new(dir.path(), 30000.0);
        let sorting = source.load_sorting().unwrap();

        let times = sorting.spikes.times();
        assert!((times[0] - 0.01).abs() < 1e-12);
        assert!((times[2] - 1.0).abs() < 1e-12);
        assert_eq!(sorting.spikes.templates(), &[2, 2, 7]);
        assert_eq!(sorting.unit(7).unwrap().quality, "noise");
        assert_eq!(sorting.unit(2).unwrap().quality, "unsorted");
    }

    #[test]
    fn test_subsampled_pc_features() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            PC_FEATURES_FILE,
            r#"{"n_spikes": 2, "n_pcs": 1, "n_channels": 2, "pc_features": [1, 2, 3, 4],
                "pc_feature_ind": [0, 1], "spike_index": [3, 8]}"#,
        );
        let source = JsonDirectorySource::new(dir.path(), 30000.0);
        let features = source.load_pc_features().unwrap();
        assert!(features.is_subsampled());
        assert_eq!(features.row_of(8), Some(1));
        assert_eq!(features.row_of(4), None);
    }

    #[test]
    fn test_missing_pc_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let source = JsonDirectorySource::new(dir.path(), 30000.0);
        assert!(source.load_pc_features().unwrap_err().is_not_found());
    }

    #[test]
    fn test_missing_directory_is_not_downgradable() {
        let dir = tempfile::tempdir().unwrap();
        let source = JsonDirectorySource::new(dir.path().join("absent"), 30000.0);
        match source.load_pc_features() {
            Err(LoadError::DirectoryMissing { .. }) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_mismatched_arrays_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), SORTING_FILE, r#"{"spike_times": [1, 2], "spike_clusters": [0]}"#);
        let source = JsonDirectorySource::new(dir.path(), 30000.0);
        assert!(matches!(source.load_sorting(), Err(LoadError::Data(_))));
    }

    #[test]
    fn test_in_memory_without_features() {
        let spikes = SpikeRecordSet::from_times_and_clusters(vec![0.5], vec![0]).unwrap();
        let source = InMemorySource::new(SortingData::from_spikes(spikes));
        assert!(source.load_sorting().is_ok());
        assert!(source.load_pc_features().unwrap_err().is_not_found());
    }
}
