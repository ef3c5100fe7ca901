use serde::{Deserialize, Serialize};

/// Numeric parameters of the per-cluster metrics.
///
/// Times are in seconds. Missing fields deserialize to the defaults below.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsParams {
    // Refractory period; gaps strictly below it are violations
    pub isi_threshold: f64,
    // Shortest observable gap; closer spikes are treated as duplicates
    pub min_isi: f64,

    // Channels (centred on the peak channel) used for PC metrics; odd
    pub num_channels_to_compare: usize,
    pub max_spikes_for_unit: usize,
    pub max_spikes_for_nn: usize,
    // Includes the query spike itself
    pub n_neighbors: usize,
    // PC metrics need more than this many spikes, both for the unit and the pooled sample
    pub min_num_pcs: usize,

    pub presence_ratio_bins: usize,

    pub amplitude_histogram_bins: usize,
    pub amplitude_smoothing_sigma: f64,
    pub amplitude_cutoff_cap: f64,
    pub min_spikes_for_amplitude_cutoff: usize,

    /// Recording length; when absent the latest spike time is used.
    pub recording_duration: Option<f64>,
    /// Seed for spike subsampling.
    pub random_seed: u64,
}

impl Default for MetricsParams {
    fn default() -> Self {
        Self {
            isi_threshold: 0.0015,
            min_isi: 0.000166,

            num_channels_to_compare: 13,
            max_spikes_for_unit: 500,
            max_spikes_for_nn: 10000,
            n_neighbors: 4,
            min_num_pcs: 10,

            presence_ratio_bins: 100,

            amplitude_histogram_bins: 500,
            amplitude_smoothing_sigma: 3.0,
            amplitude_cutoff_cap: 0.5,
            min_spikes_for_amplitude_cutoff: 10,

            recording_duration: None,
            random_seed: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params() {
        let params = MetricsParams::default();
        assert!(params.isi_threshold == 0.0015);
        assert!(params.num_channels_to_compare == 13);
        assert!(params.n_neighbors == 4);
        assert!(params.recording_duration.is_none());
    }
}
