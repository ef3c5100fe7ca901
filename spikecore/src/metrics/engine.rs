use std::collections::BTreeMap;

use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::algorithm::linalg::FeatureRows;
use crate::data::features::PcFeatureSet;
use crate::data::spikes::SpikeRecordSet;
use crate::data::templates::TemplateSet;
use crate::error::DataError;
use crate::metrics::params::MetricsParams;
use crate::metrics::pc::{unit_feature_rows, PcMetrics};
use crate::metrics::peak_channel::{channel_neighborhood, cluster_peak_channels, template_peak_channels};
use crate::metrics::spike_train::{
    amplitude_cutoff, firing_rate, isi_violations, presence_ratio, AmplitudeCutoffOpts, RecordingSpan,
};
use crate::metrics::value::MetricValue;

/// Read-only arrays the engine works on.
///
/// `features: None` disables the PC-based metrics; they are then reported as undefined.
#[derive(Clone, Copy, Debug)]
pub struct EngineInput<'a> {
    pub spikes: &'a SpikeRecordSet,
    pub features: Option<&'a PcFeatureSet>,
    pub templates: Option<&'a TemplateSet>,
}

impl<'a> EngineInput<'a> {
    pub fn spikes_only(spikes: &'a SpikeRecordSet) -> Self {
        Self { spikes, features: None, templates: None }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClusterMetrics {
    pub cluster_id: u32,
    pub num_spikes: usize,
    pub firing_rate: MetricValue,
    pub presence_ratio: MetricValue,
    pub isi_viol: MetricValue,
    pub isi_violation_count: usize,
    pub amplitude_cutoff: f64,
    pub pc: PcMetrics,
}

/// Per-cluster metrics for every cluster present in `input.spikes`, ascending by id.
///
/// Clusters are independent and evaluated in parallel; subsampling is seeded per
/// cluster, so the result does not depend on scheduling.
pub fn calculate_metrics(input: &EngineInput, params: &MetricsParams) -> Result<Vec<ClusterMetrics>, DataError> {
    let spikes = input.spikes;
    if let Some(features) = input.features {
        features.validate_templates(spikes.templates())?;
    }

    let groups = spikes.group_by_cluster();
    let span = RecordingSpan::new(spikes.max_time(), params.recording_duration);
    let amp_opts = AmplitudeCutoffOpts {
        num_bins: params.amplitude_histogram_bins,
        smoothing_sigma: params.amplitude_smoothing_sigma,
        cap: params.amplitude_cutoff_cap,
        min_spikes: params.min_spikes_for_amplitude_cutoff,
    };
    let pc_ctx = input.features.map(|f| PcContext::build(spikes, f, input.templates, &groups));

    let clusters: Vec<(u32, &Vec<usize>)> = groups.iter().map(|(&c, idx)| (c, idx)).collect();
    let metrics = clusters.par_iter().map(|&(cluster_id, idx)| {
        let train = spikes.train(idx);
        let isi = isi_violations(&train, span, params.isi_threshold, params.min_isi);
        let pc = match &pc_ctx {
            Some(ctx) => ctx.metrics_for(cluster_id, spikes, params),
            None => PcMetrics::undefined(),
        };

        ClusterMetrics {
            cluster_id,
            num_spikes: idx.len(),
            firing_rate: firing_rate(idx.len(), span),
            presence_ratio: presence_ratio(&train, span, params.presence_ratio_bins),
            isi_viol: isi.rate,
            isi_violation_count: isi.num_violations,
            amplitude_cutoff: amplitude_cutoff(&spikes.amplitudes_of(idx), &amp_opts),
            pc,
        }
    }).collect();

    Ok(metrics)
}

#[inline]
fn subsample_seed(seed: u64, cluster_id: u32) -> u64 {
    seed ^ (cluster_id as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Shared, precomputed state for the PC metrics.
struct PcContext<'a> {
    features: &'a PcFeatureSet,
    cluster_peaks: BTreeMap<u32, u32>,
    // spike indices per cluster that have a feature row
    covered: BTreeMap<u32, Vec<usize>>,
    max_channel: u32,
}

impl<'a> PcContext<'a> {
    fn build(
        spikes: &SpikeRecordSet,
        features: &'a PcFeatureSet,
        templates: Option<&TemplateSet>,
        groups: &BTreeMap<u32, Vec<usize>>,
    ) -> Self {
        let template_peaks = template_peak_channels(spikes, features, templates);
        let cluster_peaks = cluster_peak_channels(groups, spikes.templates(), &template_peaks);
        let covered: BTreeMap<u32, Vec<usize>> = groups
            .iter()
            .map(|(&c, idx)| (c, idx.iter().copied().filter(|&s| features.row_of(s).is_some()).collect()))
            .collect();
        Self { features, cluster_peaks, covered, max_channel: features.max_channel() }
    }

    fn metrics_for(
        &self,
        cluster_id: u32,
        spikes: &SpikeRecordSet,
        params: &MetricsParams,
    ) -> PcMetrics {
        let n_unit = self.covered.get(&cluster_id).map_or(0, Vec::len);
        if n_unit <= params.min_num_pcs {
            debug!("cluster {}: {} spikes with features, skipping PC metrics", cluster_id, n_unit);
            return PcMetrics::undefined();
        }
        let Some(&peak) = self.cluster_peaks.get(&cluster_id) else {
            return PcMetrics::undefined();
        };

        let neighborhood = channel_neighborhood(peak, params.num_channels_to_compare, self.max_channel);
        let channels: Vec<u32> = neighborhood.clone().collect();
        let scale = if n_unit > params.max_spikes_for_unit {
            params.max_spikes_for_unit as f64 / n_unit as f64
        } else {
            1.0
        };

        let mut rng = StdRng::seed_from_u64(subsample_seed(params.random_seed, cluster_id));
        let mut unit: Option<FeatureRows> = None;
        let mut others = FeatureRows::new(self.features.n_pcs() * channels.len());

        for (&other, other_peak) in &self.cluster_peaks {
            if !neighborhood.contains(other_peak) { continue; }
            let Some(idx) = self.covered.get(&other) else { continue };
            let subsample = if other == cluster_id {
                n_unit.min(params.max_spikes_for_unit)
            } else {
                (idx.len() as f64 * scale) as usize
            };
            match unit_feature_rows(idx, spikes.templates(), self.features, &channels, subsample, &mut rng) {
                Some(rows) if other == cluster_id => unit = Some(rows),
                Some(rows) => others.extend(&rows),
                None => {}
            }
        }

        let Some(unit) = unit else {
            debug!("cluster {}: templates do not cover channels {:?}", cluster_id, neighborhood);
            return PcMetrics::undefined();
        };
        if unit.len() + others.len() <= params.min_num_pcs {
            return PcMetrics::undefined();
        }

        PcMetrics::compute(&unit, &others, params.max_spikes_for_nn, params.n_neighbors)
    }
}
