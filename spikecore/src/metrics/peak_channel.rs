use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use itertools::Itertools;

use crate::algorithm::histogram::argmax;
use crate::data::features::PcFeatureSet;
use crate::data::spikes::SpikeRecordSet;
use crate::data::templates::TemplateSet;

/// Peak channel of every template used by at least one spike.
///
/// Uses the template waveform when one is loaded, otherwise the feature channel with
/// the largest mean first-PC projection over the template's spikes.
pub fn template_peak_channels(
    spikes: &SpikeRecordSet,
    features: &PcFeatureSet,
    templates: Option<&TemplateSet>,
) -> BTreeMap<u32, u32> {
    let mut by_template: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    for (i, &t) in spikes.templates().iter().enumerate() {
        by_template.entry(t).or_default().push(i);
    }

    by_template
        .into_iter()
        .filter_map(|(t, idx)| {
            let from_waveform = templates.and_then(|ts| ts.peak_channel(t)).map(|c| c as u32);
            let ch = from_waveform.or_else(|| pc_peak_channel(features, t, &idx))?;
            Some((t, ch))
        })
        .collect()
}

fn pc_peak_channel(features: &PcFeatureSet, template: u32, spike_idx: &[usize]) -> Option<u32> {
    if spike_idx.is_empty() || template as usize >= features.n_templates() || features.n_pcs() == 0 {
        return None;
    }
    let mut sums = vec![0.0f64; features.n_slots()];
    let mut covered = 0usize;
    for row in spike_idx.iter().filter_map(|&s| features.row_of(s)) {
        covered += 1;
        for (slot, acc) in sums.iter_mut().enumerate() {
            *acc += features.value(row, 0, slot) as f64;
        }
    }
    if covered == 0 {
        return None;
    }
    let slot = argmax(&sums)?;
    Some(features.template_channels(template)[slot])
}

/// Median peak channel over the distinct templates of each cluster.
pub fn cluster_peak_channels(
    groups: &BTreeMap<u32, Vec<usize>>,
    spike_templates: &[u32],
    template_peaks: &BTreeMap<u32, u32>,
) -> BTreeMap<u32, u32> {
    groups
        .iter()
        .filter_map(|(&cid, idx)| {
            let peaks: Vec<u32> = idx
                .iter()
                .map(|&i| spike_templates[i])
                .sorted_unstable()
                .dedup()
                .filter_map(|t| template_peaks.get(&t).copied())
                .sorted_unstable()
                .collect();
            median_channel(&peaks).map(|ch| (cid, ch))
        })
        .collect()
}

/// Median, rounding toward zero for an even count.
fn median_channel(sorted: &[u32]) -> Option<u32> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    if n % 2 == 1 {
        Some(sorted[n / 2])
    } else {
        Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2)
    }
}

/// Channels within `(num_channels - 1) / 2` of `peak`, clipped to `[0, max_channel]`.
pub fn channel_neighborhood(peak: u32, num_channels: usize, max_channel: u32) -> RangeInclusive<u32> {
    let half = u32::try_from(num_channels.saturating_sub(1) / 2).unwrap_or(u32::MAX);
    let down = peak.min(half);
    let up = if peak.saturating_add(half) > max_channel { max_channel.saturating_sub(peak) } else { half };
    (peak - down)..=peak.saturating_add(up)
}
