//! Metrics computed from spike times and amplitudes alone.

use itertools::{Itertools, MinMaxResult};

use crate::algorithm::histogram::{argmax, density_histogram, gaussian_filter1d, histogram};
use crate::metrics::value::MetricValue;

/// Time span of the recording, in seconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RecordingSpan {
    pub start: f64,
    pub end: f64,
}

impl RecordingSpan {
    /// `[0, duration]`, with `duration` taken from `explicit` or else the latest spike.
    pub fn new(max_spike_time: f64, explicit: Option<f64>) -> Self {
        let end = explicit.unwrap_or(max_spike_time);
        Self { start: 0.0, end }
    }

    #[inline]
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

pub fn firing_rate(num_spikes: usize, span: RecordingSpan) -> MetricValue {
    let d = span.duration();
    if !(d > 0.0) {
        return MetricValue::Undefined;
    }
    MetricValue::from_f64(num_spikes as f64 / d)
}

/// Fraction of `num_bins` equal time bins that contain at least one spike.
pub fn presence_ratio(train: &[f64], span: RecordingSpan, num_bins: usize) -> MetricValue {
    if num_bins == 0 || !(span.duration() > 0.0) {
        return MetricValue::Undefined;
    }
    let counts = histogram(train, num_bins, span.start, span.end);
    let occupied = counts.iter().filter(|&&c| c > 0).count();
    MetricValue::Value(occupied as f64 / num_bins as f64)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IsiViolations {
    /// Violation rate relative to the unit's firing rate (dimensionless).
    pub rate: MetricValue,
    pub num_violations: usize,
}

/// Refractory-period violations of a sorted spike train.
///
/// Spikes closer than or equal to `min_isi` to their predecessor are dropped as
/// duplicates first. A gap is a violation iff it is strictly below `isi_threshold`.
pub fn isi_violations(
    train: &[f64],
    span: RecordingSpan,
    isi_threshold: f64,
    min_isi: f64,
) -> IsiViolations {
    let mut kept: Vec<f64> = Vec::with_capacity(train.len());
    for (i, &t) in train.iter().enumerate() {
        if i > 0 && t - train[i - 1] <= min_isi { continue; }
        kept.push(t);
    }

    let num_spikes = kept.len();
    let num_violations = kept
        .iter()
        .tuple_windows()
        .filter(|(a, b)| *b - *a < isi_threshold)
        .count();

    let violation_time = 2.0 * num_spikes as f64 * (isi_threshold - min_isi);
    let rate = match firing_rate(num_spikes, span).value() {
        Some(total_rate) if num_spikes > 0 && violation_time > 0.0 => {
            MetricValue::from_f64(num_violations as f64 / violation_time / total_rate)
        }
        _ => MetricValue::Undefined,
    };

    IsiViolations { rate, num_violations }
}

#[derive(Clone, Copy, Debug)]
pub struct AmplitudeCutoffOpts {
    pub num_bins: usize,
    pub smoothing_sigma: f64,
    pub cap: f64,
    pub min_spikes: usize,
}

impl Default for AmplitudeCutoffOpts {
    fn default() -> Self {
        Self { num_bins: 500, smoothing_sigma: 3.0, cap: 0.5, min_spikes: 10 }
    }
}

/// Estimated fraction of spikes lost below the detection threshold.
///
/// The smoothed amplitude pdf is mirrored around its peak: the upper-tail mass
/// beyond the point where the pdf falls back to its lowest-bin value stands in for
/// the hidden lower tail. Sparse or flat distributions report `opts.cap`.
pub fn amplitude_cutoff(amplitudes: &[f64], opts: &AmplitudeCutoffOpts) -> f64 {
    if amplitudes.len() < opts.min_spikes.max(1) || opts.num_bins == 0 {
        return opts.cap;
    }
    let (lo, hi) = match amplitudes.iter().copied().minmax_by(|a, b| a.total_cmp(b)) {
        MinMaxResult::MinMax(lo, hi) => (lo, hi),
        _ => return opts.cap,
    };
    if !(hi > lo) || !lo.is_finite() || !hi.is_finite() {
        return opts.cap;
    }

    let (pdf, bin_width) = density_histogram(amplitudes, opts.num_bins, lo, hi);
    let pdf = gaussian_filter1d(&pdf, opts.smoothing_sigma, 4.0);

    let Some(peak) = argmax(&pdf) else { return opts.cap };
    let floor = pdf[0];
    let g = pdf[peak..]
        .iter()
        .position_min_by(|a, b| (*a - floor).abs().total_cmp(&(*b - floor).abs()))
        .map(|i| i + peak)
        .unwrap_or(peak);

    let missing = pdf[g..].iter().sum::<f64>() * bin_width;
    if missing.is_finite() { missing.min(opts.cap) } else { opts.cap }
}
