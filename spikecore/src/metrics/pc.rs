//! Cluster-isolation metrics in principal-component feature space.
//!
//! Every function takes the unit's own feature rows and the pooled rows of the
//! neighbouring units, and returns `MetricValue::Undefined` for degenerate inputs.

use std::collections::BTreeMap;

use nalgebra::DVector;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::algorithm::linalg::{column_means, covariance, mahalanobis_sq, scatter, FeatureRows};
use crate::algorithm::neighbors::k_nearest_neighbors;
use crate::data::features::PcFeatureSet;
use crate::metrics::value::MetricValue;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PcMetrics {
    pub isolation_distance: MetricValue,
    pub l_ratio: MetricValue,
    pub d_prime: MetricValue,
    pub nn_hit_rate: MetricValue,
    pub nn_miss_rate: MetricValue,
}

impl PcMetrics {
    pub fn undefined() -> Self {
        Self::default()
    }

    pub fn compute(unit: &FeatureRows, others: &FeatureRows, max_spikes_for_nn: usize, n_neighbors: usize) -> Self {
        let (isolation_distance, l_ratio) = mahalanobis_metrics(unit, others);
        let d_prime = lda_d_prime(unit, others);
        let (nn_hit_rate, nn_miss_rate) = nearest_neighbors_metrics(unit, others, max_spikes_for_nn, n_neighbors);
        Self { isolation_distance, l_ratio, d_prime, nn_hit_rate, nn_miss_rate }
    }
}

/// Feature rows for a random subsample of one unit's spikes, restricted to `channels`.
///
/// Only spikes with a feature row are drawn. Each row is laid out `[pc][channel]`.
/// Returns `None` when the subsample is empty or one of its templates does not cover
/// every requested channel.
pub fn unit_feature_rows(
    spike_idx: &[usize],
    spike_templates: &[u32],
    features: &PcFeatureSet,
    channels: &[u32],
    subsample: usize,
    rng: &mut StdRng,
) -> Option<FeatureRows> {
    let mut chosen: Vec<usize> = spike_idx.iter().copied().filter(|&s| features.row_of(s).is_some()).collect();
    chosen.shuffle(rng);
    chosen.truncate(subsample);
    if chosen.is_empty() {
        return None;
    }

    let n_pcs = features.n_pcs();
    let mut slots_by_template: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    for &s in &chosen {
        let t = spike_templates[s];
        if slots_by_template.contains_key(&t) { continue; }
        let slots = channels
            .iter()
            .map(|&ch| features.slot_of(t, ch))
            .collect::<Option<Vec<usize>>>()?;
        slots_by_template.insert(t, slots);
    }

    let mut rows = FeatureRows::with_capacity(n_pcs * channels.len(), chosen.len());
    let mut row = Vec::with_capacity(n_pcs * channels.len());
    for &s in &chosen {
        let slots = &slots_by_template[&spike_templates[s]];
        let feature_row = features.row_of(s)?;
        row.clear();
        for pc in 0..n_pcs {
            for &slot in slots {
                row.push(features.value(feature_row, pc, slot) as f64);
            }
        }
        rows.push_row(&row);
    }
    Some(rows)
}

/// Isolation distance and L-ratio from Mahalanobis distances to the unit centroid.
pub fn mahalanobis_metrics(unit: &FeatureRows, others: &FeatureRows) -> (MetricValue, MetricValue) {
    let undefined = (MetricValue::Undefined, MetricValue::Undefined);
    let dims = unit.dims();
    // covariance of dims-dimensional data needs more than dims samples to be full rank
    if unit.len() <= dims || dims == 0 {
        return undefined;
    }
    let n = unit.len().min(others.len());
    if n < 2 {
        return undefined;
    }

    let Some(cov) = covariance(unit) else { return undefined };
    let Some(inv_cov) = cov.try_inverse() else { return undefined };
    let mean = column_means(unit);

    let mut d_other: Vec<f64> = others.rows().map(|r| mahalanobis_sq(r, &mean, &inv_cov)).collect();
    if d_other.iter().any(|d| !d.is_finite()) {
        return undefined;
    }
    d_other.sort_by(|a, b| a.total_cmp(b));

    let Ok(chi2) = ChiSquared::new(dims as f64) else { return undefined };
    let l_ratio = d_other.iter().map(|&d| chi2.sf(d.max(0.0))).sum::<f64>() / unit.len() as f64;
    let isolation_distance = d_other[n - 1];

    (MetricValue::from_f64(isolation_distance), MetricValue::from_f64(l_ratio))
}

/// d-prime along the Fisher linear discriminant separating the unit from the rest.
pub fn lda_d_prime(unit: &FeatureRows, others: &FeatureRows) -> MetricValue {
    if unit.is_empty() || others.is_empty() || unit.dims() == 0 {
        return MetricValue::Undefined;
    }
    let mu1 = column_means(unit);
    let mu0 = column_means(others);
    let sw = scatter(unit, &mu1) + scatter(others, &mu0);
    let Ok(sw_inv) = sw.pseudo_inverse(1e-10) else { return MetricValue::Undefined };
    let w: DVector<f64> = sw_inv * (&mu1 - &mu0);

    let project = |rows: &FeatureRows| -> Vec<f64> {
        rows.rows().map(|r| r.iter().zip(w.iter()).map(|(a, b)| a * b).sum::<f64>()).collect()
    };
    let (m1, v1) = mean_var(&project(unit));
    let (m0, v0) = mean_var(&project(others));

    let spread = (0.5 * (v1 + v0)).sqrt();
    if !(spread > 0.0) {
        return MetricValue::Undefined;
    }
    MetricValue::from_f64((m1 - m0) / spread)
}

/// Mean and population variance.
fn mean_var(x: &[f64]) -> (f64, f64) {
    let n = x.len() as f64;
    let m = x.iter().sum::<f64>() / n;
    let v = x.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / n;
    (m, v)
}

/// Nearest-neighbour hit and miss rates.
///
/// The pooled sample is the unit followed by the others, thinned with a uniform
/// stride down to about `max_spikes_for_nn` rows. `n_neighbors` counts the query
/// spike, so each spike contributes `n_neighbors - 1` neighbours. The hit rate is the
/// fraction of the unit's neighbours that belong to the unit; the miss rate is the
/// fraction of the other spikes' neighbours that do.
pub fn nearest_neighbors_metrics(
    unit: &FeatureRows,
    others: &FeatureRows,
    max_spikes_for_nn: usize,
    n_neighbors: usize,
) -> (MetricValue, MetricValue) {
    let undefined = (MetricValue::Undefined, MetricValue::Undefined);
    let total = unit.len() + others.len();
    let k = n_neighbors.saturating_sub(1);
    if total == 0 || k == 0 {
        return undefined;
    }

    let mut pooled = FeatureRows::with_capacity(unit.dims(), total);
    pooled.extend(unit);
    pooled.extend(others);
    let mut member: Vec<bool> = (0..total).map(|i| i < unit.len()).collect();

    let ratio = max_spikes_for_nn as f64 / total as f64;
    if ratio < 1.0 {
        let stride = 1.0 / ratio;
        let keep: Vec<usize> = (0usize..)
            .map(|i| (i as f64 * stride) as usize)
            .take_while(|&i| i < total - 1)
            .collect();
        pooled = pooled.select(&keep);
        member = keep.iter().map(|&i| member[i]).collect();
    }
    if pooled.len() <= k {
        return undefined;
    }

    let nn = k_nearest_neighbors(&pooled, k);

    let mut unit_hits = 0usize;
    let mut unit_total = 0usize;
    let mut other_hits = 0usize;
    let mut other_total = 0usize;
    for (i, neighbours) in nn.iter().enumerate() {
        let hits = neighbours.iter().filter(|&&j| member[j]).count();
        if member[i] {
            unit_hits += hits;
            unit_total += neighbours.len();
        } else {
            other_hits += hits;
            other_total += neighbours.len();
        }
    }

    let rate = |hits: usize, total: usize| {
        if total == 0 { MetricValue::Undefined } else { MetricValue::Value(hits as f64 / total as f64) }
    };
    (rate(unit_hits, unit_total), rate(other_hits, other_total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};

    fn blob(center: &[f64], n: usize, scale: f64, seed: u64) -> FeatureRows {
        let mut rng = StdRng::seed_from_u64(seed);
        let dims = center.len();
        let mut rows = FeatureRows::with_capacity(dims, n);
        for _ in 0..n {
            let r: Vec<f64> = center.iter().map(|c| c + scale * (rng.gen::<f64>() - 0.5)).collect();
            rows.push_row(&r);
        }
        rows
    }

    #[test]
    fn test_too_few_spikes_gives_undefined_isolation() {
        let unit = blob(&[0.0, 0.0, 0.0, 0.0], 3, 1.0, 0);
        let others = blob(&[5.0, 5.0, 5.0, 5.0], 20, 1.0, 3);
        let (iso, lr) = mahalanobis_metrics(&unit, &others);
        assert_eq!(iso, MetricValue::Undefined);
        assert_eq!(lr, MetricValue::Undefined);
    }

    #[test]
    fn test_separated_clusters_are_well_isolated() {
        let unit = blob(&[0.0, 0.0], 200, 1.0, 0);
        let far = blob(&[20.0, 20.0], 200, 1.0, 11);
        let near = blob(&[0.5, 0.5], 200, 1.0, 23);

        let (iso_far, lr_far) = mahalanobis_metrics(&unit, &far);
        let (iso_near, lr_near) = mahalanobis_metrics(&unit, &near);
        assert!(iso_far.value().unwrap() > iso_near.value().unwrap());
        assert!(lr_far.value().unwrap() < lr_near.value().unwrap());

        let dp_far = lda_d_prime(&unit, &far).value().unwrap();
        let dp_near = lda_d_prime(&unit, &near).value().unwrap();
        assert!(dp_far > dp_near);
        assert!(dp_far > 5.0);
    }

    #[test]
    fn test_isolation_without_others_is_undefined() {
        let unit = blob(&[0.0, 0.0], 50, 1.0, 0);
        let none = FeatureRows::new(2);
        assert_eq!(mahalanobis_metrics(&unit, &none).0, MetricValue::Undefined);
        assert_eq!(lda_d_prime(&unit, &none), MetricValue::Undefined);
    }

    #[test]
    fn test_nearest_neighbors_perfect_separation() {
        let unit = blob(&[0.0, 0.0], 100, 1.0, 0);
        let others = blob(&[50.0, 50.0], 100, 1.0, 5);
        let (hit, miss) = nearest_neighbors_metrics(&unit, &others, 10000, 4);
        assert_eq!(hit, MetricValue::Value(1.0));
        assert_eq!(miss, MetricValue::Value(0.0));

        // thinning keeps the result on separated data
        let (hit, miss) = nearest_neighbors_metrics(&unit, &others, 50, 4);
        assert_eq!(hit, MetricValue::Value(1.0));
        assert_eq!(miss, MetricValue::Value(0.0));
    }

    #[test]
    fn test_nearest_neighbors_needs_neighbours() {
        let unit = blob(&[0.0, 0.0], 2, 1.0, 0);
        let others = FeatureRows::new(2);
        let (hit, miss) = nearest_neighbors_metrics(&unit, &others, 10000, 4);
        assert_eq!(hit, MetricValue::Undefined);
        assert_eq!(miss, MetricValue::Undefined);
    }

    #[test]
    fn test_unit_feature_rows_layout_and_missing_channels() {
        // 2 spikes, 2 pcs, 2 slots; template 0 covers channels 3 and 4
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let features = PcFeatureSet::new(values, 2, 2, 2, vec![3, 4]).unwrap();
        let mut rng = StdRng::seed_from_u64(0);

        let rows = unit_feature_rows(&[0, 1], &[0, 0], &features, &[4], 10, &mut rng).unwrap();
        assert_eq!(rows.dims(), 2);
        assert_eq!(rows.len(), 2);
        let mut firsts: Vec<f64> = rows.rows().map(|r| r[0]).collect();
        firsts.sort_by(|a, b| a.total_cmp(b));
        // pc 0 at channel 4 -> slot 1
        assert_eq!(firsts, vec![2.0, 6.0]);

        assert!(unit_feature_rows(&[0, 1], &[0, 0], &features, &[4, 9], 10, &mut rng).is_none());
        assert!(unit_feature_rows(&[0, 1], &[0, 0], &features, &[4], 0, &mut rng).is_none());
    }
}
