use std::collections::BTreeMap;

use itertools::Itertools;

use crate::error::DataError;

/// Parallel per-spike arrays as produced by the sorter.
///
/// All four sequences have one entry per detected spike. Times are in seconds.
#[derive(Clone, Debug, Default)]
pub struct SpikeRecordSet {
    times: Vec<f64>,
    clusters: Vec<u32>,
    templates: Vec<u32>,
    amplitudes: Vec<f64>,
}

impl SpikeRecordSet {
    pub fn new(
        times: Vec<f64>,
        clusters: Vec<u32>,
        templates: Vec<u32>,
        amplitudes: Vec<f64>,
    ) -> Result<Self, DataError> {
        let n = times.len();
        let check = |field: &'static str, found: usize| {
            if found == n {
                Ok(())
            } else {
                Err(DataError::LengthMismatch { field, expected: n, found })
            }
        };
        check("spike_clusters", clusters.len())?;
        check("spike_templates", templates.len())?;
        check("amplitudes", amplitudes.len())?;

        Ok(Self { times, clusters, templates, amplitudes })
    }

    /// Convenience constructor when template ids equal cluster ids and amplitudes are unknown.
    pub fn from_times_and_clusters(times: Vec<f64>, clusters: Vec<u32>) -> Result<Self, DataError> {
        let templates = clusters.clone();
        let amplitudes = vec![1.0; times.len()];
        Self::new(times, clusters, templates, amplitudes)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn clusters(&self) -> &[u32] {
        &self.clusters
    }

    pub fn templates(&self) -> &[u32] {
        &self.templates
    }

    pub fn amplitudes(&self) -> &[f64] {
        &self.amplitudes
    }

    /// Distinct cluster ids, ascending.
    pub fn cluster_ids(&self) -> Vec<u32> {
        self.clusters.iter().copied().sorted_unstable().dedup().collect()
    }

    /// Distinct template ids, ascending.
    pub fn template_ids(&self) -> Vec<u32> {
        self.templates.iter().copied().sorted_unstable().dedup().collect()
    }

    /// Latest spike time across all clusters, 0 for an empty set.
    pub fn max_time(&self) -> f64 {
        self.times.iter().copied().fold(0.0, f64::max)
    }

    /// Spike indices per cluster, in record order. Keys iterate ascending.
    pub fn group_by_cluster(&self) -> BTreeMap<u32, Vec<usize>> {
        let mut groups: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
        for (i, &c) in self.clusters.iter().enumerate() {
            groups.entry(c).or_default().push(i);
        }
        groups
    }

    /// Sorted spike train (seconds) for the given spike indices.
    pub fn train(&self, indices: &[usize]) -> Vec<f64> {
        let mut t: Vec<f64> = indices.iter().map(|&i| self.times[i]).collect();
        t.sort_by(|a, b| a.total_cmp(b));
        t
    }

    pub fn amplitudes_of(&self, indices: &[usize]) -> Vec<f64> {
        indices.iter().map(|&i| self.amplitudes[i]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_mismatch_is_rejected() {
        let err = SpikeRecordSet::new(vec![0.1, 0.2], vec![1], vec![1, 1], vec![1.0, 1.0]).unwrap_err();
        assert_eq!(
            err,
            DataError::LengthMismatch { field: "spike_clusters", expected: 2, found: 1 }
        );
    }

    #[test]
    fn test_grouping_is_ordered() {
        let spikes = SpikeRecordSet::from_times_and_clusters(
            vec![0.3, 0.1, 0.2, 0.4],
            vec![7, 2, 7, 2],
        )
        .unwrap();
        let groups = spikes.group_by_cluster();
        let keys: Vec<u32> = groups.keys().copied().collect();
        assert_eq!(keys, vec![2, 7]);
        assert_eq!(groups[&7], vec![0, 2]);
        assert_eq!(spikes.train(&groups[&7]), vec![0.2, 0.3]);
        assert_eq!(spikes.cluster_ids(), vec![2, 7]);
        assert!((spikes.max_time() - 0.4).abs() < 1e-12);
    }
}
