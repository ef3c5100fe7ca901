use crate::error::DataError;

/// Per-spike principal-component projections.
///
/// `features` is laid out `[row][pc][slot]` (row-major, as written by the sorter);
/// `channel_index` is `[template][slot]` and maps each feature slot of a template
/// back to a recording channel (position in the channel map).
///
/// Without a spike index, row `i` belongs to spike `i` and every spike has a row.
/// With one, row `i` belongs to spike `spike_index[i]` and only those spikes are covered.
#[derive(Clone, Debug)]
pub struct PcFeatureSet {
    n_spikes: usize,
    n_pcs: usize,
    n_slots: usize,
    n_templates: usize,
    features: Vec<f32>,
    channel_index: Vec<u32>,
    spike_index: Option<Vec<usize>>,
}

impl PcFeatureSet {
    pub fn new(
        features: Vec<f32>,
        n_spikes: usize,
        n_pcs: usize,
        n_slots: usize,
        channel_index: Vec<u32>,
    ) -> Result<Self, DataError> {
        let expected = n_spikes * n_pcs * n_slots;
        if features.len() != expected {
            return Err(DataError::Shape {
                what: "pc_features",
                shape: vec![n_spikes, n_pcs, n_slots],
                expected,
                found: features.len(),
            });
        }
        if n_slots == 0 || channel_index.len() % n_slots != 0 {
            return Err(DataError::Shape {
                what: "pc_feature_ind",
                shape: vec![channel_index.len() / n_slots.max(1), n_slots],
                expected: (channel_index.len() / n_slots.max(1)) * n_slots,
                found: channel_index.len(),
            });
        }
        let n_templates = channel_index.len() / n_slots;

        Ok(Self { n_spikes, n_pcs, n_slots, n_templates, features, channel_index, spike_index: None })
    }

    /// Features for a subsample of spikes; `spike_index[row]` is the spike of each row.
    ///
    /// Indices must be strictly ascending.
    pub fn with_spike_index(mut self, spike_index: Vec<usize>) -> Result<Self, DataError> {
        if spike_index.len() != self.n_spikes {
            return Err(DataError::LengthMismatch {
                field: "pc_feature_spike_index",
                expected: self.n_spikes,
                found: spike_index.len(),
            });
        }
        if let Some(row) = spike_index.windows(2).position(|w| w[0] >= w[1]) {
            return Err(DataError::UnsortedIndex { field: "pc_feature_spike_index", position: row + 1 });
        }
        self.spike_index = Some(spike_index);
        Ok(self)
    }

    /// Checks the rows against the spike record set: every covered spike exists and
    /// its template has an entry in the channel index.
    pub fn validate_templates(&self, spike_templates: &[u32]) -> Result<(), DataError> {
        match &self.spike_index {
            None if spike_templates.len() != self.n_spikes => {
                return Err(DataError::LengthMismatch {
                    field: "pc_features",
                    expected: spike_templates.len(),
                    found: self.n_spikes,
                });
            }
            Some(index) => {
                if let Some(&spike) = index.last().filter(|&&s| s >= spike_templates.len()) {
                    return Err(DataError::SpikeOutOfRange { spike, n_spikes: spike_templates.len() });
                }
            }
            None => {}
        }
        for spike in self.covered_spikes() {
            let template = spike_templates[spike];
            if template as usize >= self.n_templates {
                return Err(DataError::TemplateOutOfRange {
                    spike,
                    template,
                    n_templates: self.n_templates,
                });
            }
        }
        Ok(())
    }

    /// Number of feature rows.
    pub fn n_spikes(&self) -> usize {
        self.n_spikes
    }

    pub fn is_subsampled(&self) -> bool {
        self.spike_index.is_some()
    }

    /// Feature row of `spike`, if the spike is covered.
    #[inline]
    pub fn row_of(&self, spike: usize) -> Option<usize> {
        match &self.spike_index {
            None => (spike < self.n_spikes).then_some(spike),
            Some(index) => index.binary_search(&spike).ok(),
        }
    }

    /// Spikes that have a feature row, ascending.
    pub fn covered_spikes(&self) -> Box<dyn Iterator<Item = usize> + '_> {
        match &self.spike_index {
            None => Box::new(0..self.n_spikes),
            Some(index) => Box::new(index.iter().copied()),
        }
    }

    pub fn n_pcs(&self) -> usize {
        self.n_pcs
    }

    pub fn n_slots(&self) -> usize {
        self.n_slots
    }

    pub fn n_templates(&self) -> usize {
        self.n_templates
    }

    /// Projection of feature row `row` (see [`PcFeatureSet::row_of`]).
    #[inline]
    pub fn value(&self, row: usize, pc: usize, slot: usize) -> f32 {
        self.features[(row * self.n_pcs + pc) * self.n_slots + slot]
    }

    /// Channels covered by a template's feature slots.
    #[inline]
    pub fn template_channels(&self, template: u32) -> &[u32] {
        let t = template as usize;
        &self.channel_index[t * self.n_slots..(t + 1) * self.n_slots]
    }

    /// Feature slot of `channel` for `template`, if the template covers it.
    pub fn slot_of(&self, template: u32, channel: u32) -> Option<usize> {
        self.template_channels(template).iter().position(|&c| c == channel)
    }

    /// Highest channel referenced by any template.
    pub fn max_channel(&self) -> u32 {
        self.channel_index.iter().copied().max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indexing_layout() {
        // 2 spikes, 2 pcs, 3 slots
        let features: Vec<f32> = (0..12).map(|v| v as f32).collect();
        let set = PcFeatureSet::new(features, 2, 2, 3, vec![4, 5, 6]).unwrap();
        assert_eq!(set.value(0, 0, 0), 0.0);
        assert_eq!(set.value(0, 1, 2), 5.0);
        assert_eq!(set.value(1, 0, 1), 7.0);
        assert_eq!(set.template_channels(0), &[4, 5, 6]);
        assert_eq!(set.slot_of(0, 6), Some(2));
        assert_eq!(set.slot_of(0, 7), None);
        assert_eq!(set.max_channel(), 6);
    }

    #[test]
    fn test_shape_errors() {
        assert!(PcFeatureSet::new(vec![0.0; 5], 2, 2, 3, vec![0, 1, 2]).is_err());
        let set = PcFeatureSet::new(vec![0.0; 12], 2, 2, 3, vec![0, 1, 2]).unwrap();
        assert!(set.validate_templates(&[0, 0]).is_ok());
        assert!(matches!(
            set.validate_templates(&[0, 3]),
            Err(DataError::TemplateOutOfRange { spike: 1, template: 3, .. })
        ));
    }

    #[test]
    fn test_subsampled_rows() {
        // rows for spikes 1 and 4 of a 6-spike recording, 1 pc, 2 slots
        let set = PcFeatureSet::new(vec![1.0, 2.0, 3.0, 4.0], 2, 1, 2, vec![0, 1])
            .unwrap()
            .with_spike_index(vec![1, 4])
            .unwrap();
        assert!(set.is_subsampled());
        assert_eq!(set.row_of(1), Some(0));
        assert_eq!(set.row_of(4), Some(1));
        assert_eq!(set.row_of(0), None);
        assert_eq!(set.row_of(5), None);
        assert_eq!(set.covered_spikes().collect::<Vec<_>>(), vec![1, 4]);
        assert_eq!(set.value(set.row_of(4).unwrap(), 0, 1), 4.0);

        assert!(set.validate_templates(&[0; 6]).is_ok());
        assert!(matches!(
            set.validate_templates(&[0; 4]),
            Err(DataError::SpikeOutOfRange { spike: 4, n_spikes: 4 })
        ));
        // only covered spikes need a valid template
        assert!(set.validate_templates(&[9, 0, 9, 9, 0, 9]).is_ok());
    }

    #[test]
    fn test_spike_index_must_match_rows_and_ascend() {
        let base = PcFeatureSet::new(vec![0.0; 4], 2, 1, 2, vec![0, 1]).unwrap();
        assert!(base.clone().with_spike_index(vec![3]).is_err());
        assert!(matches!(
            base.clone().with_spike_index(vec![3, 3]),
            Err(DataError::UnsortedIndex { position: 1, .. })
        ));
        assert!(base.with_spike_index(vec![0, 3]).is_ok());
    }
}
