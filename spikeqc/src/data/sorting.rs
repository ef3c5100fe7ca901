use spikecore::{DataError, PcFeatureSet, SpikeRecordSet, TemplateSet};

/// Upstream metadata of one sorted unit.
#[derive(Clone, Debug, PartialEq)]
pub struct UnitInfo {
    pub cluster_id: u32,
    /// Label assigned by the sorter or curator ("good", "mua", "noise", ...).
    pub quality: String,
}

/// Everything the engine needs from a sorter output, apart from PC features.
#[derive(Clone, Debug)]
pub struct SortingData {
    pub spikes: SpikeRecordSet,
    /// Recording channel of each position used by templates and PC features.
    pub channel_map: Vec<u32>,
    pub units: Vec<UnitInfo>,
    pub templates: Option<TemplateSet>,
}

impl SortingData {
    /// Spikes only; units are derived from the cluster ids and labelled "unsorted".
    pub fn from_spikes(spikes: SpikeRecordSet) -> Self {
        let units = spikes
            .cluster_ids()
            .into_iter()
            .map(|cluster_id| UnitInfo { cluster_id, quality: "unsorted".to_string() })
            .collect();
        Self { spikes, channel_map: Vec::new(), units, templates: None }
    }

    pub fn unit(&self, cluster_id: u32) -> Option<&UnitInfo> {
        self.units.iter().find(|u| u.cluster_id == cluster_id)
    }

    /// Units carrying the given quality label.
    pub fn count_quality(&self, label: &str) -> usize {
        self.units.iter().filter(|u| u.quality == label).count()
    }

    /// Template and feature channels are positions in the channel map; checks that
    /// they stay inside it. An empty channel map is not checked.
    pub fn check_channels(&self, features: Option<&PcFeatureSet>) -> Result<(), DataError> {
        let n_channels = self.channel_map.len();
        if n_channels == 0 {
            return Ok(());
        }
        if let Some(t) = self.templates.as_ref().filter(|t| t.n_channels() > n_channels) {
            return Err(DataError::ChannelOutOfRange {
                what: "templates",
                channel: (t.n_channels() - 1) as u32,
                n_channels,
            });
        }
        if let Some(channel) = features.map(|f| f.max_channel()).filter(|&c| c as usize >= n_channels) {
            return Err(DataError::ChannelOutOfRange { what: "pc_feature_ind", channel, n_channels });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units_from_spikes() {
        let spikes = SpikeRecordSet::from_times_and_clusters(vec![0.1, 0.2, 0.3], vec![4, 1, 4]).unwrap();
        let sorting = SortingData::from_spikes(spikes);
        let ids: Vec<u32> = sorting.units.iter().map(|u| u.cluster_id).collect();
        assert_eq!(ids, vec![1, 4]);
        assert_eq!(sorting.unit(4).unwrap().quality, "unsorted");
        assert!(sorting.unit(2).is_none());
        assert_eq!(sorting.count_quality("unsorted"), 2);
        assert_eq!(sorting.count_quality("good"), 0);
    }

    #[test]
    fn test_channels_must_fit_channel_map() {
        let spikes = SpikeRecordSet::from_times_and_clusters(vec![0.1], vec![0]).unwrap();
        let mut sorting = SortingData::from_spikes(spikes);
        let features = PcFeatureSet::new(vec![0.0; 3], 1, 1, 3, vec![0, 1, 4]).unwrap();

        // no channel map loaded
        assert!(sorting.check_channels(Some(&features)).is_ok());

        sorting.channel_map = vec![10, 11, 12];
        assert!(matches!(
            sorting.check_channels(Some(&features)),
            Err(DataError::ChannelOutOfRange { channel: 4, n_channels: 3, .. })
        ));
        assert!(sorting.check_channels(None).is_ok());

        sorting.templates = Some(TemplateSet::new(vec![0.0; 4], 1, 1, 4).unwrap());
        assert!(matches!(
            sorting.check_channels(None),
            Err(DataError::ChannelOutOfRange { what: "templates", .. })
        ));
    }
}
