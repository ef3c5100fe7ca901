// data module
pub mod data {
    pub mod spikes;
    pub mod features;
    pub mod templates;
}

// algorithm module
pub mod algorithm {
    pub mod histogram;
    pub mod linalg;
    pub mod neighbors;
}

// metrics module
pub mod metrics {
    pub mod value;
    pub mod params;
    pub mod spike_train;
    pub mod peak_channel;
    pub mod pc;
    pub mod engine;
}

pub mod error;

// Re-export commonly used types
pub use data::features::PcFeatureSet;
pub use data::spikes::SpikeRecordSet;
pub use data::templates::TemplateSet;
pub use error::DataError;
pub use metrics::engine::{calculate_metrics, ClusterMetrics, EngineInput};
pub use metrics::params::MetricsParams;
pub use metrics::value::MetricValue;
