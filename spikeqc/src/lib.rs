// data module
pub mod data {
    pub mod sorting;
    pub mod source;
}

// table module
pub mod table {
    pub mod frame;
    pub mod assemble;
    pub mod csv_io;
    pub mod merge;
}

pub mod availability;
pub mod batch;
pub mod error;
pub mod params;
pub mod run;

// Re-export commonly used types
pub use availability::{resolve_pc_features, PcAvailability};
pub use data::source::{InMemorySource, JsonDirectorySource, SortingSource};
pub use error::{LoadError, QcError};
pub use params::{QualityMetricsArgs, QualityMetricsParams};
pub use run::{calculate_quality_metrics, RunFailure, RunSummary};
pub use table::frame::{Cell, MetricsTable};
pub use table::merge::SuffixPolicy;
