use spikecore::ClusterMetrics;

use crate::error::QcError;
use crate::table::frame::{Cell, MetricsTable};

pub const KEY_COLUMN: &str = "cluster_id";

/// Fixed metric columns, in output order. PC columns are present even when
/// the PC metrics did not run.
pub const METRIC_COLUMNS: [&str; 9] = [
    "firing_rate",
    "presence_ratio",
    "isi_viol",
    "amplitude_cutoff",
    "isolation_distance",
    "l_ratio",
    "d_prime",
    "nn_hit_rate",
    "nn_miss_rate",
];

/// One row per cluster, ascending by cluster id.
pub fn assemble_metrics_table(metrics: &[ClusterMetrics]) -> Result<MetricsTable, QcError> {
    let columns = METRIC_COLUMNS.iter().map(|c| c.to_string()).collect();
    let mut table = MetricsTable::new(KEY_COLUMN, columns);
    for m in metrics {
        table.insert_row(m.cluster_id, row_cells(m))?;
    }
    Ok(table)
}

fn row_cells(m: &ClusterMetrics) -> Vec<Cell> {
    vec![
        m.firing_rate.into(),
        m.presence_ratio.into(),
        m.isi_viol.into(),
        m.amplitude_cutoff.into(),
        m.pc.isolation_distance.into(),
        m.pc.l_ratio.into(),
        m.pc.d_prime.into(),
        m.pc.nn_hit_rate.into(),
        m.pc.nn_miss_rate.into(),
    ]
}
