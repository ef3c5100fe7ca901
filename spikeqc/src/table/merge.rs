use std::collections::BTreeSet;
use std::iter;
use std::path::Path;

use log::{info, warn};

use crate::error::QcError;
use crate::params::MergeSuffixes;
use crate::table::csv_io::read_csv;
use crate::table::frame::{Cell, MetricsTable};

/// Suffixes appended to a column name present in both tables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SuffixPolicy {
    pub metrics: String,
    pub waveform: String,
}

impl Default for SuffixPolicy {
    fn default() -> Self {
        SuffixPolicy::from(&MergeSuffixes::default())
    }
}

impl From<&MergeSuffixes> for SuffixPolicy {
    fn from(s: &MergeSuffixes) -> Self {
        Self { metrics: s.quality_metrics.clone(), waveform: s.waveform_metrics.clone() }
    }
}

impl SuffixPolicy {
    /// Output names for both column sets; only shared names are suffixed.
    pub fn disambiguate(&self, metrics: &[String], waveform: &[String]) -> (Vec<String>, Vec<String>) {
        let shared: BTreeSet<&str> = metrics
            .iter()
            .filter(|c| waveform.contains(c))
            .map(String::as_str)
            .collect();
        let rename = |cols: &[String], suffix: &str| -> Vec<String> {
            cols.iter()
                .map(|c| if shared.contains(c.as_str()) { format!("{c}{suffix}") } else { c.clone() })
                .collect()
        };
        (rename(metrics, &self.metrics), rename(waveform, &self.waveform))
    }
}

/// Outer join on unit id. Rows present in one table only get missing cells for the
/// other table's columns. A waveform table without rows leaves `metrics` unchanged.
pub fn merge_tables(metrics: &MetricsTable, waveform: &MetricsTable, suffixes: &SuffixPolicy) -> MetricsTable {
    if waveform.is_empty() {
        return metrics.clone();
    }

    let (left, right) = suffixes.disambiguate(metrics.columns(), waveform.columns());
    let (n_left, n_right) = (left.len(), right.len());
    let mut merged = MetricsTable::new(metrics.key(), left.into_iter().chain(right).collect());

    let ids: BTreeSet<u32> = metrics.unit_ids().chain(waveform.unit_ids()).collect();
    for id in ids {
        let mut cells = Vec::with_capacity(n_left + n_right);
        match metrics.row(id) {
            Some(r) => cells.extend_from_slice(r),
            None => cells.extend(iter::repeat(Cell::Missing).take(n_left)),
        }
        match waveform.row(id) {
            Some(r) => cells.extend_from_slice(r),
            None => cells.extend(iter::repeat(Cell::Missing).take(n_right)),
        }
        merged.insert_unchecked(id, cells);
    }
    merged
}

/// Merges the waveform-metrics CSV at `path` into `metrics`, if there is one.
///
/// An absent file, or one without a usable key column, yields `metrics` as is.
pub fn merge_waveform_metrics(
    metrics: MetricsTable,
    path: &Path,
    suffixes: &SuffixPolicy,
) -> Result<MetricsTable, QcError> {
    if !path.is_file() {
        info!("No waveform metrics at {}; writing quality metrics only", path.display());
        return Ok(metrics);
    }
    match read_csv(path, metrics.key()) {
        Ok(waveform) => Ok(merge_tables(&metrics, &waveform, suffixes)),
        Err(e) if e.is_schema_mismatch() => {
            warn!("Ignoring waveform metrics at {}: {}", path.display(), e);
            Ok(metrics)
        }
        Err(e) => Err(e),
    }
}
