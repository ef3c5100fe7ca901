use serde::{Deserialize, Serialize};

/// Outcome of a single metric for a single cluster.
///
/// `Undefined` marks a metric that cannot be computed for this cluster (too few
/// spikes, singular covariance, empty comparison set). It is a normal result, not
/// an error, and must never be averaged into downstream aggregates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum MetricValue {
    Value(f64),
    Undefined,
}

impl MetricValue {
    /// Wraps a float, mapping NaN and infinities to `Undefined`.
    #[inline]
    pub fn from_f64(x: f64) -> Self {
        if x.is_finite() { MetricValue::Value(x) } else { MetricValue::Undefined }
    }

    #[inline]
    pub fn value(self) -> Option<f64> {
        match self {
            MetricValue::Value(v) => Some(v),
            MetricValue::Undefined => None,
        }
    }

    #[inline]
    pub fn is_defined(self) -> bool {
        matches!(self, MetricValue::Value(_))
    }

    /// NaN for `Undefined`, for consumers that need a plain float column.
    #[inline]
    pub fn to_f64_or_nan(self) -> f64 {
        self.value().unwrap_or(f64::NAN)
    }
}

impl Default for MetricValue {
    fn default() -> Self {
        MetricValue::Undefined
    }
}

impl From<Option<f64>> for MetricValue {
    fn from(v: Option<f64>) -> Self {
        v.map(MetricValue::from_f64).unwrap_or(MetricValue::Undefined)
    }
}
