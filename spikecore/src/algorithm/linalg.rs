use nalgebra::{DMatrix, DVector};

/// Row-major sample matrix: one row per spike, `dims` features per row.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureRows {
    dims: usize,
    data: Vec<f64>,
}

impl FeatureRows {
    pub fn new(dims: usize) -> Self {
        Self { dims, data: Vec::new() }
    }

    pub fn with_capacity(dims: usize, rows: usize) -> Self {
        Self { dims, data: Vec::with_capacity(dims * rows) }
    }

    pub fn from_rows(dims: usize, rows: &[Vec<f64>]) -> Self {
        let mut out = Self::with_capacity(dims, rows.len());
        for r in rows {
            out.push_row(r);
        }
        out
    }

    #[inline]
    pub fn dims(&self) -> usize {
        self.dims
    }

    #[inline]
    pub fn len(&self) -> usize {
        if self.dims == 0 { 0 } else { self.data.len() / self.dims }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn push_row(&mut self, row: &[f64]) {
        debug_assert_eq!(row.len(), self.dims);
        self.data.extend_from_slice(row);
    }

    pub fn extend(&mut self, other: &FeatureRows) {
        debug_assert_eq!(other.dims, self.dims);
        self.data.extend_from_slice(&other.data);
    }

    #[inline]
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.dims..(i + 1) * self.dims]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        self.data.chunks_exact(self.dims.max(1))
    }

    /// Rows at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> FeatureRows {
        let mut out = FeatureRows::with_capacity(self.dims, indices.len());
        for &i in indices {
            out.push_row(self.row(i));
        }
        out
    }
}

pub fn column_means(rows: &FeatureRows) -> DVector<f64> {
    let mut mean = DVector::zeros(rows.dims());
    if rows.is_empty() {
        return mean;
    }
    for r in rows.rows() {
        for (m, &v) in mean.iter_mut().zip(r) {
            *m += v;
        }
    }
    mean / rows.len() as f64
}

/// Sum of outer products of centred rows.
pub fn scatter(rows: &FeatureRows, mean: &DVector<f64>) -> DMatrix<f64> {
    let d = rows.dims();
    let mut s = DMatrix::zeros(d, d);
    let mut centred = DVector::zeros(d);
    for r in rows.rows() {
        for k in 0..d {
            centred[k] = r[k] - mean[k];
        }
        s.ger(1.0, &centred, &centred, 1.0);
    }
    s
}

/// Unbiased sample covariance. `None` with fewer than two rows.
pub fn covariance(rows: &FeatureRows) -> Option<DMatrix<f64>> {
    let n = rows.len();
    if n < 2 {
        return None;
    }
    let mean = column_means(rows);
    Some(scatter(rows, &mean) / (n - 1) as f64)
}

/// Squared Mahalanobis distance of `x` from `mean` under `inv_cov`.
#[inline]
pub fn mahalanobis_sq(x: &[f64], mean: &DVector<f64>, inv_cov: &DMatrix<f64>) -> f64 {
    let diff = DVector::from_iterator(x.len(), x.iter().zip(mean.iter()).map(|(a, b)| a - b));
    diff.dot(&(inv_cov * &diff))
}

#[inline]
pub fn squared_euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}
