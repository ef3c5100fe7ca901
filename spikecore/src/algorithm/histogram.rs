/// Counts per equal-width bin over `[lo, hi]`.
///
/// The right edge belongs to the last bin; values outside the range are ignored.
pub fn histogram(values: &[f64], bins: usize, lo: f64, hi: f64) -> Vec<usize> {
    let mut counts = vec![0usize; bins];
    if bins == 0 || !(hi > lo) || !lo.is_finite() || !hi.is_finite() {
        return counts;
    }
    let scale = bins as f64 / (hi - lo);
    for &v in values {
        if !(v >= lo && v <= hi) { continue; }
        let b = (((v - lo) * scale).floor() as usize).min(bins - 1);
        counts[b] += 1;
    }
    counts
}

/// Probability density per bin (integrates to 1 over `[lo, hi]`), plus the bin width.
pub fn density_histogram(values: &[f64], bins: usize, lo: f64, hi: f64) -> (Vec<f64>, f64) {
    let counts = histogram(values, bins, lo, hi);
    let total: usize = counts.iter().sum();
    let width = if bins > 0 { (hi - lo) / bins as f64 } else { 0.0 };
    if total == 0 || width <= 0.0 {
        return (vec![0.0; bins], width);
    }
    let norm = 1.0 / (total as f64 * width);
    (counts.into_iter().map(|c| c as f64 * norm).collect(), width)
}

/// Index into `0..n` under symmetric reflection (`d c b a | a b c d | d c b a`).
#[inline]
fn reflect_index(i: isize, n: usize) -> usize {
    let period = 2 * n as isize;
    let m = i.rem_euclid(period);
    if m >= n as isize { (period - 1 - m) as usize } else { m as usize }
}

/// Normalized Gaussian kernel with radius `round(truncate * sigma)`.
fn gaussian_kernel_1d(sigma: f64, truncate: f64) -> Vec<f64> {
    let radius = (truncate * sigma + 0.5) as isize;
    let two_s2 = 2.0 * sigma * sigma;
    let mut w: Vec<f64> = (-radius..=radius)
        .map(|dx| {
            let x = dx as f64;
            (-x * x / two_s2).exp()
        })
        .collect();
    let sum: f64 = w.iter().sum();
    if sum > 0.0 {
        for v in &mut w { *v /= sum; }
    }
    w
}

/// 1D Gaussian smoothing with reflected boundaries.
pub fn gaussian_filter1d(y: &[f64], sigma: f64, truncate: f64) -> Vec<f64> {
    let n = y.len();
    if n == 0 || !(sigma > 0.0) {
        return y.to_vec();
    }
    let k = gaussian_kernel_1d(sigma, truncate);
    let rad = (k.len() / 2) as isize;

    (0..n)
        .map(|i| {
            k.iter()
                .enumerate()
                .map(|(off, &w)| w * y[reflect_index(i as isize + off as isize - rad, n)])
                .sum()
        })
        .collect()
}

/// First index of the maximum (NaN never wins).
pub fn argmax(y: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in y.iter().enumerate() {
        match best {
            Some((_, b)) if !(v > b) => {}
            _ if v.is_nan() => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram_edges() {
        let counts = histogram(&[0.0, 0.5, 1.0, 2.0, -0.1], 2, 0.0, 1.0);
        // 1.0 falls into the last bin, 2.0 and -0.1 are outside
        assert_eq!(counts, vec![1, 2]);
    }

    #[test]
    fn test_density_integrates_to_one() {
        let values: Vec<f64> = (0..100).map(|i| i as f64 / 10.0).collect();
        let (pdf, width) = density_histogram(&values, 7, 0.0, 9.9);
        let area: f64 = pdf.iter().sum::<f64>() * width;
        assert!((area - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_reflect_index() {
        assert_eq!(reflect_index(-1, 4), 0);
        assert_eq!(reflect_index(-2, 4), 1);
        assert_eq!(reflect_index(4, 4), 3);
        assert_eq!(reflect_index(5, 4), 2);
        assert_eq!(reflect_index(2, 4), 2);
    }

    #[test]
    fn test_gaussian_filter_preserves_mass_and_constants() {
        let flat = vec![2.0; 10];
        let smoothed = gaussian_filter1d(&flat, 3.0, 4.0);
        for v in smoothed {
            assert!((v - 2.0).abs() < 1e-9);
        }

        let mut spike = vec![0.0; 41];
        spike[20] = 1.0;
        let smoothed = gaussian_filter1d(&spike, 3.0, 4.0);
        let sum: f64 = smoothed.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert_eq!(argmax(&smoothed), Some(20));
    }

    #[test]
    fn test_argmax_first_wins() {
        assert_eq!(argmax(&[1.0, 3.0, 3.0, 2.0]), Some(1));
        assert_eq!(argmax(&[]), None);
    }
}
