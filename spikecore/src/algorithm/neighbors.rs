use std::collections::BinaryHeap;

use ordered_float::OrderedFloat;
use rayon::prelude::*;

use crate::algorithm::linalg::{squared_euclidean, FeatureRows};

/// Indices of the `k` nearest other rows for every row (exact, brute force).
///
/// The query row itself is never reported. Neighbours come closest first; ties
/// resolve to the lower index.
pub fn k_nearest_neighbors(rows: &FeatureRows, k: usize) -> Vec<Vec<usize>> {
    let n = rows.len();
    if k == 0 || n == 0 {
        return vec![Vec::new(); n];
    }

    (0..n).into_par_iter().map(|i| {
        let q = rows.row(i);
        // max-heap on (distance, index): the top is the current worst neighbour
        let mut heap: BinaryHeap<(OrderedFloat<f64>, usize)> = BinaryHeap::with_capacity(k + 1);
        for j in 0..n {
            if j == i { continue; }
            let d = OrderedFloat(squared_euclidean(q, rows.row(j)));
            if heap.len() < k {
                heap.push((d, j));
            } else if let Some(&worst) = heap.peek() {
                if (d, j) < worst {
                    heap.pop();
                    heap.push((d, j));
                }
            }
        }
        heap.into_sorted_vec().into_iter().map(|(_, j)| j).collect()
    }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neighbors_on_a_line() {
        let rows = FeatureRows::from_rows(1, &[vec![0.0], vec![1.0], vec![3.0], vec![10.0]]);
        let nn = k_nearest_neighbors(&rows, 2);
        assert_eq!(nn[0], vec![1, 2]);
        assert_eq!(nn[1], vec![0, 2]);
        assert_eq!(nn[2], vec![1, 0]);
        assert_eq!(nn[3], vec![2, 1]);
    }

    #[test]
    fn test_k_larger_than_population() {
        let rows = FeatureRows::from_rows(2, &[vec![0.0, 0.0], vec![1.0, 1.0]]);
        let nn = k_nearest_neighbors(&rows, 5);
        assert_eq!(nn, vec![vec![1], vec![0]]);
        assert!(k_nearest_neighbors(&rows, 0).iter().all(|v| v.is_empty()));
    }
}
