//! Chi-square association scores over a counts matrix
//!
//! Each stored cell is rescored as `(observed - expected)^2 / expected`,
//! where the expected weight comes from the matrix marginals under
//! independence. The context marginals can be smoothed by raising them to
//! the `cds` exponent before the grand total is taken, which softens the
//! penalty on rare contexts; `cds = 1` leaves them untouched.
//!
//! Only stored cells are scored. Absent cells stay absent, and a degenerate
//! marginal (an all-zero row or column) flows through as a non-finite score
//! rather than an error, so the caller can see exactly which cells were
//! unscorable.

use crate::sparse::SparseMatrix;

/// Replace every stored weight with its chi-square association score
pub fn chi_square(mut counts: SparseMatrix, cds: f64) -> SparseMatrix {
    let sum_w = counts.row_sums();
    let mut sum_c = counts.col_sums();
    if cds != 1.0 {
        sum_c.mapv_inplace(|total| total.powf(cds));
    }
    let sum_total: f64 = sum_c.sum();
    for row in 0..counts.rows {
        for k in counts.indptr[row]..counts.indptr[row + 1] {
            let expected = sum_w[row] * sum_c[counts.indices[k]] / sum_total;
            let diff = counts.data[k] - expected;
            counts.data[k] = diff * diff / expected;
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scores_match_the_marginal_expectations() {
        // row sums [3, 3], col sums [4, 2], total 6
        let counts = SparseMatrix::from_triplets(
            2,
            2,
            vec![(0, 0, 1.0), (0, 1, 2.0), (1, 0, 3.0)],
        )
        .unwrap();
        let scores = chi_square(counts, 1.0);
        assert_eq!(scores.get(0, 0), Some(0.5));
        assert_eq!(scores.get(0, 1), Some(1.0));
        assert_eq!(scores.get(1, 0), Some(0.5));
        assert_eq!(scores.get(1, 1), None);
        assert_eq!(scores.nnz(), 3);
    }

    #[test]
    fn smoothing_reshapes_the_context_marginals() {
        let counts = SparseMatrix::from_triplets(
            2,
            2,
            vec![(0, 0, 1.0), (0, 1, 2.0), (1, 0, 3.0)],
        )
        .unwrap();
        // cds 2 squares the col sums: [16, 4], total 20
        let scores = chi_square(counts, 2.0);
        let expected00 = 3.0 * 16.0 / 20.0;
        let want = (1.0 - expected00) * (1.0 - expected00) / expected00;
        let got = scores.get(0, 0).unwrap();
        assert!((got - want).abs() < 1e-12, "got {}", got);
    }

    #[test]
    fn zero_expectation_yields_a_non_finite_score() {
        // the explicit zero at (0, 0) zeroes its row and column marginals
        let counts =
            SparseMatrix::from_triplets(2, 2, vec![(0, 0, 0.0), (1, 1, 1.0)]).unwrap();
        let scores = chi_square(counts, 1.0);
        assert!(scores.get(0, 0).unwrap().is_nan());
        assert_eq!(scores.get(1, 1), Some(0.0));
        assert_eq!(scores.nnz(), 2);
    }

    #[test]
    fn stored_zeros_with_live_marginals_score_finite() {
        // (0, 0) stores no weight itself but shares its row and column
        // with real mass, so its score is its expected weight:
        // (0 - e)^2 / e = e
        let counts = SparseMatrix::from_triplets(
            2,
            2,
            vec![(0, 0, 0.0), (0, 1, 2.0), (1, 0, 3.0)],
        )
        .unwrap();
        let scores = chi_square(counts, 1.0);
        // row sums [2, 3], col sums [3, 2], total 5
        let expected = 2.0 * 3.0 / 5.0;
        let got = scores.get(0, 0).unwrap();
        assert!(got.is_finite());
        assert!((got - expected).abs() < 1e-12, "got {}", got);
    }

    #[test]
    fn uniform_scaling_keeps_the_score_order_without_smoothing() {
        // scaling every count scales every score by the same factor, so the
        // ranking of the cells must not move
        let cells = vec![(0, 0, 1.0), (0, 1, 5.0), (1, 0, 2.0), (1, 2, 0.5)];
        let scaled: Vec<_> = cells.iter().map(|&(r, c, w)| (r, c, w * 3.5)).collect();
        let base = chi_square(SparseMatrix::from_triplets(2, 3, cells).unwrap(), 1.0);
        let big = chi_square(SparseMatrix::from_triplets(2, 3, scaled).unwrap(), 1.0);
        let order = |matrix: &SparseMatrix| {
            let mut cells: Vec<_> = matrix.iter().collect();
            cells.sort_by(|a, b| a.2.total_cmp(&b.2));
            cells.into_iter().map(|(r, c, _)| (r, c)).collect::<Vec<_>>()
        };
        assert_eq!(order(&base), order(&big));
    }

    #[test]
    fn empty_matrices_pass_through() {
        let scores = chi_square(SparseMatrix::empty(3, 4), 0.75);
        assert_eq!(scores.nnz(), 0);
        assert_eq!(scores.rows(), 3);
        assert_eq!(scores.cols(), 4);
    }
}
