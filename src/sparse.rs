//! Sparse matrices and the counts-to-matrix assembler
//!
//! Matrices are compressed sparse rows over `f64` weights. A stored cell is
//! a fact even when its value is zero: scoring only ever touches stored
//! cells, so an explicit zero and an absent cell are different things and
//! stay different through every transformation here.
//!
//! The assembler streams a counts file against fixed row and column
//! vocabularies. Updates accumulate in a staging map keyed by packed
//! indices and fold into the matrix every 100,000 lines, which keeps the
//! staging map small without rebuilding the matrix per line.

use std::io::BufRead;

use ndarray::Array1;

use crate::errors::{Error, Result};
use crate::farm::{farm_with_capacity, new_plain, FarmMap, PlainMap};
use crate::formats;

const FOLD_EVERY: usize = 100_000;
const PROGRESS_EVERY: u64 = 250_000;

/// A compressed sparse row matrix of pair weights
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrix {
    pub(crate) rows: usize,
    pub(crate) cols: usize,
    pub(crate) indptr: Vec<usize>,
    pub(crate) indices: Vec<usize>,
    pub(crate) data: Vec<f64>,
}

impl SparseMatrix {
    /// A matrix with no stored cells
    pub fn empty(rows: usize, cols: usize) -> SparseMatrix {
        SparseMatrix {
            rows,
            cols,
            indptr: vec![0; rows + 1],
            indices: vec![],
            data: vec![],
        }
    }

    /// Build from `(row, col, weight)` triplets, summing duplicates
    ///
    /// Zero weights become stored cells like any other.
    pub fn from_triplets(
        rows: usize,
        cols: usize,
        triplets: Vec<(usize, usize, f64)>,
    ) -> Result<SparseMatrix> {
        for &(row, col, _) in &triplets {
            if row >= rows || col >= cols {
                return Err(Error::InvalidDimensions(format!(
                    "triplet ({}, {}) lands outside a {}x{} matrix",
                    row, col, rows, cols
                )));
            }
        }
        Ok(SparseMatrix::build(rows, cols, triplets))
    }

    /// Build from triplets already known to be in bounds
    fn build(rows: usize, cols: usize, mut triplets: Vec<(usize, usize, f64)>) -> SparseMatrix {
        triplets.sort_by_key(|&(row, col, _)| (row, col));
        let mut indptr = Vec::with_capacity(rows + 1);
        let mut indices = Vec::with_capacity(triplets.len());
        let mut data: Vec<f64> = Vec::with_capacity(triplets.len());
        indptr.push(0);
        let mut current_row = 0;
        let mut last: Option<(usize, usize)> = None;
        for (row, col, weight) in triplets {
            if last == Some((row, col)) {
                if let Some(cell) = data.last_mut() {
                    *cell += weight;
                }
                continue;
            }
            while current_row < row {
                indptr.push(indices.len());
                current_row += 1;
            }
            indices.push(col);
            data.push(weight);
            last = Some((row, col));
        }
        while current_row < rows {
            indptr.push(indices.len());
            current_row += 1;
        }
        SparseMatrix { rows, cols, indptr, indices, data }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of stored cells, explicit zeros included
    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    /// The stored value at `(row, col)`, or `None` for an absent cell
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.rows {
            return None;
        }
        let lo = self.indptr[row];
        let hi = self.indptr[row + 1];
        self.indices[lo..hi]
            .binary_search(&col)
            .ok()
            .map(|offset| self.data[lo + offset])
    }

    /// Stored column indices and values of one row
    pub fn row(&self, row: usize) -> (&[usize], &[f64]) {
        let lo = self.indptr[row];
        let hi = self.indptr[row + 1];
        (&self.indices[lo..hi], &self.data[lo..hi])
    }

    /// All stored cells in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        (0..self.rows).flat_map(move |row| {
            let lo = self.indptr[row];
            let hi = self.indptr[row + 1];
            (lo..hi).map(move |k| (row, self.indices[k], self.data[k]))
        })
    }

    /// Cell-wise sum of two matrices of the same shape
    pub fn add(&self, other: &SparseMatrix) -> Result<SparseMatrix> {
        if self.rows != other.rows || self.cols != other.cols {
            return Err(Error::InvalidDimensions(format!(
                "cannot add a {}x{} matrix to a {}x{} matrix",
                other.rows, other.cols, self.rows, self.cols
            )));
        }
        Ok(self.merged(other))
    }

    fn merged(&self, other: &SparseMatrix) -> SparseMatrix {
        let mut indptr = Vec::with_capacity(self.rows + 1);
        let mut indices = Vec::with_capacity(self.nnz() + other.nnz());
        let mut data = Vec::with_capacity(self.nnz() + other.nnz());
        indptr.push(0);
        for row in 0..self.rows {
            let mut a = self.indptr[row];
            let enda = self.indptr[row + 1];
            let mut b = other.indptr[row];
            let endb = other.indptr[row + 1];
            while a < enda || b < endb {
                if b == endb || (a < enda && self.indices[a] < other.indices[b]) {
                    indices.push(self.indices[a]);
                    data.push(self.data[a]);
                    a += 1;
                } else if a == enda || other.indices[b] < self.indices[a] {
                    indices.push(other.indices[b]);
                    data.push(other.data[b]);
                    b += 1;
                } else {
                    indices.push(self.indices[a]);
                    data.push(self.data[a] + other.data[b]);
                    a += 1;
                    b += 1;
                }
            }
            indptr.push(indices.len());
        }
        SparseMatrix {
            rows: self.rows,
            cols: self.cols,
            indptr,
            indices,
            data,
        }
    }

    /// Sum of the stored cells in each row
    pub fn row_sums(&self) -> Array1<f64> {
        let mut sums = Array1::zeros(self.rows);
        for row in 0..self.rows {
            let mut total = 0.0;
            for k in self.indptr[row]..self.indptr[row + 1] {
                total += self.data[k];
            }
            sums[row] = total;
        }
        sums
    }

    /// Sum of the stored cells in each column
    pub fn col_sums(&self) -> Array1<f64> {
        let mut sums = Array1::zeros(self.cols);
        for k in 0..self.data.len() {
            sums[self.indices[k]] += self.data[k];
        }
        sums
    }
}

/// Streaming counts-to-matrix assembler with staged folds
pub struct MatrixAssembler {
    matrix: SparseMatrix,
    staging: PlainMap<u64, f64>,
    pending: usize,
    dropped: u64,
}

impl MatrixAssembler {
    pub fn new(rows: usize, cols: usize) -> MatrixAssembler {
        MatrixAssembler {
            matrix: SparseMatrix::empty(rows, cols),
            staging: new_plain(),
            pending: 0,
            dropped: 0,
        }
    }

    /// Accumulate one cell update
    pub fn stage(&mut self, row: usize, col: usize, weight: f64) -> Result<()> {
        if row >= self.matrix.rows || col >= self.matrix.cols {
            return Err(Error::InvalidDimensions(format!(
                "cell ({}, {}) is outside the {}x{} matrix",
                row, col, self.matrix.rows, self.matrix.cols
            )));
        }
        let key = ((row as u64) << 32) | col as u64;
        *self.staging.entry(key).or_insert(0.0) += weight;
        self.tick();
        Ok(())
    }

    /// Note a line that named something outside the vocabulary; it still
    /// counts toward the fold cadence
    pub fn skip(&mut self) {
        self.dropped += 1;
        self.tick();
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn tick(&mut self) {
        self.pending += 1;
        if self.pending >= FOLD_EVERY {
            self.fold();
        }
    }

    fn fold(&mut self) {
        self.pending = 0;
        if self.staging.is_empty() {
            return;
        }
        let triplets: Vec<(usize, usize, f64)> = self
            .staging
            .drain()
            .map(|(key, weight)| {
                ((key >> 32) as usize, (key & 0xFFFF_FFFF) as usize, weight)
            })
            .collect();
        let batch = SparseMatrix::build(self.matrix.rows, self.matrix.cols, triplets);
        self.matrix = self.matrix.merged(&batch);
    }

    pub fn finish(mut self) -> SparseMatrix {
        self.fold();
        if self.dropped > 0 {
            info!(
                "Skipped {} count lines naming pairs outside the vocabulary",
                self.dropped
            );
        }
        self.matrix
    }
}

/// Assemble a counts stream into a matrix over the given vocabularies
///
/// Rows and columns are indexed by the sorted word and context tokens; the
/// sorted label lists come back alongside the matrix. Lines naming unknown
/// tokens are skipped, malformed lines abort.
pub fn assemble<R: BufRead>(
    reader: R,
    words: &FarmMap<String, f64>,
    contexts: &FarmMap<String, f64>,
) -> Result<(SparseMatrix, Vec<String>, Vec<String>)> {
    let mut iw: Vec<String> = words.keys().cloned().collect();
    iw.sort();
    let mut ic: Vec<String> = contexts.keys().cloned().collect();
    ic.sort();
    let mut wi: FarmMap<&str, usize> = farm_with_capacity(iw.len());
    for (index, token) in iw.iter().enumerate() {
        wi.insert(token.as_str(), index);
    }
    let mut ci: FarmMap<&str, usize> = farm_with_capacity(ic.len());
    for (index, token) in ic.iter().enumerate() {
        ci.insert(token.as_str(), index);
    }

    let mut assembler = MatrixAssembler::new(iw.len(), ic.len());
    let mut lines = 0u64;
    for line in reader.lines() {
        let line = line?;
        lines += 1;
        let (weight, word, context) =
            formats::parse_counts_line(&line).map_err(|err| match err {
                Error::MalformedRecord(info) => {
                    Error::MalformedRecord(format!("{} (line {})", info, lines))
                }
                other => other,
            })?;
        match (wi.get(word), ci.get(context)) {
            (Some(&row), Some(&col)) => assembler.stage(row, col, weight)?,
            _ => {
                debug!("Dropping line {}: {} or {} is outside the vocabularies", lines, word, context);
                assembler.skip();
            }
        }
        if lines % PROGRESS_EVERY == 0 {
            info!("Assembled {} count lines so far", lines);
        }
    }
    let matrix = assembler.finish();
    info!(
        "Assembled a {}x{} matrix with {} stored cells",
        matrix.rows(),
        matrix.cols(),
        matrix.nnz()
    );
    Ok((matrix, iw, ic))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::farm::new_farm;

    #[test]
    fn triplets_merge_and_sort() {
        let matrix = SparseMatrix::from_triplets(
            2,
            3,
            vec![(1, 2, 1.0), (0, 1, 2.0), (1, 2, 0.5)],
        )
        .unwrap();
        assert_eq!(matrix.nnz(), 2);
        assert_eq!(matrix.get(0, 1), Some(2.0));
        assert_eq!(matrix.get(1, 2), Some(1.5));
        assert_eq!(matrix.get(0, 0), None);
        let cells: Vec<_> = matrix.iter().collect();
        assert_eq!(cells, vec![(0, 1, 2.0), (1, 2, 1.5)]);
    }

    #[test]
    fn explicit_zeros_are_stored_cells() {
        let matrix = SparseMatrix::from_triplets(1, 2, vec![(0, 0, 0.0)]).unwrap();
        assert_eq!(matrix.nnz(), 1);
        assert_eq!(matrix.get(0, 0), Some(0.0));
        assert_eq!(matrix.get(0, 1), None);
    }

    #[test]
    fn out_of_bounds_triplets_are_rejected() {
        assert!(SparseMatrix::from_triplets(1, 1, vec![(0, 1, 1.0)]).is_err());
        assert!(SparseMatrix::from_triplets(1, 1, vec![(1, 0, 1.0)]).is_err());
    }

    #[test]
    fn adding_matrices_merges_cells() {
        let a = SparseMatrix::from_triplets(2, 3, vec![(0, 0, 1.0), (0, 2, 2.0)]).unwrap();
        let b = SparseMatrix::from_triplets(2, 3, vec![(0, 1, 3.0), (0, 2, 4.0), (1, 0, 5.0)])
            .unwrap();
        let sum = a.add(&b).unwrap();
        assert_eq!(sum.get(0, 0), Some(1.0));
        assert_eq!(sum.get(0, 1), Some(3.0));
        assert_eq!(sum.get(0, 2), Some(6.0));
        assert_eq!(sum.get(1, 0), Some(5.0));
        assert_eq!(sum.nnz(), 4);

        let wrong_shape = SparseMatrix::empty(3, 3);
        assert!(a.add(&wrong_shape).is_err());
    }

    #[test]
    fn marginals_sum_rows_and_columns() {
        let matrix =
            SparseMatrix::from_triplets(2, 2, vec![(0, 0, 1.0), (0, 1, 2.0), (1, 1, 3.0)])
                .unwrap();
        assert_eq!(matrix.row_sums().to_vec(), vec![3.0, 3.0]);
        assert_eq!(matrix.col_sums().to_vec(), vec![1.0, 5.0]);
    }

    #[test]
    fn staged_folds_accumulate_across_the_threshold() {
        // cross the fold cadence twice and make sure nothing is lost
        let mut assembler = MatrixAssembler::new(2, 2);
        for i in 0..250_000usize {
            assembler.stage(i % 2, 0, 1.0).unwrap();
        }
        let matrix = assembler.finish();
        assert_eq!(matrix.get(0, 0), Some(125_000.0));
        assert_eq!(matrix.get(1, 0), Some(125_000.0));
        assert_eq!(matrix.nnz(), 2);
    }

    #[test]
    fn assemble_maps_tokens_to_sorted_indices() {
        let mut words = new_farm();
        words.insert("b".to_string(), 1.0);
        words.insert("a".to_string(), 3.0);
        let mut contexts = new_farm();
        contexts.insert("c".to_string(), 1.0);
        contexts.insert("a".to_string(), 1.0);
        contexts.insert("b".to_string(), 2.0);

        let counts = "2 a b\n1 b a\n1 a c\n9 zz a\n";
        let (matrix, iw, ic) = assemble(counts.as_bytes(), &words, &contexts).unwrap();
        assert_eq!(iw, vec!["a", "b"]);
        assert_eq!(ic, vec!["a", "b", "c"]);
        assert_eq!(matrix.get(0, 1), Some(2.0));
        assert_eq!(matrix.get(1, 0), Some(1.0));
        assert_eq!(matrix.get(0, 2), Some(1.0));
        assert_eq!(matrix.nnz(), 3);
    }

    #[test]
    fn assemble_aborts_on_malformed_lines() {
        let mut words = new_farm();
        words.insert("a".to_string(), 1.0);
        let contexts = words.clone();
        let result = assemble("1 a\n".as_bytes(), &words, &contexts);
        assert!(result.is_err());
    }

    #[test]
    fn duplicate_count_lines_accumulate() {
        let mut words = new_farm();
        words.insert("a".to_string(), 1.0);
        let contexts = words.clone();
        let counts = "1 a a\n2.5 a a\n";
        let (matrix, _, _) = assemble(counts.as_bytes(), &words, &contexts).unwrap();
        assert_eq!(matrix.get(0, 0), Some(3.5));
    }
}
