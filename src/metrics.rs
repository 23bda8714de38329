//! Word similarity evaluation
//!
//! Rows of a scored matrix act as context vectors. They are L2-normalized
//! once up front, so cosine similarity reduces to a sparse dot product.
//! A testset of `<word> <word> <gold score>` lines is graded by the
//! Spearman rank correlation between the gold scores and the cosines.

use std::cmp::Ordering;
use std::io::BufRead;

use crate::errors::{Error, Result};
use crate::farm::{farm_with_capacity, FarmMap};
use crate::sparse::SparseMatrix;

/// Row vectors addressable by word, normalized to unit length
pub struct WordVectors {
    matrix: SparseMatrix,
    index: FarmMap<String, usize>,
}

impl WordVectors {
    /// Take ownership of a matrix and its row labels
    ///
    /// Zero rows cannot be normalized; they stay zero and score 0 against
    /// everything, when the similarity is really undefined.
    pub fn new(mut matrix: SparseMatrix, labels: Vec<String>) -> Result<WordVectors> {
        if labels.len() != matrix.rows() {
            return Err(Error::InvalidDimensions(format!(
                "{} labels cannot address the {} rows of the matrix",
                labels.len(),
                matrix.rows()
            )));
        }
        for row in 0..matrix.rows {
            let lo = matrix.indptr[row];
            let hi = matrix.indptr[row + 1];
            let sum_sq: f64 = matrix.data[lo..hi].iter().map(|v| v * v).sum();
            if sum_sq != 0.0 {
                let norm = sum_sq.sqrt();
                for k in lo..hi {
                    matrix.data[k] /= norm;
                }
            }
        }
        let mut index: FarmMap<String, usize> = farm_with_capacity(labels.len());
        for (row, label) in labels.into_iter().enumerate() {
            index.insert(label, row);
        }
        Ok(WordVectors { matrix, index })
    }

    pub fn contains(&self, word: &str) -> bool {
        self.index.contains_key(word)
    }

    /// Cosine similarity, or 0 when either word has no vector
    pub fn similarity(&self, one: &str, two: &str) -> f64 {
        match (self.index.get(one), self.index.get(two)) {
            (Some(&a), Some(&b)) => {
                let (a_cols, a_vals) = self.matrix.row(a);
                let (b_cols, b_vals) = self.matrix.row(b);
                sparse_dot(a_cols, a_vals, b_cols, b_vals)
            }
            _ => 0.0,
        }
    }
}

fn sparse_dot(a_cols: &[usize], a_vals: &[f64], b_cols: &[usize], b_vals: &[f64]) -> f64 {
    let mut total = 0.0;
    let mut i = 0;
    let mut j = 0;
    while i < a_cols.len() && j < b_cols.len() {
        match a_cols[i].cmp(&b_cols[j]) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                total += a_vals[i] * b_vals[j];
                i += 1;
                j += 1;
            }
        }
    }
    total
}

/// Read a `<word> <word> <score>` testset, lowercasing the words
pub fn read_testset<R: BufRead>(reader: R) -> Result<Vec<(String, String, f64)>> {
    let mut pairs = vec![];
    for line in reader.lines() {
        let line = line?;
        let mut fields = line.split_whitespace();
        match (fields.next(), fields.next(), fields.next(), fields.next()) {
            (Some(one), Some(two), Some(gold), None) => {
                let gold = gold.parse::<f64>()?;
                pairs.push((one.to_lowercase(), two.to_lowercase(), gold));
            }
            _ => {
                return Err(Error::MalformedRecord(format!(
                    "testset line is not `<word> <word> <score>`: {:?}",
                    line
                )))
            }
        }
    }
    Ok(pairs)
}

/// Grade a testset: Spearman correlation of gold scores against cosines
pub fn evaluate(vectors: &WordVectors, testset: &[(String, String, f64)]) -> f64 {
    let golds: Vec<f64> = testset.iter().map(|(_, _, gold)| *gold).collect();
    let sims: Vec<f64> = testset
        .iter()
        .map(|(one, two, _)| vectors.similarity(one, two))
        .collect();
    spearman(&golds, &sims)
}

/// Spearman rank correlation, with ties sharing their average rank
///
/// Fewer than two points, or zero rank variance, come out as NaN.
pub fn spearman(xs: &[f64], ys: &[f64]) -> f64 {
    debug_assert_eq!(xs.len(), ys.len());
    pearson(&ranks(xs), &ranks(ys))
}

fn ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    let mut ranks = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        let average = (i + j) as f64 / 2.0 + 1.0;
        for &position in &order[i..=j] {
            ranks[position] = average;
        }
        i = j + 1;
    }
    ranks
}

fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    cov / (var_x * var_y).sqrt()
}
