//! Kuhn-Munkres (Hungarian) maximum-weight assignment over a sparse matrix.
//!
//! The solver works on reduced costs `u[i] + w[j] - v[i][j]` with row
//! potentials `u` and column potentials `w`, so a cost adjustment touches
//! O(n) potentials instead of O(n²) cells. Every reduced cost stays
//! non-negative throughout.
//!
//! Implicit zero cells are never scanned one by one. Their reduced cost is
//! `u[i] + w[j]`, so the cheapest uncovered implicit cell is always formed by
//! the minimum uncovered row potential and the minimum uncovered column
//! potential. If that pair happens to be a stored cell, its own reduced cost
//! is lower still and the stored-cell scan finds it first.
//!
//! Zero search and cost adjustment rescan every stored cell, which makes the
//! worst case O(n² · nnz) rather than the O(n³) of a slack-array variant.

use serde::Serialize;

use crate::error::{AlignError, AlignResult, MatchError};
use crate::matcher::unique::sparse::SparseMatrix;

/// Default cap on solver steps.
pub(crate) const ITERATION_LIMIT: usize = 1_000_000;

/// Reduced costs at or below this are zeros.
const ZERO_TOLERANCE: f64 = 1e-9;

/// Solver state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
enum Step {
    ReduceRows,
    StarZeros,
    CheckCoverage,
    FindAugmentingPath,
    AugmentPath { row: usize, col: usize },
    AdjustCosts,
    Done,
}

#[derive(Debug, Serialize)]
pub(crate) struct Munkres<'a> {
    matrix: &'a SparseMatrix,
    n: usize,
    row_potential: Vec<f64>,
    col_potential: Vec<f64>,
    star_in_row: Vec<Option<usize>>,
    star_in_col: Vec<Option<usize>>,
    prime_in_row: Vec<Option<usize>>,
    row_covered: Vec<bool>,
    col_covered: Vec<bool>,
    step: Step,
    steps: usize,
    limit: usize,
}

impl<'a> Munkres<'a> {
    pub(crate) fn new(matrix: &'a SparseMatrix) -> Self {
        Self::with_limit(matrix, ITERATION_LIMIT)
    }

    pub(crate) fn with_limit(matrix: &'a SparseMatrix, limit: usize) -> Self {
        let n = matrix.size();
        Self {
            matrix,
            n,
            row_potential: vec![0.0; n],
            col_potential: vec![0.0; n],
            star_in_row: vec![None; n],
            star_in_col: vec![None; n],
            prime_in_row: vec![None; n],
            row_covered: vec![false; n],
            col_covered: vec![false; n],
            step: Step::ReduceRows,
            steps: 0,
            limit,
        }
    }

    /// Runs to completion and returns the `(row, col)` assignment over the
    /// padded square, one pair per row.
    ///
    /// # Errors
    ///
    /// `MatchError::IterationLimitExceeded` (tagged with `relation`) if the
    /// step cap is hit, or an internal error if the state turns inconsistent.
    pub(crate) fn solve(mut self, relation: &str) -> AlignResult<Vec<(usize, usize)>> {
        while self.step != Step::Done {
            self.steps += 1;
            if self.steps > self.limit {
                return Err(MatchError::IterationLimitExceeded {
                    relation: relation.to_string(),
                    limit: self.limit,
                    snapshot: self.snapshot(),
                }
                .into());
            }
            self.step = match self.step {
                Step::ReduceRows => {
                    self.reduce_rows();
                    Step::StarZeros
                }
                Step::StarZeros => {
                    self.star_zeros();
                    Step::CheckCoverage
                }
                Step::CheckCoverage => {
                    if self.cover_starred_columns() >= self.n {
                        Step::Done
                    } else {
                        Step::FindAugmentingPath
                    }
                }
                Step::FindAugmentingPath => self.prime_uncovered_zero(),
                Step::AugmentPath { row, col } => {
                    self.augment(row, col)?;
                    Step::CheckCoverage
                }
                Step::AdjustCosts => {
                    self.adjust_costs()?;
                    Step::FindAugmentingPath
                }
                Step::Done => Step::Done,
            };
        }
        tracing::debug!(relation, n = self.n, steps = self.steps, "assignment solved");
        Ok(self
            .star_in_row
            .iter()
            .enumerate()
            .filter_map(|(i, star)| star.map(|j| (i, j)))
            .collect())
    }

    fn reduced(&self, row: usize, col: usize, value: f64) -> f64 {
        self.row_potential[row] + self.col_potential[col] - value
    }

    fn reduce_rows(&mut self) {
        for i in 0..self.n {
            self.row_potential[i] = self.matrix.row_max(i);
        }
    }

    fn star_zeros(&mut self) {
        // Rows whose potential is zero are zero in every column; they take
        // the next free column in order.
        let mut free_col = 0usize;
        for i in 0..self.n {
            let stored = self
                .matrix
                .row(i)
                .iter()
                .find(|&&(j, v)| self.star_in_col[j].is_none() && self.reduced(i, j, v) <= ZERO_TOLERANCE)
                .map(|&(j, _)| j);
            let col = stored.or_else(|| {
                if self.row_potential[i] > ZERO_TOLERANCE {
                    return None;
                }
                while free_col < self.n && self.star_in_col[free_col].is_some() {
                    free_col += 1;
                }
                (free_col < self.n).then_some(free_col)
            });
            if let Some(j) = col {
                self.star_in_row[i] = Some(j);
                self.star_in_col[j] = Some(i);
            }
        }
    }

    fn cover_starred_columns(&mut self) -> usize {
        self.row_covered.fill(false);
        let mut covered = 0;
        for j in 0..self.n {
            let starred = self.star_in_col[j].is_some();
            self.col_covered[j] = starred;
            covered += usize::from(starred);
        }
        covered
    }

    /// Cheapest uncovered implicit cell: `(u + w, row, col)`.
    fn shadow_min(&self) -> Option<(f64, usize, usize)> {
        let row = (0..self.n)
            .filter(|&i| !self.row_covered[i])
            .min_by(|&a, &b| self.row_potential[a].total_cmp(&self.row_potential[b]))?;
        let col = (0..self.n)
            .filter(|&j| !self.col_covered[j])
            .min_by(|&a, &b| self.col_potential[a].total_cmp(&self.col_potential[b]))?;
        Some((self.row_potential[row] + self.col_potential[col], row, col))
    }

    fn find_uncovered_zero(&self) -> Option<(usize, usize)> {
        for i in (0..self.matrix.rows()).filter(|&i| !self.row_covered[i]) {
            for &(j, v) in self.matrix.row(i) {
                if !self.col_covered[j] && self.reduced(i, j, v) <= ZERO_TOLERANCE {
                    return Some((i, j));
                }
            }
        }
        match self.shadow_min() {
            Some((cost, i, j)) if cost <= ZERO_TOLERANCE => Some((i, j)),
            _ => None,
        }
    }

    fn prime_uncovered_zero(&mut self) -> Step {
        let Some((row, col)) = self.find_uncovered_zero() else {
            return Step::AdjustCosts;
        };
        self.prime_in_row[row] = Some(col);
        match self.star_in_row[row] {
            Some(star_col) => {
                self.row_covered[row] = true;
                self.col_covered[star_col] = false;
                Step::FindAugmentingPath
            }
            None => Step::AugmentPath { row, col },
        }
    }

    fn augment(&mut self, row: usize, col: usize) -> AlignResult<()> {
        let mut path = vec![(row, col)];
        let mut col = col;
        while let Some(star_row) = self.star_in_col[col] {
            path.push((star_row, col));
            let Some(prime_col) = self.prime_in_row[star_row] else {
                return Err(AlignError::internal(format!(
                    "starred zero at ({star_row}, {col}) has no primed zero in its row"
                )));
            };
            path.push((star_row, prime_col));
            col = prime_col;
            if path.len() > 2 * self.n + 1 {
                return Err(AlignError::internal("augmenting path does not terminate"));
            }
        }

        for &(r, c) in path.iter().skip(1).step_by(2) {
            self.star_in_row[r] = None;
            self.star_in_col[c] = None;
        }
        for &(r, c) in path.iter().step_by(2) {
            self.star_in_row[r] = Some(c);
            self.star_in_col[c] = Some(r);
        }
        self.prime_in_row.fill(None);
        self.row_covered.fill(false);
        self.col_covered.fill(false);
        Ok(())
    }

    fn adjust_costs(&mut self) -> AlignResult<()> {
        let mut min = self.shadow_min().map_or(f64::INFINITY, |(cost, _, _)| cost);
        for i in (0..self.matrix.rows()).filter(|&i| !self.row_covered[i]) {
            for &(j, v) in self.matrix.row(i) {
                if !self.col_covered[j] {
                    min = min.min(self.reduced(i, j, v));
                }
            }
        }
        if !min.is_finite() {
            return Err(AlignError::internal("no uncovered cell left to adjust"));
        }
        for i in 0..self.n {
            if self.row_covered[i] {
                self.row_potential[i] += min;
            }
        }
        for j in 0..self.n {
            if !self.col_covered[j] {
                self.col_potential[j] -= min;
            }
        }
        Ok(())
    }

    fn snapshot(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| format!("{{\"error\":\"{e}\"}}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn matrix(values: &[&[f64]]) -> SparseMatrix {
        let cols = values.iter().map(|r| r.len()).max().unwrap_or(0);
        let mut m = SparseMatrix::new(values.len(), cols);
        for (i, row) in values.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                if v != 0.0 {
                    m.set(i, j, v);
                }
            }
        }
        m
    }

    fn total(m: &SparseMatrix, pairs: &[(usize, usize)]) -> f64 {
        pairs.iter().map(|&(i, j)| m.get(i, j)).sum()
    }

    fn brute_force(m: &SparseMatrix) -> f64 {
        fn go(m: &SparseMatrix, row: usize, used: &mut Vec<bool>) -> f64 {
            if row == used.len() {
                return 0.0;
            }
            let mut best = f64::NEG_INFINITY;
            for j in 0..used.len() {
                if !used[j] {
                    used[j] = true;
                    best = best.max(m.get(row, j) + go(m, row + 1, used));
                    used[j] = false;
                }
            }
            best
        }
        go(m, 0, &mut vec![false; m.size()])
    }

    fn assert_permutation(pairs: &[(usize, usize)], n: usize) {
        assert_eq!(pairs.len(), n);
        let mut cols: Vec<usize> = pairs.iter().map(|&(_, j)| j).collect();
        cols.sort_unstable();
        assert_eq!(cols, (0..n).collect::<Vec<_>>());
    }

    #[test]
    fn solves_clear_diagonal() {
        let m = matrix(&[&[0.9, 0.1, 0.1], &[0.1, 0.8, 0.1], &[0.1, 0.1, 0.7]]);
        let pairs = Munkres::new(&m).solve("r").unwrap();
        assert_eq!(pairs, vec![(0, 0), (1, 1), (2, 2)]);
    }

    #[test]
    fn prefers_crossing_when_greedy_is_wrong() {
        let m = matrix(&[&[0.9, 0.85], &[0.8, 0.1]]);
        let pairs = Munkres::new(&m).solve("r").unwrap();
        assert_eq!(pairs, vec![(0, 1), (1, 0)]);
    }

    #[test]
    fn pads_rectangular_input() {
        let m = matrix(&[&[0.1, 0.9, 0.0], &[0.1, 0.8, 0.7]]);
        let pairs = Munkres::new(&m).solve("r").unwrap();
        assert_permutation(&pairs, 3);
        assert!((total(&m, &pairs) - 1.6).abs() < 1e-9);
        assert!(pairs.contains(&(0, 1)));
        assert!(pairs.contains(&(1, 2)));
    }

    #[test]
    fn mostly_empty_matrix() {
        let mut m = SparseMatrix::new(4, 4);
        m.set(0, 3, 0.5);
        m.set(2, 1, 0.3);
        let pairs = Munkres::new(&m).solve("r").unwrap();
        assert_permutation(&pairs, 4);
        assert!(pairs.contains(&(0, 3)));
        assert!(pairs.contains(&(2, 1)));
    }

    #[test]
    fn matches_brute_force_on_random_instances() {
        let mut rng = ChaCha8Rng::seed_from_u64(2024);
        for _ in 0..200 {
            let rows = rng.gen_range(1..=5);
            let cols = rng.gen_range(1..=5);
            let mut m = SparseMatrix::new(rows, cols);
            for i in 0..rows {
                for j in 0..cols {
                    if rng.gen_bool(0.6) {
                        // Coarse values force plenty of ties.
                        m.set(i, j, f64::from(rng.gen_range(0..5_u8)) / 4.0);
                    }
                }
            }
            let pairs = Munkres::new(&m).solve("r").unwrap();
            assert_permutation(&pairs, m.size());
            assert!((total(&m, &pairs) - brute_force(&m)).abs() < 1e-9);
        }
    }

    #[test]
    fn empty_matrix_is_trivially_solved() {
        let m = SparseMatrix::new(0, 0);
        assert!(Munkres::new(&m).solve("r").unwrap().is_empty());
    }

    #[test]
    fn step_cap_reports_state() {
        let m = matrix(&[&[0.9, 0.85], &[0.8, 0.1]]);
        let err = Munkres::with_limit(&m, 3).solve("exactMatch").unwrap_err();
        match err {
            AlignError::Matching(MatchError::IterationLimitExceeded {
                relation,
                limit,
                snapshot,
            }) => {
                assert_eq!(relation, "exactMatch");
                assert_eq!(limit, 3);
                let state: serde_json::Value = serde_json::from_str(&snapshot).unwrap();
                assert!(state.get("row_potential").is_some());
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
