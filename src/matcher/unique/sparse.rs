//! Sparse square score matrix.

use serde::Serialize;

/// Row-major sparse matrix of non-negative scores.
///
/// The logical shape is `rows × cols`; the solver sees it padded to
/// `size() × size()`, every cell not stored being an implicit zero.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct SparseMatrix {
    rows: usize,
    cols: usize,
    /// Per row, `(column, value)` sorted by column.
    entries: Vec<Vec<(usize, f64)>>,
}

impl SparseMatrix {
    pub(crate) fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            entries: vec![Vec::new(); rows],
        }
    }

    /// Stores `value` at `(row, col)`. A repeated cell keeps the larger value.
    pub(crate) fn set(&mut self, row: usize, col: usize, value: f64) {
        let cells = &mut self.entries[row];
        match cells.binary_search_by_key(&col, |&(c, _)| c) {
            Ok(pos) => cells[pos].1 = cells[pos].1.max(value),
            Err(pos) => cells.insert(pos, (col, value)),
        }
    }

    /// Side of the padded square.
    pub(crate) fn size(&self) -> usize {
        self.rows.max(self.cols)
    }

    pub(crate) const fn rows(&self) -> usize {
        self.rows
    }

    pub(crate) const fn cols(&self) -> usize {
        self.cols
    }

    /// Stored cells of `row`; empty for padding rows.
    pub(crate) fn row(&self, row: usize) -> &[(usize, f64)] {
        self.entries.get(row).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Value at `(row, col)`, zero when not stored.
    #[cfg(test)]
    pub(crate) fn get(&self, row: usize, col: usize) -> f64 {
        let cells = self.row(row);
        cells
            .binary_search_by_key(&col, |&(c, _)| c)
            .map_or(0.0, |pos| cells[pos].1)
    }

    /// Largest value in `row`, counting implicit zeros.
    pub(crate) fn row_max(&self, row: usize) -> f64 {
        self.row(row).iter().fold(0.0, |m, &(_, v)| m.max(v))
    }

    /// Number of stored cells.
    pub(crate) fn nnz(&self) -> usize {
        self.entries.iter().map(Vec::len).sum()
    }
}
