//! The sparsity converter (§4.9): adapts whichever format a problem reports
//! to whichever format a consumer wants, computing the index permutation
//! once so repeated `convert_values` calls (one per ALM/PANTR iteration,
//! since only the *values* change, not the layout) are a single indexed
//! copy.

use super::{CooOrdering, CscOrdering, DenseLayout, SparsityDescriptor, Symmetry};
use crate::error::{SolverError, SolverResult};

/// A canonical `(row, col)` location, 0-based, independent of storage
/// format or `first_index`.
type Triplet = (usize, usize);

fn dense_triplets(rows: usize, cols: usize, layout: DenseLayout, sym: Symmetry) -> Vec<Triplet> {
    let mut out = Vec::with_capacity(rows * cols);
    let in_triangle = |r: usize, c: usize| match sym {
        Symmetry::Unsymmetric => true,
        Symmetry::Upper => c >= r,
        Symmetry::Lower => c <= r,
    };
    match layout {
        DenseLayout::RowMajor => {
            for r in 0..rows {
                for c in 0..cols {
                    if in_triangle(r, c) {
                        out.push((r, c));
                    }
                }
            }
        }
        DenseLayout::ColMajor => {
            for c in 0..cols {
                for r in 0..rows {
                    if in_triangle(r, c) {
                        out.push((r, c));
                    }
                }
            }
        }
    }
    out
}

fn csc_triplets(row_indices: &[usize], col_pointers: &[usize], first_index: usize) -> Vec<Triplet> {
    let cols = col_pointers.len().saturating_sub(1);
    let mut out = Vec::with_capacity(row_indices.len());
    for c in 0..cols {
        let start = col_pointers[c] - first_index;
        let end = col_pointers[c + 1] - first_index;
        for &r in &row_indices[start..end] {
            out.push((r - first_index, c));
        }
    }
    out
}

fn coo_triplets(row_indices: &[usize], col_indices: &[usize], first_index: usize) -> Vec<Triplet> {
    row_indices
        .iter()
        .zip(col_indices.iter())
        .map(|(&r, &c)| (r - first_index, c - first_index))
        .collect()
}

fn triplets_of(desc: &SparsityDescriptor) -> Vec<Triplet> {
    match desc {
        SparsityDescriptor::Dense {
            rows,
            cols,
            layout,
            symmetry,
        } => dense_triplets(*rows, *cols, *layout, *symmetry),
        SparsityDescriptor::Csc {
            row_indices,
            col_pointers,
            first_index,
            ..
        } => csc_triplets(row_indices, col_pointers, *first_index),
        SparsityDescriptor::Coo {
            row_indices,
            col_indices,
            first_index,
            ..
        } => coo_triplets(row_indices, col_indices, *first_index),
    }
}

/// Looks up the position of `(r, c)` in `src`'s triplet list, falling back
/// to the symmetric mirror `(c, r)` when `src` is declared symmetric and
/// only stores one triangle (dense-symmetric -> sparse/dense-full
/// expansion, §4.9).
fn locate(
    index: &std::collections::HashMap<Triplet, usize>,
    src_symmetry: Symmetry,
    r: usize,
    c: usize,
) -> Option<usize> {
    if let Some(&pos) = index.get(&(r, c)) {
        return Some(pos);
    }
    if src_symmetry != Symmetry::Unsymmetric {
        if let Some(&pos) = index.get(&(c, r)) {
            return Some(pos);
        }
    }
    None
}

/// Precomputed mapping from destination value slots to source value slots.
/// Build once per (src layout, dst layout) pair; `convert_values` is then a
/// cheap indexed copy, safe to call once per outer/inner iteration.
pub struct SparsityConverter {
    /// `permutation[i]` is the source index feeding destination slot `i`.
    permutation: Vec<usize>,
    src_nnz: usize,
}

impl SparsityConverter {
    pub fn build(src: &SparsityDescriptor, dst: &SparsityDescriptor) -> SolverResult<Self> {
        if src.shape() != dst.shape() {
            return Err(SolverError::InvalidSparsity(format!(
                "shape mismatch: src {:?}, dst {:?}",
                src.shape(),
                dst.shape()
            )));
        }
        let src_triplets = triplets_of(src);
        let dst_triplets = triplets_of(dst);
        let mut index = std::collections::HashMap::with_capacity(src_triplets.len());
        for (i, t) in src_triplets.iter().enumerate() {
            index.insert(*t, i);
        }
        let mut permutation = Vec::with_capacity(dst_triplets.len());
        for (r, c) in &dst_triplets {
            let pos = locate(&index, src.symmetry(), *r, *c).ok_or_else(|| {
                SolverError::InvalidSparsity(format!(
                    "destination entry ({r}, {c}) has no corresponding source entry"
                ))
            })?;
            permutation.push(pos);
        }
        Ok(SparsityConverter {
            permutation,
            src_nnz: src_triplets.len(),
        })
    }

    /// Applies the precomputed permutation. A no-op copy when `src` and
    /// `dst` describe the same layout (identity permutation).
    pub fn convert_values(&self, src_values: &[f64], dst_values: &mut [f64]) -> SolverResult<()> {
        if src_values.len() != self.src_nnz {
            return Err(SolverError::SizeMismatch {
                name: "src_values",
                expected: self.src_nnz,
                got: src_values.len(),
            });
        }
        if dst_values.len() != self.permutation.len() {
            return Err(SolverError::SizeMismatch {
                name: "dst_values",
                expected: self.permutation.len(),
                got: dst_values.len(),
            });
        }
        for (dst, &src_idx) in dst_values.iter_mut().zip(self.permutation.iter()) {
            *dst = src_values[src_idx];
        }
        Ok(())
    }
}

/// Re-sorts a CSC matrix's row indices (and permutes its values in lock
/// step) within each column, producing `CscOrdering::SortedRows`.
pub fn sort_csc_rows(
    row_indices: &mut [usize],
    col_pointers: &[usize],
    values: &mut [f64],
    first_index: usize,
) {
    let cols = col_pointers.len().saturating_sub(1);
    for c in 0..cols {
        let start = col_pointers[c] - first_index;
        let end = col_pointers[c + 1] - first_index;
        let slice_rows = &mut row_indices[start..end];
        let slice_vals = &mut values[start..end];
        let mut order: Vec<usize> = (0..slice_rows.len()).collect();
        order.sort_by_key(|&i| slice_rows[i]);
        let rows_copy: Vec<usize> = order.iter().map(|&i| slice_rows[i]).collect();
        let vals_copy: Vec<f64> = order.iter().map(|&i| slice_vals[i]).collect();
        slice_rows.copy_from_slice(&rows_copy);
        slice_vals.copy_from_slice(&vals_copy);
    }
}

/// Builds a COO triplet list into sorted-by-columns-then-rows order, also
/// useful as the canonical ordering needed before constructing a CSC matrix
/// from COO input.
pub fn sort_coo_by_cols_then_rows(
    row_indices: &mut [usize],
    col_indices: &mut [usize],
    values: &mut [f64],
) {
    let n = row_indices.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by_key(|&i| (col_indices[i], row_indices[i]));
    let rows_copy: Vec<usize> = order.iter().map(|&i| row_indices[i]).collect();
    let cols_copy: Vec<usize> = order.iter().map(|&i| col_indices[i]).collect();
    let vals_copy: Vec<f64> = order.iter().map(|&i| values[i]).collect();
    row_indices.copy_from_slice(&rows_copy);
    col_indices.copy_from_slice(&cols_copy);
    values.copy_from_slice(&vals_copy);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparsity::CooOrdering;

    fn dense_2x2() -> SparsityDescriptor {
        SparsityDescriptor::Dense {
            rows: 2,
            cols: 2,
            layout: DenseLayout::RowMajor,
            symmetry: Symmetry::Unsymmetric,
        }
    }

    fn coo_2x2() -> SparsityDescriptor {
        SparsityDescriptor::Coo {
            rows: 2,
            cols: 2,
            row_indices: vec![0, 0, 1, 1],
            col_indices: vec![0, 1, 0, 1],
            symmetry: Symmetry::Unsymmetric,
            ordering: CooOrdering::SortedByRowsAndCols,
            first_index: 0,
        }
    }

    #[test]
    fn dense_to_coo_and_back_round_trips_values() {
        let dense = dense_2x2();
        let coo = coo_2x2();
        let values = [1.0, 2.0, 3.0, 4.0];

        let to_coo = SparsityConverter::build(&dense, &coo).unwrap();
        let mut coo_vals = [0.0; 4];
        to_coo.convert_values(&values, &mut coo_vals).unwrap();
        assert_eq!(coo_vals, values);

        let to_dense = SparsityConverter::build(&coo, &dense).unwrap();
        let mut dense_vals = [0.0; 4];
        to_dense.convert_values(&coo_vals, &mut dense_vals).unwrap();
        assert_eq!(dense_vals, values);
    }

    #[test]
    fn symmetric_upper_dense_expands_to_full_unsymmetric() {
        let upper = SparsityDescriptor::Dense {
            rows: 2,
            cols: 2,
            layout: DenseLayout::RowMajor,
            symmetry: Symmetry::Upper,
        };
        // stored order (row-major, upper only): (0,0) (0,1) (1,1)
        let values = [1.0, 2.0, 3.0];
        let full = dense_2x2();
        let converter = SparsityConverter::build(&upper, &full).unwrap();
        let mut full_vals = [0.0; 4];
        converter.convert_values(&values, &mut full_vals).unwrap();
        // (0,0)=1 (0,1)=2 (1,0)=mirror of (0,1)=2 (1,1)=3
        assert_eq!(full_vals, [1.0, 2.0, 2.0, 3.0]);
    }

    #[test]
    fn first_index_one_is_handled() {
        let coo0 = coo_2x2();
        let coo1 = SparsityDescriptor::Coo {
            rows: 2,
            cols: 2,
            row_indices: vec![1, 1, 2, 2],
            col_indices: vec![1, 2, 1, 2],
            symmetry: Symmetry::Unsymmetric,
            ordering: CooOrdering::SortedByRowsAndCols,
            first_index: 1,
        };
        let values = [10.0, 20.0, 30.0, 40.0];
        let converter = SparsityConverter::build(&coo0, &coo1).unwrap();
        let mut out = [0.0; 4];
        converter.convert_values(&values, &mut out).unwrap();
        assert_eq!(out, values);
    }

    #[test]
    fn csc_sort_rows_matches_manual_ordering() {
        let mut row_indices = vec![1, 0, 1, 0];
        let col_pointers = vec![0, 2, 4];
        let mut values = vec![10.0, 20.0, 30.0, 40.0];
        sort_csc_rows(&mut row_indices, &col_pointers, &mut values, 0);
        assert_eq!(row_indices, vec![0, 1, 0, 1]);
        assert_eq!(values, vec![20.0, 10.0, 40.0, 30.0]);
    }
}
