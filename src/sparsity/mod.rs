//! Sparsity descriptors for `eval_jac_g` / `eval_hess_l` matrices (§4.9),
//! grounded on alpaqa's `problem/sparsity.hpp`.

pub mod convert;
pub use convert::SparsityConverter;

/// Which triangle (or none) the values represent for a symmetric matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symmetry {
    Unsymmetric,
    Upper,
    Lower,
}

/// Column/row sort order for CSC inner indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CscOrdering {
    Unsorted,
    SortedRows,
}

/// Sort order for COO triplets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooOrdering {
    Unsorted,
    SortedByCols,
    SortedByRows,
    SortedByColsAndRows,
    SortedByRowsAndCols,
}

/// Row-major or column-major layout for the dense format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenseLayout {
    RowMajor,
    ColMajor,
}

/// A tagged union describing the layout, symmetry, ordering and index base
/// of a matrix, independent of the values themselves (§4.9).
#[derive(Debug, Clone, PartialEq)]
pub enum SparsityDescriptor {
    Dense {
        rows: usize,
        cols: usize,
        layout: DenseLayout,
        symmetry: Symmetry,
    },
    Csc {
        rows: usize,
        cols: usize,
        /// length `nnz`
        row_indices: Vec<usize>,
        /// length `cols + 1`
        col_pointers: Vec<usize>,
        symmetry: Symmetry,
        ordering: CscOrdering,
        first_index: usize,
    },
    Coo {
        rows: usize,
        cols: usize,
        row_indices: Vec<usize>,
        col_indices: Vec<usize>,
        symmetry: Symmetry,
        ordering: CooOrdering,
        first_index: usize,
    },
}

impl SparsityDescriptor {
    pub fn shape(&self) -> (usize, usize) {
        match self {
            SparsityDescriptor::Dense { rows, cols, .. } => (*rows, *cols),
            SparsityDescriptor::Csc { rows, cols, .. } => (*rows, *cols),
            SparsityDescriptor::Coo { rows, cols, .. } => (*rows, *cols),
        }
    }

    pub fn symmetry(&self) -> Symmetry {
        match self {
            SparsityDescriptor::Dense { symmetry, .. } => *symmetry,
            SparsityDescriptor::Csc { symmetry, .. } => *symmetry,
            SparsityDescriptor::Coo { symmetry, .. } => *symmetry,
        }
    }

    /// Number of explicitly stored values (excludes the other triangle for
    /// symmetric dense matrices, which are stored in full for that format).
    pub fn nnz(&self) -> usize {
        match self {
            SparsityDescriptor::Dense { rows, cols, .. } => rows * cols,
            SparsityDescriptor::Csc { row_indices, .. } => row_indices.len(),
            SparsityDescriptor::Coo { row_indices, .. } => row_indices.len(),
        }
    }
}
