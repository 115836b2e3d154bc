//! Round-trips sparsity values across all three public formats (§4.9),
//! exercised through the crate's public API rather than `convert.rs`'s own
//! internal unit tests.

use panoc_alm::sparsity::{CooOrdering, CscOrdering, DenseLayout, SparsityConverter, SparsityDescriptor, Symmetry};

fn dense_3x3() -> SparsityDescriptor {
    SparsityDescriptor::Dense {
        rows: 3,
        cols: 3,
        layout: DenseLayout::RowMajor,
        symmetry: Symmetry::Unsymmetric,
    }
}

/// Tridiagonal 3x3 pattern in CSC, column-major, sorted rows.
fn tridiagonal_csc() -> SparsityDescriptor {
    SparsityDescriptor::Csc {
        rows: 3,
        cols: 3,
        row_indices: vec![0, 1, 0, 1, 2, 1, 2],
        col_pointers: vec![0, 2, 5, 7],
        symmetry: Symmetry::Unsymmetric,
        ordering: CscOrdering::SortedRows,
        first_index: 0,
    }
}

fn tridiagonal_coo() -> SparsityDescriptor {
    SparsityDescriptor::Coo {
        rows: 3,
        cols: 3,
        row_indices: vec![0, 1, 0, 1, 2, 1, 2],
        col_indices: vec![0, 0, 1, 1, 1, 2, 2],
        symmetry: Symmetry::Unsymmetric,
        ordering: CooOrdering::Unsorted,
        first_index: 0,
    }
}

#[test]
fn csc_to_coo_preserves_values_in_triplet_order() {
    let values = [1.0, 4.0, 2.0, 5.0, 7.0, 6.0, 8.0];
    let converter = SparsityConverter::build(&tridiagonal_csc(), &tridiagonal_coo()).unwrap();
    let mut out = [0.0; 7];
    converter.convert_values(&values, &mut out).unwrap();
    assert_eq!(out, values);
}

#[test]
fn symmetric_lower_csc_expands_into_full_unsymmetric_dense() {
    // Lower triangle of a symmetric 2x2: (0,0)=1, (1,0)=2, (1,1)=3.
    let lower = SparsityDescriptor::Csc {
        rows: 2,
        cols: 2,
        row_indices: vec![0, 1, 1],
        col_pointers: vec![0, 2, 3],
        symmetry: Symmetry::Lower,
        ordering: CscOrdering::SortedRows,
        first_index: 0,
    };
    let full = SparsityDescriptor::Dense {
        rows: 2,
        cols: 2,
        layout: DenseLayout::RowMajor,
        symmetry: Symmetry::Unsymmetric,
    };
    let values = [1.0, 2.0, 3.0];
    let converter = SparsityConverter::build(&lower, &full).unwrap();
    let mut out = [0.0; 4];
    converter.convert_values(&values, &mut out).unwrap();
    // (0,0)=1 (0,1)=mirror of (1,0)=2 (1,0)=2 (1,1)=3
    assert_eq!(out, [1.0, 2.0, 2.0, 3.0]);
}

#[test]
fn dense_size_mismatch_is_rejected_at_build_time() {
    let a = dense_3x3();
    let b = SparsityDescriptor::Dense {
        rows: 2,
        cols: 2,
        layout: DenseLayout::RowMajor,
        symmetry: Symmetry::Unsymmetric,
    };
    assert!(SparsityConverter::build(&a, &b).is_err());
}

#[test]
fn convert_values_rejects_wrong_length_input() {
    let converter = SparsityConverter::build(&tridiagonal_csc(), &tridiagonal_coo()).unwrap();
    let too_short = [1.0, 2.0];
    let mut out = [0.0; 7];
    assert!(converter.convert_values(&too_short, &mut out).is_err());
}
