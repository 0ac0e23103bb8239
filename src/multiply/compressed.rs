//! Kernels with at least one compressed operand
//!
//! Compressed matrices arrive here already in the layout the kernel needs:
//! CSR for the matrix-matrix paths, either layout for the matrix-vector
//! paths. Stored zeros contribute nothing and are skipped.

use std::ops::Range;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rayon::prelude::*;

use crate::matrix::{CompressedMatrix, Matrix, Scalar, StorageOrder};
use crate::multiply::partition::{fill_rows, fill_vector, partition, Execution};

/// Dense scratch row for sparse × sparse products
///
/// `values` has one slot per output column, `occupied` marks the slots
/// touched since the last [`drain`](Self::drain) and `touched` lists them.
struct RowAccumulator<T> {
    values: Vec<T>,
    occupied: Vec<bool>,
    touched: Vec<usize>,
}

impl<T: Scalar> RowAccumulator<T> {
    fn new(n_cols: usize) -> Self {
        Self {
            values: vec![T::zero(); n_cols],
            occupied: vec![false; n_cols],
            touched: Vec::new(),
        }
    }

    #[inline]
    fn accumulate(&mut self, col: usize, val: T) {
        if self.occupied[col] {
            self.values[col] += val;
        } else {
            self.occupied[col] = true;
            self.touched.push(col);
            self.values[col] = val;
        }
    }

    /// Appends the row in column order, dropping cancelled entries, and resets
    fn drain(&mut self, indices: &mut Vec<usize>, values: &mut Vec<T>) {
        self.touched.sort_unstable();
        for &col in &self.touched {
            let val = self.values[col];
            if !val.is_zero() {
                indices.push(col);
                values.push(val);
            }
            self.occupied[col] = false;
        }
        self.touched.clear();
    }
}

/// Rows `rows` of A × B for CSR operands: per-row lengths, indices, values
fn spgemm_rows<T: Scalar>(
    a: &CompressedMatrix<T>,
    b: &CompressedMatrix<T>,
    rows: Range<usize>,
) -> (Vec<usize>, Vec<usize>, Vec<T>) {
    let mut accumulator = RowAccumulator::new(b.cols());
    let mut lengths = Vec::with_capacity(rows.len());
    let mut indices = Vec::new();
    let mut values = Vec::new();

    for i in rows {
        for (t, &a_val) in a.outer_iter(i) {
            if a_val.is_zero() {
                continue;
            }
            for (j, &b_val) in b.outer_iter(t) {
                accumulator.accumulate(j, a_val * b_val);
            }
        }
        let before = indices.len();
        accumulator.drain(&mut indices, &mut values);
        lengths.push(indices.len() - before);
    }

    (lengths, indices, values)
}

/// Sparse × sparse; both operands CSR, result CSR
pub(crate) fn spgemm<T: Scalar>(
    a: &CompressedMatrix<T>,
    b: &CompressedMatrix<T>,
    exec: Execution<'_>,
) -> CompressedMatrix<T> {
    debug_assert_eq!(a.order(), StorageOrder::RowMajor);
    debug_assert_eq!(b.order(), StorageOrder::RowMajor);
    debug_assert_eq!(a.cols(), b.rows());

    let n_rows = a.rows();
    let n_cols = b.cols();

    let blocks = match exec {
        Execution::Sequential => vec![spgemm_rows(a, b, 0..n_rows)],
        Execution::Parallel { pool, workers } => {
            let ranges = partition(n_rows, workers);
            pool.install(|| {
                ranges
                    .into_par_iter()
                    .map(|rows| spgemm_rows(a, b, rows))
                    .collect()
            })
        }
    };

    // Stitch the blocks together in row order
    let nnz: usize = blocks.iter().map(|(_, idx, _)| idx.len()).sum();
    let mut pointers = Vec::with_capacity(n_rows + 1);
    let mut indices = Vec::with_capacity(nnz);
    let mut values = Vec::with_capacity(nnz);
    pointers.push(0);

    let mut running = 0;
    for (lengths, block_indices, block_values) in blocks {
        for len in lengths {
            running += len;
            pointers.push(running);
        }
        indices.extend(block_indices);
        values.extend(block_values);
    }

    CompressedMatrix::assemble(n_rows, n_cols, StorageOrder::RowMajor, pointers, indices, values)
}

/// Sparse (CSR) × dense
pub(crate) fn sparse_dense<T: Scalar>(
    a: &CompressedMatrix<T>,
    b: ArrayView2<'_, T>,
    exec: Execution<'_>,
) -> Array2<T> {
    debug_assert_eq!(a.order(), StorageOrder::RowMajor);
    fill_rows(a.rows(), b.ncols(), exec, |i, mut c_row| {
        for (t, &a_val) in a.outer_iter(i) {
            if a_val.is_zero() {
                continue;
            }
            for (c, &b_val) in c_row.iter_mut().zip(b.row(t).iter()) {
                *c += a_val * b_val;
            }
        }
    })
}

/// Dense × sparse (CSR)
pub(crate) fn dense_sparse<T: Scalar>(
    a: ArrayView2<'_, T>,
    b: &CompressedMatrix<T>,
    exec: Execution<'_>,
) -> Array2<T> {
    debug_assert_eq!(b.order(), StorageOrder::RowMajor);
    fill_rows(a.nrows(), b.cols(), exec, |i, mut c_row| {
        for (t, &a_val) in a.row(i).iter().enumerate() {
            if a_val.is_zero() {
                continue;
            }
            for (j, &b_val) in b.outer_iter(t) {
                c_row[j] += a_val * b_val;
            }
        }
    })
}

/// y[k] = Σ segment k · x
///
/// For CSR this is A·x; for CSC it is Aᵀ·x. Segments are independent, so the
/// parallel form partitions them into blocks that write disjoint parts of y.
pub(crate) fn gather<T: Scalar>(
    m: &CompressedMatrix<T>,
    x: ArrayView1<'_, T>,
    exec: Execution<'_>,
) -> Array1<T> {
    debug_assert_eq!(m.minor_dim(), x.len());
    fill_vector(m.major_dim(), exec, |k| {
        m.outer_iter(k)
            .fold(T::zero(), |acc, (idx, &val)| acc + val * x[idx])
    })
}

/// y[idx] += value · x[k] for every stored entry of segment k
///
/// For CSC this is A·x; for CSR it is Aᵀ·x. Different segments write the same
/// output slots, so each parallel block accumulates into its own partial
/// vector and the partials are summed afterwards.
pub(crate) fn scatter<T: Scalar>(
    m: &CompressedMatrix<T>,
    x: ArrayView1<'_, T>,
    exec: Execution<'_>,
) -> Array1<T> {
    debug_assert_eq!(m.major_dim(), x.len());
    let len = m.minor_dim();
    let partial = |segments: Range<usize>| {
        let mut y = vec![T::zero(); len];
        for k in segments {
            let xk = x[k];
            if xk.is_zero() {
                continue;
            }
            for (idx, &val) in m.outer_iter(k) {
                y[idx] += val * xk;
            }
        }
        y
    };

    let y = match exec {
        Execution::Sequential => partial(0..m.major_dim()),
        Execution::Parallel { pool, workers } => {
            let ranges = partition(m.major_dim(), workers);
            pool.install(|| {
                ranges.into_par_iter().map(partial).reduce(
                    || vec![T::zero(); len],
                    |mut acc, part| {
                        for (a, p) in acc.iter_mut().zip(part) {
                            *a += p;
                        }
                        acc
                    },
                )
            })
        }
    };
    Array1::from_vec(y)
}
