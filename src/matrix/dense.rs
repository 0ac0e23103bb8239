//! Dense row-major matrix storage

use std::fmt;

use ndarray::{s, Array2, ArrayView1, ArrayView2};

use crate::error::{AlgebraError, Result};
use crate::matrix::{check_bounds, Matrix, MatrixMut, Scalar, Stamp};

/// What happens to existing values when a dense matrix is resized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizePolicy {
    /// Keep the rectangle shared by the old and new extents, zero-fill the rest
    Preserve,
    /// Start from an all-zero matrix of the new extents
    Discard,
}

/// A dense matrix with every cell materialized in contiguous row-major order.
///
/// Storage is an `ndarray::Array2` kept in standard layout; it is only ever
/// created through `zeros` or `from_shape_vec`, so rows are contiguous.
#[derive(Clone)]
pub struct DenseMatrix<T> {
    data: Array2<T>,
    stamp: Stamp,
}

impl<T: Scalar> DenseMatrix<T> {
    /// Creates a zero-filled matrix
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            data: Array2::zeros((rows, cols)),
            stamp: Stamp::fresh(),
        }
    }

    /// Creates a matrix from row-major data
    ///
    /// Fails with `InvalidArgument` if `data.len() != rows * cols`.
    pub fn from_shape_vec(rows: usize, cols: usize, data: Vec<T>) -> Result<Self> {
        let len = data.len();
        let data = Array2::from_shape_vec((rows, cols), data).map_err(|_| {
            AlgebraError::invalid_argument(
                "data",
                format!("{len} values cannot fill a {rows}x{cols} matrix"),
            )
        })?;
        Ok(Self {
            data,
            stamp: Stamp::fresh(),
        })
    }

    /// Creates a matrix from a list of equally long rows
    pub fn from_rows(rows: &[Vec<T>]) -> Result<Self> {
        let n_cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * n_cols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n_cols {
                return Err(AlgebraError::invalid_argument(
                    "rows",
                    format!("row {i} has {} entries, expected {n_cols}", row.len()),
                ));
            }
            data.extend_from_slice(row);
        }
        Self::from_shape_vec(rows.len(), n_cols, data)
    }

    /// Copies an arbitrary-layout array into row-major storage
    pub fn from_array(array: ArrayView2<'_, T>) -> Self {
        let (rows, cols) = array.dim();
        let mut data = Array2::zeros((rows, cols));
        data.assign(&array);
        Self {
            data,
            stamp: Stamp::fresh(),
        }
    }

    /// Takes ownership of `array`, copying only if it is not in standard layout
    pub fn from_owned_array(array: Array2<T>) -> Self {
        if array.is_standard_layout() {
            Self {
                data: array,
                stamp: Stamp::fresh(),
            }
        } else {
            Self::from_array(array.view())
        }
    }

    pub fn identity(n: usize) -> Self {
        let mut matrix = Self::zeros(n, n);
        for k in 0..n {
            matrix.data[[k, k]] = T::one();
        }
        matrix
    }

    /// Read-only view of the underlying array
    pub fn as_array(&self) -> ArrayView2<'_, T> {
        self.data.view()
    }

    pub(crate) fn array_mut(&mut self) -> &mut Array2<T> {
        &mut self.data
    }

    pub fn into_array(self) -> Array2<T> {
        self.data
    }

    /// Row `i` as a view
    pub fn row(&self, i: usize) -> Result<ArrayView1<'_, T>> {
        if i >= self.data.nrows() {
            return Err(AlgebraError::OutOfRange {
                index: i,
                len: self.data.nrows(),
            });
        }
        Ok(self.data.row(i))
    }

    /// Number of non-zero cells
    pub fn nnz(&self) -> usize {
        self.data.iter().filter(|v| !v.is_zero()).count()
    }

    /// Bytes occupied by element storage
    pub fn weight(&self) -> usize {
        self.data.len() * std::mem::size_of::<T>()
    }

    pub fn transpose(&self) -> Self {
        Self::from_array(self.data.t())
    }

    /// Reallocates to `new_rows` x `new_cols`.
    ///
    /// Returns the number of non-zero values that did not survive, so callers
    /// can tell when shrinking or `Discard` lost data. Any diagonal view bound
    /// to this matrix is invalidated.
    pub fn resize(&mut self, new_rows: usize, new_cols: usize, policy: ResizePolicy) -> usize {
        let mut resized = Array2::zeros((new_rows, new_cols));
        let dropped = match policy {
            ResizePolicy::Preserve => {
                let keep_rows = self.rows().min(new_rows);
                let keep_cols = self.cols().min(new_cols);
                let kept = self.data.slice(s![..keep_rows, ..keep_cols]);
                let kept_nnz = kept.iter().filter(|v| !v.is_zero()).count();
                resized.slice_mut(s![..keep_rows, ..keep_cols]).assign(&kept);
                self.nnz() - kept_nnz
            }
            ResizePolicy::Discard => self.nnz(),
        };
        self.data = resized;
        self.stamp.bump();
        dropped
    }
}

impl<T: Scalar> Matrix<T> for DenseMatrix<T> {
    fn rows(&self) -> usize {
        self.data.nrows()
    }

    fn cols(&self) -> usize {
        self.data.ncols()
    }

    fn get(&self, i: usize, j: usize) -> Result<T> {
        check_bounds(i, j, self.rows(), self.cols())?;
        Ok(self.data[[i, j]])
    }

    fn stamp(&self) -> &Stamp {
        &self.stamp
    }
}

impl<T: Scalar> MatrixMut<T> for DenseMatrix<T> {
    fn set(&mut self, i: usize, j: usize, value: T) -> Result<()> {
        check_bounds(i, j, self.rows(), self.cols())?;
        self.data[[i, j]] = value;
        Ok(())
    }
}

impl<T: Scalar> PartialEq for DenseMatrix<T> {
    /// Cell-by-cell equality; identity of the backing store is ignored
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl<T: Scalar> fmt::Debug for DenseMatrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "DenseMatrix {{")?;
        writeln!(f, "  dimensions: {} × {}", self.rows(), self.cols())?;

        let max_rows_to_print = 6.min(self.rows());
        for i in 0..max_rows_to_print {
            write!(f, "    ")?;
            let max_cols = 8.min(self.cols());
            for j in 0..max_cols {
                write!(f, "{:>8?} ", self.data[[i, j]])?;
            }
            if self.cols() > max_cols {
                write!(f, "... ({} more)", self.cols() - max_cols)?;
            }
            writeln!(f)?;
        }
        if self.rows() > max_rows_to_print {
            writeln!(f, "    ... ({} more rows)", self.rows() - max_rows_to_print)?;
        }

        write!(f, "}}")
    }
}
