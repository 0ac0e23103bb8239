//! Conversion functions between storage formats

use std::borrow::Cow;

use crate::matrix::{CompressedMatrix, DenseMatrix, Matrix, Scalar, StorageOrder};
use crate::utils::exclusive_scan;

impl<T: Scalar> CompressedMatrix<T> {
    /// Builds compressed storage holding the non-zero cells of `dense`
    pub fn from_dense(dense: &DenseMatrix<T>, order: StorageOrder) -> Self {
        let (n_rows, n_cols) = dense.shape();
        let array = dense.as_array();
        let (major, minor) = match order {
            StorageOrder::RowMajor => (n_rows, n_cols),
            StorageOrder::ColumnMajor => (n_cols, n_rows),
        };

        let mut pointers = Vec::with_capacity(major + 1);
        let mut indices = Vec::new();
        let mut values = Vec::new();
        pointers.push(0);

        for k in 0..major {
            for m in 0..minor {
                let value = match order {
                    StorageOrder::RowMajor => array[[k, m]],
                    StorageOrder::ColumnMajor => array[[m, k]],
                };
                if !value.is_zero() {
                    indices.push(m);
                    values.push(value);
                }
            }
            pointers.push(indices.len());
        }

        Self::assemble(n_rows, n_cols, order, pointers, indices, values)
    }

    /// Expands to dense storage; absent cells become zero, stored zeros stay zero
    pub fn to_dense(&self) -> DenseMatrix<T> {
        let mut dense = DenseMatrix::zeros(self.rows(), self.cols());
        let array = dense.array_mut();
        for (i, j, value) in self.triplets() {
            array[[i, j]] = value;
        }
        dense
    }

    /// Alias of [`to_dense`](Self::to_dense)
    pub fn decompress(&self) -> DenseMatrix<T> {
        self.to_dense()
    }

    /// Converts between CSR and CSC, borrowing when the order already matches
    pub fn to_order(&self, order: StorageOrder) -> Cow<'_, Self> {
        if self.order() == order {
            return Cow::Borrowed(self);
        }

        // Count entries per new segment (old minor index)
        let new_major = self.minor_dim();
        let mut counts = vec![0; new_major];
        for &idx in self.indices() {
            counts[idx] += 1;
        }

        // New pointers via prefix sum
        let pointers = exclusive_scan(&counts);

        // Scatter; walking old segments in order keeps new segments sorted
        let nnz = self.nnz();
        let mut indices = vec![0; nnz];
        let mut values = vec![T::zero(); nnz];
        let mut next = pointers.clone();

        for k in 0..self.major_dim() {
            for (idx, &value) in self.outer_iter(k) {
                let pos = next[idx];
                indices[pos] = k;
                values[pos] = value;
                next[idx] += 1;
            }
        }

        Cow::Owned(Self::assemble(
            self.rows(),
            self.cols(),
            order,
            pointers,
            indices,
            values,
        ))
    }
}

impl<T: Scalar> DenseMatrix<T> {
    /// Compresses into CSR or CSC storage
    pub fn compress(&self, order: StorageOrder) -> CompressedMatrix<T> {
        CompressedMatrix::from_dense(self, order)
    }
}
