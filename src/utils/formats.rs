//! Conversions between our matrix types and external libraries

use ndarray::Array2;
use sprs::CsMat;

use crate::error::Result;
use crate::matrix::{CompressedMatrix, DenseMatrix, Matrix, Scalar, StorageOrder};

/// Copies a compressed matrix into an sprs `CsMat` with the same layout
pub fn to_sprs<T: Scalar + Default>(matrix: &CompressedMatrix<T>) -> CsMat<T> {
    let shape = (matrix.rows(), matrix.cols());
    let pointers = matrix.pointers().to_vec();
    let indices = matrix.indices().to_vec();
    let values = matrix.values().to_vec();
    match matrix.order() {
        StorageOrder::RowMajor => CsMat::new(shape, pointers, indices, values),
        StorageOrder::ColumnMajor => CsMat::new_csc(shape, pointers, indices, values),
    }
}

/// Converts an sprs matrix, re-laying it out as `order` if needed
///
/// The arrays are validated again on the way in, so a `CsMat` assembled
/// with unchecked constructors cannot break our invariants.
pub fn from_sprs<T: Scalar + Default>(
    matrix: CsMat<T>,
    order: StorageOrder,
) -> Result<CompressedMatrix<T>> {
    let matrix = match order {
        StorageOrder::RowMajor if !matrix.is_csr() => matrix.to_csr(),
        StorageOrder::ColumnMajor if !matrix.is_csc() => matrix.to_csc(),
        _ => matrix,
    };

    let (rows, cols) = matrix.shape();
    let (pointers, indices, values) = matrix.into_raw_storage();
    CompressedMatrix::from_raw(rows, cols, order, pointers, indices, values)
}

impl<T: Scalar> From<Array2<T>> for DenseMatrix<T> {
    fn from(array: Array2<T>) -> Self {
        DenseMatrix::from_owned_array(array)
    }
}

impl<T: Scalar> From<DenseMatrix<T>> for Array2<T> {
    fn from(matrix: DenseMatrix<T>) -> Self {
        matrix.into_array()
    }
}
