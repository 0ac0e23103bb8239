//! Matrix norms

use crate::matrix::{CompressedMatrix, DenseMatrix, Matrix, Scalar};

/// The norms that can be computed for a matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormType {
    /// Maximum absolute column sum
    One,
    /// Maximum absolute row sum
    Infinity,
    /// Square root of the sum of squared magnitudes
    Frobenius,
}

pub trait Norm {
    fn norm(&self, kind: NormType) -> f64;
}

impl<T: Scalar> Norm for DenseMatrix<T> {
    fn norm(&self, kind: NormType) -> f64 {
        let array = self.as_array();
        match kind {
            NormType::One => array
                .columns()
                .into_iter()
                .map(|col| col.iter().map(|v| v.magnitude()).sum::<f64>())
                .fold(0.0, f64::max),
            NormType::Infinity => array
                .rows()
                .into_iter()
                .map(|row| row.iter().map(|v| v.magnitude()).sum::<f64>())
                .fold(0.0, f64::max),
            NormType::Frobenius => frobenius(array.iter().copied()),
        }
    }
}

impl<T: Scalar> Norm for CompressedMatrix<T> {
    /// Only stored entries are visited
    fn norm(&self, kind: NormType) -> f64 {
        match kind {
            NormType::One => {
                let mut sums = vec![0.0; self.cols()];
                for (_, j, v) in self.triplets() {
                    sums[j] += v.magnitude();
                }
                sums.into_iter().fold(0.0, f64::max)
            }
            NormType::Infinity => {
                let mut sums = vec![0.0; self.rows()];
                for (i, _, v) in self.triplets() {
                    sums[i] += v.magnitude();
                }
                sums.into_iter().fold(0.0, f64::max)
            }
            NormType::Frobenius => frobenius(self.values().iter().copied()),
        }
    }
}

fn frobenius<T: Scalar>(values: impl Iterator<Item = T>) -> f64 {
    values
        .map(|v| {
            let m = v.magnitude();
            m * m
        })
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::StorageOrder;

    fn fixed() -> DenseMatrix<i32> {
        DenseMatrix::from_rows(&[
            vec![1, -2, 0, 0],
            vec![0, 3, 0, -4],
            vec![5, 0, 6, 0],
            vec![0, 0, 0, 7],
        ])
        .unwrap()
    }

    #[test]
    fn test_dense_norms() {
        let m = fixed();
        // column sums: 6, 5, 6, 11
        assert_eq!(m.norm(NormType::One), 11.0);
        // row sums: 3, 7, 11, 7
        assert_eq!(m.norm(NormType::Infinity), 11.0);
        // 1 + 4 + 9 + 16 + 25 + 36 + 49 = 140
        assert!((m.norm(NormType::Frobenius) - 140f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_compressed_norms_agree() {
        let m = fixed();
        for order in [StorageOrder::RowMajor, StorageOrder::ColumnMajor] {
            let c = m.compress(order);
            for kind in [NormType::One, NormType::Infinity, NormType::Frobenius] {
                assert!((c.norm(kind) - m.norm(kind)).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_empty_matrix_norm_is_zero() {
        let m = DenseMatrix::<f64>::zeros(0, 0);
        assert_eq!(m.norm(NormType::One), 0.0);
        assert_eq!(m.norm(NormType::Frobenius), 0.0);
    }
}
