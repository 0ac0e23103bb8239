//! Non-owning view over a matrix diagonal
//!
//! A [`DiagonalView`] is a handle, not a borrow: it stores the identity and
//! generation of the matrix it was created from plus an offset, and every
//! access goes through the matrix passed in at call time. Nothing is copied,
//! so writes made through the matrix are visible through the view and the
//! other way around. If the matrix was resized (generation changed) or a
//! different matrix is supplied, access fails with `UseAfterInvalidation`.

use crate::error::{AlgebraError, Result};
use crate::matrix::{Matrix, MatrixMut, Scalar};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagonalView {
    matrix_id: u64,
    generation: u64,
    offset: isize,
    len: usize,
}

impl DiagonalView {
    /// Creates a view of the diagonal `offset` places above (positive) or
    /// below (negative) the main diagonal.
    pub fn new<T: Scalar, M: Matrix<T> + ?Sized>(matrix: &M, offset: isize) -> Result<Self> {
        let (rows, cols) = matrix.shape();
        let shift = offset.unsigned_abs();
        let len = if offset >= 0 {
            cols.checked_sub(shift).map(|c| rows.min(c))
        } else {
            rows.checked_sub(shift).map(|r| r.min(cols))
        };

        let len = match len {
            Some(len) if len > 0 || offset == 0 => len,
            _ => {
                return Err(AlgebraError::invalid_argument(
                    "offset",
                    format!("diagonal {offset} lies outside a {rows}x{cols} matrix"),
                ))
            }
        };

        Ok(Self {
            matrix_id: matrix.stamp().id(),
            generation: matrix.stamp().generation(),
            offset,
            len,
        })
    }

    /// The main diagonal
    pub fn main<T: Scalar, M: Matrix<T> + ?Sized>(matrix: &M) -> Result<Self> {
        Self::new(matrix, 0)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn offset(&self) -> isize {
        self.offset
    }

    /// Matrix coordinates of diagonal position `k`
    pub fn position(&self, k: usize) -> Result<(usize, usize)> {
        if k >= self.len {
            return Err(AlgebraError::OutOfRange {
                index: k,
                len: self.len,
            });
        }
        let shift = self.offset.unsigned_abs();
        Ok(if self.offset >= 0 {
            (k, k + shift)
        } else {
            (k + shift, k)
        })
    }

    /// Reads diagonal position `k` through `matrix`
    pub fn at<T: Scalar, M: Matrix<T> + ?Sized>(&self, matrix: &M, k: usize) -> Result<T> {
        self.validate(matrix)?;
        let (i, j) = self.position(k)?;
        matrix.get(i, j)
    }

    /// Writes diagonal position `k` through `matrix`
    ///
    /// Compressed matrices refuse writes that would add a stored entry.
    pub fn set<T: Scalar, M: MatrixMut<T> + ?Sized>(
        &self,
        matrix: &mut M,
        k: usize,
        value: T,
    ) -> Result<()> {
        self.validate::<T, M>(&*matrix)?;
        let (i, j) = self.position(k)?;
        matrix.set(i, j, value)
    }

    /// Copies the whole diagonal out of `matrix`
    pub fn to_vec<T: Scalar, M: Matrix<T> + ?Sized>(&self, matrix: &M) -> Result<Vec<T>> {
        self.validate(matrix)?;
        (0..self.len).map(|k| self.at(matrix, k)).collect()
    }

    fn validate<T: Scalar, M: Matrix<T> + ?Sized>(&self, matrix: &M) -> Result<()> {
        let stamp = matrix.stamp();
        if stamp.id() != self.matrix_id || stamp.generation() != self.generation {
            return Err(AlgebraError::UseAfterInvalidation {
                view: (self.matrix_id, self.generation),
                matrix: stamp.pair(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::{DenseMatrix, ResizePolicy, StorageOrder};

    fn sample() -> DenseMatrix<i32> {
        DenseMatrix::from_rows(&[
            vec![10, 1, 0, 0],
            vec![0, 20, 0, 0],
            vec![0, 0, 30, 0],
            vec![3, 0, 0, 40],
        ])
        .unwrap()
    }

    #[test]
    fn test_main_diagonal() {
        let m = sample();
        let view = DiagonalView::main(&m).unwrap();
        assert_eq!(view.len(), 4);
        assert_eq!(view.to_vec(&m).unwrap(), vec![10, 20, 30, 40]);
    }

    #[test]
    fn test_offsets() {
        let m = sample();
        let upper = DiagonalView::new(&m, 1).unwrap();
        assert_eq!(upper.len(), 3);
        assert_eq!(upper.to_vec(&m).unwrap(), vec![1, 0, 0]);

        let lower = DiagonalView::new(&m, -3).unwrap();
        assert_eq!(lower.len(), 1);
        assert_eq!(lower.at(&m, 0).unwrap(), 3);

        assert!(DiagonalView::new(&m, 4).is_err());
        assert!(DiagonalView::new(&m, -4).is_err());
    }

    #[test]
    fn test_rectangular_lengths() {
        let wide = DenseMatrix::<f64>::zeros(2, 5);
        assert_eq!(DiagonalView::new(&wide, 0).unwrap().len(), 2);
        assert_eq!(DiagonalView::new(&wide, 3).unwrap().len(), 2);
        assert_eq!(DiagonalView::new(&wide, 4).unwrap().len(), 1);
        assert_eq!(DiagonalView::new(&wide, -1).unwrap().len(), 1);
    }

    #[test]
    fn test_read_and_write_through() {
        let mut m = sample();
        let view = DiagonalView::main(&m).unwrap();

        m.set(2, 2, 99).unwrap();
        assert_eq!(view.at(&m, 2).unwrap(), 99);

        view.set(&mut m, 0, -1).unwrap();
        assert_eq!(m.get(0, 0).unwrap(), -1);
    }

    #[test]
    fn test_out_of_range_position() {
        let m = sample();
        let view = DiagonalView::main(&m).unwrap();
        assert!(matches!(
            view.at(&m, 4),
            Err(AlgebraError::OutOfRange { index: 4, len: 4 })
        ));
    }

    #[test]
    fn test_resize_invalidates() {
        let mut m = sample();
        let view = DiagonalView::main(&m).unwrap();
        m.resize(5, 5, ResizePolicy::Preserve);
        assert!(matches!(
            view.at(&m, 0),
            Err(AlgebraError::UseAfterInvalidation { .. })
        ));
    }

    #[test]
    fn test_other_matrix_rejected() {
        let m = sample();
        let copy = m.clone();
        let view = DiagonalView::main(&m).unwrap();
        assert!(matches!(
            view.to_vec(&copy),
            Err(AlgebraError::UseAfterInvalidation { .. })
        ));
    }

    #[test]
    fn test_compressed_write_through() {
        let mut c = sample().compress(StorageOrder::RowMajor);
        let view = DiagonalView::main(&c).unwrap();
        view.set(&mut c, 1, 21).unwrap();
        assert_eq!(c.get(1, 1).unwrap(), 21);

        let upper = DiagonalView::new(&c, 1).unwrap();
        assert!(matches!(
            upper.set(&mut c, 1, 5),
            Err(AlgebraError::UnsupportedMutation { row: 1, col: 2 })
        ));
        assert_eq!(c.nnz(), 6);
    }
}
