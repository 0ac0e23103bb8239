// Matrix data structures and element access

pub mod compressed;
pub mod conversion;
pub mod dense;
pub mod diagonal;
pub mod norm;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use num_traits::{Num, NumAssign};

use crate::error::{AlgebraError, Result};

pub use compressed::{CompressedMatrix, DuplicatePolicy};
pub use dense::{DenseMatrix, ResizePolicy};
pub use diagonal::DiagonalView;
pub use norm::{Norm, NormType};

/// Fixed-length ordered sequence of scalars
pub type Vector<T> = ndarray::Array1<T>;

/// Element type accepted by every matrix in the crate
pub trait Scalar:
    Copy + Num + NumAssign + PartialEq + Send + Sync + fmt::Debug + fmt::Display + 'static
{
    /// Lossy conversion used by norms and tolerance checks
    fn to_f64(self) -> f64;

    fn magnitude(self) -> f64 {
        self.to_f64().abs()
    }

    /// Additive inverse, `None` where it cannot be represented
    fn checked_neg(self) -> Option<Self>;
}

macro_rules! impl_scalar {
    (float: $($t:ty),*) => {
        $(
            impl Scalar for $t {
                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }

                #[inline]
                fn checked_neg(self) -> Option<Self> {
                    Some(-self)
                }
            }
        )*
    };
    (int: $($t:ty),*) => {
        $(
            impl Scalar for $t {
                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }

                #[inline]
                fn checked_neg(self) -> Option<Self> {
                    <$t>::checked_neg(self)
                }
            }
        )*
    };
}

impl_scalar!(float: f32, f64);
impl_scalar!(int: i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

/// Layout of a compressed matrix: which axis the pointer array walks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageOrder {
    /// Compressed Sparse Row: one segment per row, indices are columns
    #[default]
    RowMajor,
    /// Compressed Sparse Column: one segment per column, indices are rows
    ColumnMajor,
}

impl StorageOrder {
    pub fn transposed(self) -> Self {
        match self {
            StorageOrder::RowMajor => StorageOrder::ColumnMajor,
            StorageOrder::ColumnMajor => StorageOrder::RowMajor,
        }
    }
}

static NEXT_MATRIX_ID: AtomicU64 = AtomicU64::new(1);

/// Identity and layout generation of a matrix's backing store.
///
/// Views record the stamp they were created against and compare it on every
/// access. A cloned matrix is a different backing store and gets a new id.
#[derive(Debug, PartialEq, Eq)]
pub struct Stamp {
    id: u64,
    generation: u64,
}

impl Stamp {
    pub(crate) fn fresh() -> Self {
        Self {
            id: NEXT_MATRIX_ID.fetch_add(1, Ordering::Relaxed),
            generation: 0,
        }
    }

    /// Record a reallocation of the backing store
    pub(crate) fn bump(&mut self) {
        self.generation += 1;
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn pair(&self) -> (u64, u64) {
        (self.id, self.generation)
    }
}

impl Clone for Stamp {
    fn clone(&self) -> Self {
        Stamp::fresh()
    }
}

/// Read access shared by dense and compressed storage
pub trait Matrix<T: Scalar> {
    fn rows(&self) -> usize;

    fn cols(&self) -> usize;

    /// Element at (i, j); absent compressed entries read as zero
    fn get(&self, i: usize, j: usize) -> Result<T>;

    fn stamp(&self) -> &Stamp;

    fn shape(&self) -> (usize, usize) {
        (self.rows(), self.cols())
    }

    /// Copy of the main diagonal
    fn diagonal(&self) -> Vec<T> {
        let n = self.rows().min(self.cols());
        (0..n)
            .map(|k| self.get(k, k).unwrap_or_else(|_| T::zero()))
            .collect()
    }
}

/// Write access; compressed storage may refuse structural changes
pub trait MatrixMut<T: Scalar>: Matrix<T> {
    fn set(&mut self, i: usize, j: usize, value: T) -> Result<()>;
}

#[inline]
pub(crate) fn check_bounds(i: usize, j: usize, rows: usize, cols: usize) -> Result<()> {
    if i < rows && j < cols {
        Ok(())
    } else {
        Err(AlgebraError::IndexOutOfBounds {
            row: i,
            col: j,
            rows,
            cols,
        })
    }
}
