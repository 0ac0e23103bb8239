//! Seeded random matrices and vectors
//!
//! All randomness comes from an explicitly seeded ChaCha8 generator, so the
//! same seed always reproduces the same data.

use std::ops::RangeInclusive;

use rand::distributions::{uniform::SampleUniform, Distribution, Uniform};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::{AlgebraError, Result};
use crate::matrix::{CompressedMatrix, DenseMatrix, Scalar, StorageOrder, Vector};

/// Element types the generators can draw
pub trait RandomScalar: Scalar + SampleUniform + PartialOrd {
    /// Whether `low..=high` can be sampled: both ends finite and the width representable
    fn samplable(low: Self, high: Self) -> bool;
}

macro_rules! impl_random_scalar {
    (float: $($t:ty),*) => {
        $(
            impl RandomScalar for $t {
                fn samplable(low: Self, high: Self) -> bool {
                    low.is_finite() && high.is_finite() && (high - low).is_finite()
                }
            }
        )*
    };
    (int: $($t:ty),*) => {
        $(
            impl RandomScalar for $t {
                fn samplable(_low: Self, _high: Self) -> bool {
                    true
                }
            }
        )*
    };
}

impl_random_scalar!(float: f32, f64);
impl_random_scalar!(int: i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

/// Generates random matrices and vectors from a fixed seed
pub struct RandomMatrixGenerator {
    rng: ChaCha8Rng,
}

impl RandomMatrixGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Sparse matrix where each cell is stored with probability `density`
    ///
    /// One Bernoulli trial per cell, walked in storage order; stored values
    /// are uniform over `range` (which may include zero, so a stored value
    /// can be an explicit zero).
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `density` is outside `[0, 1]`, or `range` is empty
    /// or has a non-finite float bound or width.
    pub fn random_sparse_matrix<T: RandomScalar>(
        &mut self,
        rows: usize,
        cols: usize,
        density: f64,
        range: RangeInclusive<T>,
        order: StorageOrder,
    ) -> Result<CompressedMatrix<T>> {
        check_density(density)?;
        let values = uniform(&range)?;

        let (major, minor) = match order {
            StorageOrder::RowMajor => (rows, cols),
            StorageOrder::ColumnMajor => (cols, rows),
        };
        let expected = ((major * minor) as f64 * density) as usize;

        let mut pointers = Vec::with_capacity(major + 1);
        let mut indices = Vec::with_capacity(expected);
        let mut stored = Vec::with_capacity(expected);
        pointers.push(0);

        for _ in 0..major {
            for m in 0..minor {
                if self.rng.gen_bool(density) {
                    indices.push(m);
                    stored.push(values.sample(&mut self.rng));
                }
            }
            pointers.push(indices.len());
        }

        Ok(CompressedMatrix::assemble(
            rows, cols, order, pointers, indices, stored,
        ))
    }

    /// Dense matrix with the same per-cell Bernoulli pattern; cells not
    /// chosen are zero
    pub fn random_dense_matrix<T: RandomScalar>(
        &mut self,
        rows: usize,
        cols: usize,
        density: f64,
        range: RangeInclusive<T>,
    ) -> Result<DenseMatrix<T>> {
        check_density(density)?;
        let values = uniform(&range)?;

        let data = (0..rows * cols)
            .map(|_| {
                if self.rng.gen_bool(density) {
                    values.sample(&mut self.rng)
                } else {
                    T::zero()
                }
            })
            .collect();
        DenseMatrix::from_shape_vec(rows, cols, data)
    }

    /// Vector of `len` values uniform over `range`
    pub fn random_vector<T: RandomScalar>(
        &mut self,
        len: usize,
        range: RangeInclusive<T>,
    ) -> Result<Vector<T>> {
        let values = uniform(&range)?;
        Ok(Vector::from_iter(
            (0..len).map(|_| values.sample(&mut self.rng)),
        ))
    }
}

/// One-shot form of [`RandomMatrixGenerator::random_sparse_matrix`]
pub fn random_sparse_matrix<T: RandomScalar>(
    rows: usize,
    cols: usize,
    density: f64,
    range: RangeInclusive<T>,
    order: StorageOrder,
    seed: u64,
) -> Result<CompressedMatrix<T>> {
    RandomMatrixGenerator::new(seed).random_sparse_matrix(rows, cols, density, range, order)
}

/// One-shot form of [`RandomMatrixGenerator::random_vector`]
pub fn random_vector<T: RandomScalar>(
    len: usize,
    range: RangeInclusive<T>,
    seed: u64,
) -> Result<Vector<T>> {
    RandomMatrixGenerator::new(seed).random_vector(len, range)
}

fn check_density(density: f64) -> Result<()> {
    if (0.0..=1.0).contains(&density) {
        Ok(())
    } else {
        Err(AlgebraError::invalid_argument(
            "density",
            format!("{density} is not within [0, 1]"),
        ))
    }
}

fn uniform<T: RandomScalar>(range: &RangeInclusive<T>) -> Result<Uniform<T>> {
    if range.start() > range.end() {
        return Err(AlgebraError::invalid_argument(
            "range",
            format!("empty range {}..={}", range.start(), range.end()),
        ));
    }
    if !T::samplable(*range.start(), *range.end()) {
        return Err(AlgebraError::invalid_argument(
            "range",
            format!(
                "{}..={} has a non-finite bound or width",
                range.start(),
                range.end()
            ),
        ));
    }
    Ok(Uniform::new_inclusive(*range.start(), *range.end()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::Matrix;

    #[test]
    fn test_density_extremes() {
        let mut gen = RandomMatrixGenerator::new(7);
        let empty = gen
            .random_sparse_matrix(100, 100, 0.0, -10.0..=10.0, StorageOrder::RowMajor)
            .unwrap();
        assert_eq!(empty.nnz(), 0);

        let full = gen
            .random_sparse_matrix(100, 100, 1.0, 1..=9, StorageOrder::ColumnMajor)
            .unwrap();
        assert_eq!(full.nnz(), 10_000);
        assert!(full.values().iter().all(|v| (1..=9).contains(v)));
    }

    #[test]
    fn test_same_seed_same_matrix() {
        let a = random_sparse_matrix(20, 30, 0.2, -1.0..=1.0, StorageOrder::RowMajor, 42).unwrap();
        let b = random_sparse_matrix(20, 30, 0.2, -1.0..=1.0, StorageOrder::RowMajor, 42).unwrap();
        assert_eq!(a.pointers(), b.pointers());
        assert_eq!(a.indices(), b.indices());
        assert_eq!(a.values(), b.values());
        assert_eq!(a.shape(), (20, 30));
    }

    #[test]
    fn test_invalid_arguments() {
        let mut gen = RandomMatrixGenerator::new(1);
        assert!(matches!(
            gen.random_sparse_matrix(2, 2, 1.5, 0.0..=1.0, StorageOrder::RowMajor),
            Err(AlgebraError::InvalidArgument { arg: "density", .. })
        ));
        assert!(gen
            .random_dense_matrix(2, 2, f64::NAN, 0.0..=1.0)
            .is_err());
        #[allow(clippy::reversed_empty_ranges)]
        let reversed = 5..=1;
        assert!(matches!(
            gen.random_vector(3, reversed),
            Err(AlgebraError::InvalidArgument { arg: "range", .. })
        ));
    }

    #[test]
    fn test_unsamplable_float_ranges_rejected() {
        let mut gen = RandomMatrixGenerator::new(1);
        for range in [
            0.0..=f64::INFINITY,
            f64::NEG_INFINITY..=0.0,
            f64::NAN..=1.0,
            -f64::MAX..=f64::MAX,
        ] {
            assert!(matches!(
                gen.random_vector(3, range),
                Err(AlgebraError::InvalidArgument { arg: "range", .. })
            ));
        }
        assert!(matches!(
            gen.random_dense_matrix(2, 2, 0.5, -f32::MAX..=f32::MAX),
            Err(AlgebraError::InvalidArgument { arg: "range", .. })
        ));
        assert!(gen.random_vector(3, i64::MIN..=i64::MAX).is_ok());
    }

    #[test]
    fn test_dense_and_vector() {
        let mut gen = RandomMatrixGenerator::new(3);
        let dense = gen.random_dense_matrix(10, 4, 1.0, 2.0..=3.0).unwrap();
        assert_eq!(dense.shape(), (10, 4));
        assert_eq!(dense.nnz(), 40);

        let v = random_vector(50, -5i64..=5, 9).unwrap();
        assert_eq!(v.len(), 50);
        assert!(v.iter().all(|x| (-5..=5).contains(x)));
    }
}
