//! # Multiplication engine
//!
//! The [`Engine`] owns a fixed-size worker pool and the
//! [`ParallelizationThresholds`] it was built with. For every product it
//! first makes a [`Plan`]: check the dimensions, decide whether the dense or
//! compressed kernels apply, and decide whether the work is large enough to
//! fan out. [`Engine::multiply_with`] skips the decision and runs a given
//! [`Strategy`], converting operands when the strategy asks for a storage
//! kind they are not in.
//!
//! Operands are only ever borrowed; nothing here mutates its inputs.

mod compressed;
mod dense;
mod partition;

use std::borrow::Cow;
use std::fmt;

use log::debug;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::{AlgebraError, Result};
use crate::matrix::{CompressedMatrix, DenseMatrix, Matrix, Scalar, StorageOrder, Vector};
use crate::params::ParallelizationThresholds;

use partition::Execution;

/// One side of a product
pub enum Operand<'a, T> {
    Dense(&'a DenseMatrix<T>),
    Compressed(&'a CompressedMatrix<T>),
    /// A 1×k row when on the left, a k×1 column when on the right
    Vector(&'a Vector<T>),
}

impl<T> Clone for Operand<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Operand<'_, T> {}

impl<'a, T> From<&'a DenseMatrix<T>> for Operand<'a, T> {
    fn from(m: &'a DenseMatrix<T>) -> Self {
        Operand::Dense(m)
    }
}

impl<'a, T> From<&'a CompressedMatrix<T>> for Operand<'a, T> {
    fn from(m: &'a CompressedMatrix<T>) -> Self {
        Operand::Compressed(m)
    }
}

impl<'a, T> From<&'a Vector<T>> for Operand<'a, T> {
    fn from(v: &'a Vector<T>) -> Self {
        Operand::Vector(v)
    }
}

/// Which side of the product an operand sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

impl<T: Scalar> Operand<'_, T> {
    fn shape(&self, side: Side) -> (usize, usize) {
        match (self, side) {
            (Operand::Dense(m), _) => m.shape(),
            (Operand::Compressed(m), _) => m.shape(),
            (Operand::Vector(v), Side::Left) => (1, v.len()),
            (Operand::Vector(v), Side::Right) => (v.len(), 1),
        }
    }

    fn is_vector(&self) -> bool {
        matches!(self, Operand::Vector(_))
    }
}

/// The four execution paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    DenseSequential,
    DenseParallel,
    CompressedSequential,
    CompressedParallel,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Strategy::DenseSequential,
        Strategy::DenseParallel,
        Strategy::CompressedSequential,
        Strategy::CompressedParallel,
    ];

    fn pick(compressed: bool, parallel: bool) -> Self {
        match (compressed, parallel) {
            (false, false) => Strategy::DenseSequential,
            (false, true) => Strategy::DenseParallel,
            (true, false) => Strategy::CompressedSequential,
            (true, true) => Strategy::CompressedParallel,
        }
    }

    pub fn is_parallel(self) -> bool {
        matches!(self, Strategy::DenseParallel | Strategy::CompressedParallel)
    }

    pub fn is_compressed(self) -> bool {
        matches!(
            self,
            Strategy::CompressedSequential | Strategy::CompressedParallel
        )
    }

    /// Short label used in reports
    pub fn name(self) -> &'static str {
        match self {
            Strategy::DenseSequential => "dense-sequential",
            Strategy::DenseParallel => "dense-parallel",
            Strategy::CompressedSequential => "compressed-sequential",
            Strategy::CompressedParallel => "compressed-parallel",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Shape class of a product
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductKind {
    MatrixMatrix,
    MatrixVector,
    VectorMatrix,
    /// Row times column: a single dot product
    VectorVector,
}

/// What the engine decided to do for a pair of operands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plan {
    pub strategy: Strategy,
    pub kind: ProductKind,
    /// Shape of the result; vector results report (len, 1)
    pub output: (usize, usize),
}

/// Result of a multiplication
#[derive(Clone)]
pub enum Product<T> {
    Dense(DenseMatrix<T>),
    /// CSR, entries that cancelled to zero are not stored
    Compressed(CompressedMatrix<T>),
    Vector(Vector<T>),
}

impl<T: Scalar> Product<T> {
    /// Result shape; a vector is reported as a column
    pub fn shape(&self) -> (usize, usize) {
        match self {
            Product::Dense(m) => m.shape(),
            Product::Compressed(m) => m.shape(),
            Product::Vector(v) => (v.len(), 1),
        }
    }

    /// Dense copy for comparisons; a vector becomes an n×1 column
    pub fn to_dense(&self) -> DenseMatrix<T> {
        match self {
            Product::Dense(m) => m.clone(),
            Product::Compressed(m) => m.to_dense(),
            Product::Vector(v) => {
                DenseMatrix::from_array(v.view().insert_axis(ndarray::Axis(1)))
            }
        }
    }

    pub fn into_vector(self) -> Option<Vector<T>> {
        match self {
            Product::Vector(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_compressed(self) -> Option<CompressedMatrix<T>> {
        match self {
            Product::Compressed(m) => Some(m),
            _ => None,
        }
    }
}

impl<T: Scalar> fmt::Debug for Product<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Product::Dense(m) => write!(f, "Product::Dense({m:?})"),
            Product::Compressed(m) => write!(f, "Product::Compressed({m:?})"),
            Product::Vector(v) => write!(f, "Product::Vector({v})"),
        }
    }
}

/// Adaptive matrix multiplication engine
pub struct Engine {
    thresholds: ParallelizationThresholds,
    pool: ThreadPool,
}

impl Engine {
    /// Builds an engine with its own pool of `thresholds.n_threads` workers
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for unusable thresholds, `WorkerPool` if the pool
    /// cannot be started.
    pub fn new(thresholds: ParallelizationThresholds) -> Result<Self> {
        thresholds.validate()?;
        let pool = ThreadPoolBuilder::new()
            .num_threads(thresholds.n_threads)
            .thread_name(|i| format!("matalg-worker-{i}"))
            .build()?;
        debug!(
            "engine started with {} workers, limits {}x{} ({:?})",
            thresholds.n_threads,
            thresholds.nrows_limit,
            thresholds.ncols_limit,
            thresholds.boundary
        );
        Ok(Self { thresholds, pool })
    }

    pub fn thresholds(&self) -> &ParallelizationThresholds {
        &self.thresholds
    }

    /// Number of row blocks parallel kernels split their output into
    pub fn workers(&self) -> usize {
        self.thresholds.n_threads
    }

    /// Checks dimensions and chooses a strategy for `a × b`
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` when `a.cols != b.rows`.
    pub fn plan<T: Scalar>(&self, a: &Operand<'_, T>, b: &Operand<'_, T>) -> Result<Plan> {
        let lhs = a.shape(Side::Left);
        let rhs = b.shape(Side::Right);
        if lhs.1 != rhs.0 {
            return Err(AlgebraError::DimensionMismatch { lhs, rhs });
        }
        let output = (lhs.0, rhs.1);
        let limits = &self.thresholds;

        let plan = match (a, b) {
            (Operand::Vector(_), Operand::Vector(_)) => Plan {
                strategy: Strategy::DenseSequential,
                kind: ProductKind::VectorVector,
                output: (1, 1),
            },
            (Operand::Vector(_), matrix) | (matrix, Operand::Vector(_)) => {
                let (rows, cols) = matrix.shape(Side::Left);
                let parallel = limits.exceeds_rows(rows) || limits.exceeds_cols(cols);
                let compressed = matches!(matrix, Operand::Compressed(_));
                let (kind, len) = if a.is_vector() {
                    (ProductKind::VectorMatrix, cols)
                } else {
                    (ProductKind::MatrixVector, rows)
                };
                Plan {
                    strategy: Strategy::pick(compressed, parallel),
                    kind,
                    output: (len, 1),
                }
            }
            (Operand::Dense(_), Operand::Dense(_)) => {
                let parallel = limits.exceeds_rows(output.0) || limits.exceeds_cols(output.1);
                Plan {
                    strategy: Strategy::pick(false, parallel),
                    kind: ProductKind::MatrixMatrix,
                    output,
                }
            }
            _ => Plan {
                strategy: Strategy::pick(true, limits.exceeds_rows(output.0)),
                kind: ProductKind::MatrixMatrix,
                output,
            },
        };

        debug!(
            "plan {:?} x {:?}: {} ({:?})",
            lhs, rhs, plan.strategy, plan.kind
        );
        Ok(plan)
    }

    /// Multiplies `a × b` with the planned strategy
    pub fn multiply<'a, T: Scalar>(
        &self,
        a: impl Into<Operand<'a, T>>,
        b: impl Into<Operand<'a, T>>,
    ) -> Result<Product<T>> {
        let (a, b) = (a.into(), b.into());
        let plan = self.plan(&a, &b)?;
        Ok(self.execute(a, b, plan))
    }

    /// Multiplies `a × b` with a forced strategy
    ///
    /// Operands not stored the way the strategy expects are converted first:
    /// dense strategies decompress, compressed strategies compress to CSR.
    pub fn multiply_with<'a, T: Scalar>(
        &self,
        a: impl Into<Operand<'a, T>>,
        b: impl Into<Operand<'a, T>>,
        strategy: Strategy,
    ) -> Result<Product<T>> {
        let (a, b) = (a.into(), b.into());
        let plan = Plan {
            strategy,
            ..self.plan(&a, &b)?
        };
        Ok(self.execute(a, b, plan))
    }

    fn execution(&self, strategy: Strategy) -> Execution<'_> {
        if strategy.is_parallel() {
            Execution::Parallel {
                pool: &self.pool,
                workers: self.workers(),
            }
        } else {
            Execution::Sequential
        }
    }

    fn execute<T: Scalar>(&self, a: Operand<'_, T>, b: Operand<'_, T>, plan: Plan) -> Product<T> {
        let exec = self.execution(plan.strategy);
        let compressed = plan.strategy.is_compressed();

        match (a.split(), b.split()) {
            (Err(x), Err(y)) => {
                Product::Vector(Vector::from_elem(1, dense::dot(x.view(), y.view())))
            }
            (Ok(m), Err(x)) => Product::Vector(matrix_vector(m, x, compressed, exec)),
            (Err(x), Ok(m)) => Product::Vector(vector_matrix(x, m, compressed, exec)),
            (Ok(a), Ok(b)) => matrix_matrix(a, b, compressed, exec),
        }
    }
}

/// A matrix operand, once vectors have been split off
#[derive(Clone, Copy)]
enum MatrixRef<'a, T> {
    Dense(&'a DenseMatrix<T>),
    Compressed(&'a CompressedMatrix<T>),
}

impl<'a, T: Scalar> MatrixRef<'a, T> {
    fn to_dense(self) -> Cow<'a, DenseMatrix<T>> {
        match self {
            MatrixRef::Dense(m) => Cow::Borrowed(m),
            MatrixRef::Compressed(m) => Cow::Owned(m.to_dense()),
        }
    }
}

impl<'a, T> Operand<'a, T> {
    fn split(self) -> std::result::Result<MatrixRef<'a, T>, &'a Vector<T>> {
        match self {
            Operand::Dense(m) => Ok(MatrixRef::Dense(m)),
            Operand::Compressed(m) => Ok(MatrixRef::Compressed(m)),
            Operand::Vector(v) => Err(v),
        }
    }
}

fn matrix_matrix<T: Scalar>(
    a: MatrixRef<'_, T>,
    b: MatrixRef<'_, T>,
    compressed: bool,
    exec: Execution<'_>,
) -> Product<T> {
    if !compressed {
        let c = dense::matmul(a.to_dense().as_array(), b.to_dense().as_array(), exec);
        return Product::Dense(DenseMatrix::from_owned_array(c));
    }

    let c = match (a, b) {
        (MatrixRef::Compressed(a), MatrixRef::Compressed(b)) => {
            let a = a.to_order(StorageOrder::RowMajor);
            let b = b.to_order(StorageOrder::RowMajor);
            return Product::Compressed(compressed::spgemm(&a, &b, exec));
        }
        (MatrixRef::Compressed(a), MatrixRef::Dense(b)) => {
            let a = a.to_order(StorageOrder::RowMajor);
            compressed::sparse_dense(&a, b.as_array(), exec)
        }
        (MatrixRef::Dense(a), MatrixRef::Compressed(b)) => {
            let b = b.to_order(StorageOrder::RowMajor);
            compressed::dense_sparse(a.as_array(), &b, exec)
        }
        (MatrixRef::Dense(a), MatrixRef::Dense(b)) => {
            let a = a.compress(StorageOrder::RowMajor);
            compressed::sparse_dense(&a, b.as_array(), exec)
        }
    };
    Product::Dense(DenseMatrix::from_owned_array(c))
}

/// M·x
fn matrix_vector<T: Scalar>(
    matrix: MatrixRef<'_, T>,
    x: &Vector<T>,
    compressed: bool,
    exec: Execution<'_>,
) -> Vector<T> {
    match (matrix, compressed) {
        (MatrixRef::Compressed(m), true) => match m.order() {
            StorageOrder::RowMajor => compressed::gather(m, x.view(), exec),
            StorageOrder::ColumnMajor => compressed::scatter(m, x.view(), exec),
        },
        (MatrixRef::Dense(m), true) => {
            compressed::gather(&m.compress(StorageOrder::RowMajor), x.view(), exec)
        }
        (m, false) => dense::matvec(m.to_dense().as_array(), x.view(), exec),
    }
}

/// xᵀ·M, computed as Mᵀ·x
fn vector_matrix<T: Scalar>(
    x: &Vector<T>,
    matrix: MatrixRef<'_, T>,
    compressed: bool,
    exec: Execution<'_>,
) -> Vector<T> {
    match (matrix, compressed) {
        (MatrixRef::Compressed(m), true) => match m.order() {
            StorageOrder::RowMajor => compressed::scatter(m, x.view(), exec),
            StorageOrder::ColumnMajor => compressed::gather(m, x.view(), exec),
        },
        (MatrixRef::Dense(m), true) => {
            compressed::gather(&m.compress(StorageOrder::ColumnMajor), x.view(), exec)
        }
        (m, false) => dense::matvec(m.to_dense().as_array().t(), x.view(), exec),
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("thresholds", &self.thresholds)
            .field("pool_threads", &self.pool.current_num_threads())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ThresholdBoundary;
    use ndarray::arr1;

    fn two_by_two() -> (DenseMatrix<i64>, DenseMatrix<i64>) {
        (
            DenseMatrix::from_rows(&[vec![1, 2], vec![3, 4]]).unwrap(),
            DenseMatrix::from_rows(&[vec![5, 6], vec![7, 8]]).unwrap(),
        )
    }

    fn engine(thresholds: ParallelizationThresholds) -> Engine {
        Engine::new(thresholds.with_threads(2)).unwrap()
    }

    #[test]
    fn test_plan_dense_respects_limits() {
        let small = DenseMatrix::<f64>::zeros(10, 10);
        let tall = DenseMatrix::<f64>::zeros(20, 10);
        let limits = ParallelizationThresholds::default()
            .with_nrows_limit(10)
            .with_ncols_limit(10);
        let engine = engine(limits);

        let plan = engine.plan(&Operand::Dense(&small), &Operand::Dense(&small)).unwrap();
        assert_eq!(plan.strategy, Strategy::DenseSequential);
        assert_eq!(plan.output, (10, 10));

        let plan = engine.plan(&Operand::Dense(&tall), &Operand::Dense(&small)).unwrap();
        assert_eq!(plan.strategy, Strategy::DenseParallel);
    }

    #[test]
    fn test_plan_inclusive_boundary() {
        let m = DenseMatrix::<f64>::zeros(10, 10);
        let limits = ParallelizationThresholds::default()
            .with_nrows_limit(10)
            .with_ncols_limit(10)
            .with_boundary(ThresholdBoundary::Inclusive);
        let plan = engine(limits).plan(&Operand::Dense(&m), &Operand::Dense(&m)).unwrap();
        assert_eq!(plan.strategy, Strategy::DenseParallel);
    }

    #[test]
    fn test_plan_compressed_and_vector() {
        let engine = engine(ParallelizationThresholds::default());
        let dense = DenseMatrix::<f64>::zeros(3, 4);
        let sparse = CompressedMatrix::<f64>::zeros(4, 2, StorageOrder::RowMajor);
        let x = arr1(&[1.0, 2.0, 3.0, 4.0]);
        let row = arr1(&[1.0, 2.0, 3.0]);

        let plan = engine.plan(&Operand::Dense(&dense), &Operand::Compressed(&sparse)).unwrap();
        assert_eq!(plan.strategy, Strategy::CompressedSequential);
        assert_eq!(plan.output, (3, 2));

        let plan = engine.plan(&Operand::Dense(&dense), &Operand::Vector(&x)).unwrap();
        assert_eq!(plan.kind, ProductKind::MatrixVector);
        assert_eq!(plan.strategy, Strategy::DenseSequential);
        assert_eq!(plan.output, (3, 1));

        let plan = engine.plan(&Operand::Vector(&row), &Operand::Dense(&dense)).unwrap();
        assert_eq!(plan.kind, ProductKind::VectorMatrix);
        assert_eq!(plan.output, (4, 1));
    }

    #[test]
    fn test_dimension_mismatch() {
        let engine = engine(ParallelizationThresholds::default());
        let a = DenseMatrix::<f64>::zeros(2, 3);
        let b = DenseMatrix::<f64>::zeros(4, 2);
        let err = engine.multiply(&a, &b).unwrap_err();
        assert!(matches!(
            err,
            AlgebraError::DimensionMismatch {
                lhs: (2, 3),
                rhs: (4, 2)
            }
        ));
    }

    #[test]
    fn test_fixed_product_on_every_strategy() {
        let engine = engine(ParallelizationThresholds::default());
        let (a, b) = two_by_two();
        let expected = DenseMatrix::from_rows(&[vec![19, 22], vec![43, 50]]).unwrap();

        for strategy in Strategy::ALL {
            let product = engine.multiply_with(&a, &b, strategy).unwrap();
            assert_eq!(product.to_dense(), expected, "strategy {strategy}");
        }

        let ca = a.compress(StorageOrder::RowMajor);
        let cb = b.compress(StorageOrder::ColumnMajor);
        let product = engine.multiply(&ca, &cb).unwrap();
        assert!(matches!(product, Product::Compressed(_)));
        assert_eq!(product.to_dense(), expected);

        let product = engine.multiply(&a, &cb).unwrap();
        assert!(matches!(product, Product::Dense(_)));
        assert_eq!(product.to_dense(), expected);
    }

    #[test]
    fn test_vector_products() {
        let engine = engine(ParallelizationThresholds::always_parallel());
        let (a, _) = two_by_two();
        let x = arr1(&[1, 1]);

        let y = engine.multiply(&a, &x).unwrap().into_vector().unwrap();
        assert_eq!(y, arr1(&[3, 7]));

        let y = engine.multiply(&x, &a).unwrap().into_vector().unwrap();
        assert_eq!(y, arr1(&[4, 6]));

        for order in [StorageOrder::RowMajor, StorageOrder::ColumnMajor] {
            let c = a.compress(order);
            let y = engine.multiply(&c, &x).unwrap().into_vector().unwrap();
            assert_eq!(y, arr1(&[3, 7]));
            let y = engine.multiply(&x, &c).unwrap().into_vector().unwrap();
            assert_eq!(y, arr1(&[4, 6]));
        }

        let dot = engine.multiply(&x, &arr1(&[2, 3])).unwrap();
        assert_eq!(dot.shape(), (1, 1));
        assert_eq!(dot.into_vector().unwrap()[0], 5);
    }

    #[test]
    fn test_inputs_untouched() {
        let engine = engine(ParallelizationThresholds::always_parallel());
        let (a, b) = two_by_two();
        let (a_copy, b_copy) = (a.clone(), b.clone());
        engine.multiply(&a, &b).unwrap();
        assert_eq!(a, a_copy);
        assert_eq!(b, b_copy);
    }
}
