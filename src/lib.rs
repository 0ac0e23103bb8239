//! # matalg: dense and compressed matrices with an adaptive multiplication engine
//!
//! matalg stores matrices either densely (every cell, row-major) or in
//! compressed sparse form (CSR or CSC), and multiplies them through an
//! [`Engine`] that picks a dense or compressed kernel and decides whether a
//! product is large enough to spread over its worker pool.
//!
//! ## Overview
//!
//! - [`DenseMatrix`] and [`CompressedMatrix`] share the [`Matrix`] /
//!   [`MatrixMut`] element-access traits
//! - [`DiagonalView`] reads and writes a diagonal in place and detects use
//!   after the backing matrix was resized
//! - [`Engine`] plans and runs products using [`ParallelizationThresholds`]
//! - [`MatrixMarketReader`] loads coordinate-format `.mtx` files
//! - [`harness`] times strategies against each other and runs correctness
//!   cases
//!
//! ## Usage
//!
//! ```
//! use matalg::{DenseMatrix, Engine, Operand, ParallelizationThresholds, StorageOrder};
//!
//! let a = DenseMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
//! let b = DenseMatrix::from_rows(&[vec![5.0, 6.0], vec![7.0, 8.0]]).unwrap();
//! let sparse_a = a.compress(StorageOrder::RowMajor);
//!
//! let engine = Engine::new(ParallelizationThresholds::default()).unwrap();
//! let dense = engine.multiply(Operand::Dense(&a), Operand::Dense(&b)).unwrap();
//! let mixed = engine.multiply(Operand::Compressed(&sparse_a), Operand::Dense(&b)).unwrap();
//!
//! assert_eq!(dense.to_dense(), mixed.to_dense());
//! ```

pub mod error;
pub mod harness;
pub mod market;
pub mod matrix;
pub mod multiply;
pub mod params;
pub mod utils;

// Re-export primary components
pub use error::{AlgebraError, Result};
pub use market::{write_matrix_market, write_matrix_market_path, MatrixMarketReader};
pub use matrix::{
    CompressedMatrix, DenseMatrix, DiagonalView, DuplicatePolicy, Matrix, MatrixMut, Norm,
    NormType, ResizePolicy, Scalar, StorageOrder, Vector,
};
pub use multiply::{Engine, Operand, Plan, Product, ProductKind, Strategy};
pub use params::{ParallelizationThresholds, ThresholdBoundary};
pub use utils::formats::{from_sprs, to_sprs};
pub use utils::random::{random_sparse_matrix, random_vector, RandomMatrixGenerator};
