//! Named correctness cases run against an engine

use std::any::Any;
use std::fmt::Display;
use std::panic::{catch_unwind, AssertUnwindSafe};

use log::{info, warn};

use crate::error::{AlgebraError, Result};
use crate::harness::report::{CaseOutcome, Reporter};
use crate::harness::{matrices_match, vectors_match};
use crate::matrix::{
    CompressedMatrix, DenseMatrix, DiagonalView, Matrix, Norm, NormType, ResizePolicy,
    StorageOrder,
};
use crate::multiply::{Engine, Operand, Strategy};
use crate::utils::random::RandomMatrixGenerator;

/// What a case returns: `Err` carries the failure message
pub type CaseResult = std::result::Result<(), String>;

type CaseFn = Box<dyn Fn(&Engine) -> CaseResult>;

/// Pass/fail counts of one suite run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SuiteSummary {
    pub passed: usize,
    pub failed: usize,
}

impl SuiteSummary {
    pub fn total(&self) -> usize {
        self.passed + self.failed
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// An ordered list of named cases
///
/// A case fails by returning `Err` or by panicking; either way the remaining
/// cases still run.
#[derive(Default)]
pub struct CorrectnessSuite {
    cases: Vec<(String, CaseFn)>,
}

impl CorrectnessSuite {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in cases covering products, norms, resize, diagonal views,
    /// dimension checks and storage conversion
    pub fn standard() -> Self {
        let mut suite = Self::new();
        for strategy in Strategy::ALL {
            suite.add_case(format!("2x2 product ({strategy})"), move |engine| {
                two_by_two(engine, strategy)
            });
        }
        suite.add_case("4x4 norms", |_| fixed_norms());
        suite.add_case("resize", |_| resize());
        suite.add_case("diagonal view", |_| diagonal_view());
        suite.add_case("dimension mismatch", dimension_mismatch);
        suite.add_case("compressed round trip", |_| compressed_round_trip());
        suite.add_case("matrix-vector", matrix_vector);
        suite
    }

    pub fn add_case<F>(&mut self, name: impl Into<String>, case: F) -> &mut Self
    where
        F: Fn(&Engine) -> CaseResult + 'static,
    {
        self.cases.push((name.into(), Box::new(case)));
        self
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Runs every case in order and reports each outcome
    ///
    /// Only reporter failures are returned as errors.
    pub fn run(&self, engine: &Engine, reporter: &mut dyn Reporter) -> Result<SuiteSummary> {
        let mut summary = SuiteSummary::default();

        for (name, case) in &self.cases {
            let detail = match catch_unwind(AssertUnwindSafe(|| case(engine))) {
                Ok(Ok(())) => None,
                Ok(Err(message)) => Some(message),
                Err(payload) => Some(format!("panicked: {}", panic_message(&*payload))),
            };

            let passed = detail.is_none();
            if passed {
                summary.passed += 1;
            } else {
                summary.failed += 1;
                warn!("case '{}' failed", name);
            }
            reporter.case(&CaseOutcome {
                name: name.clone(),
                passed,
                detail,
            })?;
        }

        info!(
            "correctness suite: {} passed, {} failed",
            summary.passed, summary.failed
        );
        Ok(summary)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn fail<E: Display>(err: E) -> String {
    err.to_string()
}

fn ensure(condition: bool, message: impl FnOnce() -> String) -> CaseResult {
    if condition {
        Ok(())
    } else {
        Err(message())
    }
}

fn two_by_two(engine: &Engine, strategy: Strategy) -> CaseResult {
    let a = DenseMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).map_err(fail)?;
    let b = DenseMatrix::from_rows(&[vec![5.0, 6.0], vec![7.0, 8.0]]).map_err(fail)?;
    let expected = DenseMatrix::from_rows(&[vec![19.0, 22.0], vec![43.0, 50.0]]).map_err(fail)?;

    let product = engine
        .multiply_with(Operand::Dense(&a), Operand::Dense(&b), strategy)
        .map_err(fail)?;
    let got = product.to_dense();
    ensure(matrices_match(&got, &expected, 1e-12), || {
        format!("expected {expected:?}, got {got:?}")
    })
}

fn fixed_norms() -> CaseResult {
    let m = DenseMatrix::from_rows(&[
        vec![1.0, -2.0, 0.0, 0.0],
        vec![0.0, 3.0, 0.0, -4.0],
        vec![5.0, 0.0, 6.0, 0.0],
        vec![0.0, 0.0, 0.0, 7.0],
    ])
    .map_err(fail)?;
    let expected = [
        (NormType::One, 11.0),
        (NormType::Infinity, 11.0),
        (NormType::Frobenius, 140f64.sqrt()),
    ];

    let compressed = m.compress(StorageOrder::ColumnMajor);
    for (kind, want) in expected {
        for (storage, got) in [("dense", m.norm(kind)), ("compressed", compressed.norm(kind))] {
            ensure((got - want).abs() < 1e-12, || {
                format!("{storage} {kind:?} norm: expected {want}, got {got}")
            })?;
        }
    }
    Ok(())
}

fn resize() -> CaseResult {
    let mut dense = DenseMatrix::<f64>::identity(3);
    let dropped = dense.resize(2, 4, ResizePolicy::Preserve);
    ensure(dropped == 1 && dense.shape() == (2, 4), || {
        format!("dense resize dropped {dropped}, shape {:?}", dense.shape())
    })?;
    ensure(dense.get(1, 1).map_err(fail)? == 1.0, || "dense resize lost (1, 1)".into())?;

    let mut compressed = CompressedMatrix::<f64>::identity(3, StorageOrder::RowMajor);
    let dropped = compressed.resize(4, 2);
    ensure(dropped == 1 && compressed.nnz() == 2, || {
        format!("compressed resize dropped {dropped}, kept {}", compressed.nnz())
    })?;
    ensure(compressed.get(3, 1).map_err(fail)? == 0.0, || {
        "new row is not empty".into()
    })
}

fn diagonal_view() -> CaseResult {
    let mut m = DenseMatrix::<f64>::identity(4);
    let view = DiagonalView::main(&m).map_err(fail)?;
    let diag = view.to_vec(&m).map_err(fail)?;
    ensure(diag == vec![1.0; 4], || format!("identity diagonal was {diag:?}"))?;

    view.set(&mut m, 2, 9.0).map_err(fail)?;
    ensure(m.get(2, 2).map_err(fail)? == 9.0, || {
        "write through the view was not visible".into()
    })?;

    m.resize(5, 5, ResizePolicy::Preserve);
    match view.at(&m, 0) {
        Err(AlgebraError::UseAfterInvalidation { .. }) => Ok(()),
        other => Err(format!("stale view access returned {other:?}")),
    }
}

fn dimension_mismatch(engine: &Engine) -> CaseResult {
    let a = DenseMatrix::<f64>::zeros(2, 3);
    let b = DenseMatrix::<f64>::zeros(4, 2);
    match engine.multiply(Operand::Dense(&a), Operand::Dense(&b)) {
        Err(AlgebraError::DimensionMismatch { lhs, rhs }) => {
            ensure(lhs == (2, 3) && rhs == (4, 2), || {
                format!("mismatch reported {lhs:?} x {rhs:?}")
            })
        }
        Err(err) => Err(format!("wrong error: {err}")),
        Ok(_) => Err("2x3 times 4x2 succeeded".into()),
    }
}

fn compressed_round_trip() -> CaseResult {
    let mut generator = RandomMatrixGenerator::new(11);
    let dense = generator
        .random_dense_matrix(20, 30, 0.3, -5.0..=5.0)
        .map_err(fail)?;
    for order in [StorageOrder::RowMajor, StorageOrder::ColumnMajor] {
        let back = dense.compress(order).to_dense();
        ensure(back == dense, || format!("{order:?} round trip changed values"))?;
    }
    Ok(())
}

fn matrix_vector(engine: &Engine) -> CaseResult {
    let mut generator = RandomMatrixGenerator::new(5);
    let a = generator
        .random_sparse_matrix(50, 40, 0.2, -1.0..=1.0, StorageOrder::RowMajor)
        .map_err(fail)?;
    let x = generator.random_vector(40, -1.0..=1.0).map_err(fail)?;
    let dense = a.to_dense();

    let reference = engine
        .multiply_with(Operand::Dense(&dense), Operand::Vector(&x), Strategy::DenseSequential)
        .map_err(fail)?
        .into_vector()
        .ok_or_else(|| "matrix-vector product was not a vector".to_string())?;

    for strategy in Strategy::ALL {
        let got = engine
            .multiply_with(Operand::Compressed(&a), Operand::Vector(&x), strategy)
            .map_err(fail)?
            .into_vector()
            .ok_or_else(|| format!("{strategy} did not return a vector"))?;
        ensure(vectors_match(&got, &reference, 1e-9), || {
            format!("{strategy} differs from dense-sequential")
        })?;
    }
    Ok(())
}
