//! # Benchmark and correctness harness
//!
//! Speed tests time the engine's strategies against each other on seeded
//! random workloads and hand every trial and mean to a [`Reporter`]. They
//! are diagnostic: a [`Comparison`] only counts as a regression when a
//! threshold has been configured. The [`CorrectnessSuite`] runs named cases
//! and keeps going when one of them fails or panics.

mod report;
mod suite;

use std::hint::black_box;
use std::path::Path;
use std::time::{Duration, Instant};

use log::info;

use crate::error::Result;
use crate::market::MatrixMarketReader;
use crate::matrix::{CompressedMatrix, Matrix, Scalar, StorageOrder, Vector};
use crate::multiply::{Engine, Operand, Strategy};
use crate::utils::approx_eq;
use crate::utils::random::RandomMatrixGenerator;

pub use report::{CaseOutcome, ConsoleReporter, CsvReporter, MemoryReporter, Reporter, TrialRecord};
pub use suite::{CaseResult, CorrectnessSuite, SuiteSummary};

/// Runs `f` `repetitions` times and returns the wall time of each run
pub fn time_trials<R, F: FnMut() -> R>(repetitions: usize, mut f: F) -> Vec<Duration> {
    (0..repetitions)
        .map(|_| {
            let start = Instant::now();
            black_box(f());
            start.elapsed()
        })
        .collect()
}

/// Timings of one strategy on one workload
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedReport {
    pub strategy: String,
    pub rows: usize,
    pub cols: usize,
    pub trials: Vec<Duration>,
}

impl SpeedReport {
    /// Mean trial time, zero when there were no trials
    pub fn mean(&self) -> Duration {
        if self.trials.is_empty() {
            return Duration::ZERO;
        }
        let total: Duration = self.trials.iter().sum();
        match u32::try_from(self.trials.len()) {
            Ok(n) => total / n,
            Err(_) => Duration::from_secs_f64(total.as_secs_f64() / self.trials.len() as f64),
        }
    }
}

/// A baseline and a candidate timed on the same workload
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub baseline: SpeedReport,
    pub candidate: SpeedReport,
    /// Allowed relative slowdown of the candidate before it counts as a regression
    pub regression_threshold: Option<f64>,
}

impl Comparison {
    /// Baseline mean over candidate mean; above 1 means the candidate is faster
    pub fn speedup(&self) -> f64 {
        let candidate = self.candidate.mean().as_secs_f64();
        if candidate == 0.0 {
            return f64::INFINITY;
        }
        self.baseline.mean().as_secs_f64() / candidate
    }

    /// True only when a threshold is set and the candidate exceeds
    /// `baseline * (1 + threshold)`
    pub fn regressed(&self) -> bool {
        match self.regression_threshold {
            Some(threshold) => {
                self.candidate.mean().as_secs_f64()
                    > self.baseline.mean().as_secs_f64() * (1.0 + threshold)
            }
            None => false,
        }
    }
}

/// Configuration of a speed-test run
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedTest {
    /// Square matrix sizes to test
    pub sizes: Vec<usize>,
    /// Fraction of stored cells in the random matrices
    pub density: f64,
    /// Repetitions per strategy and size
    pub trials: usize,
    pub seed: u64,
    pub regression_threshold: Option<f64>,
}

impl Default for SpeedTest {
    fn default() -> Self {
        Self {
            sizes: (1..=10).map(|k| k * 100).collect(),
            density: 0.05,
            trials: 5,
            seed: 42,
            regression_threshold: None,
        }
    }
}

impl SpeedTest {
    /// Dense sequential against compressed sequential matrix-vector products
    pub fn compressed_vs_dense(
        &self,
        engine: &Engine,
        reporter: &mut dyn Reporter,
    ) -> Result<Vec<Comparison>> {
        let mut generator = RandomMatrixGenerator::new(self.seed);
        let mut comparisons = Vec::with_capacity(self.sizes.len());

        for &n in &self.sizes {
            let (compressed, x) = self.workload(&mut generator, n)?;
            let dense = compressed.to_dense();

            let baseline = self.measure(
                engine,
                "dense",
                Operand::Dense(&dense),
                Operand::Vector(&x),
                Strategy::DenseSequential,
                reporter,
            )?;
            let candidate = self.measure(
                engine,
                "compressed",
                Operand::Compressed(&compressed),
                Operand::Vector(&x),
                Strategy::CompressedSequential,
                reporter,
            )?;
            comparisons.push(self.compare(baseline, candidate));
        }
        Ok(comparisons)
    }

    /// Compressed matrix-vector products, sequential against parallel
    pub fn parallel_vs_sequential(
        &self,
        engine: &Engine,
        reporter: &mut dyn Reporter,
    ) -> Result<Vec<Comparison>> {
        let mut generator = RandomMatrixGenerator::new(self.seed);
        let mut comparisons = Vec::with_capacity(self.sizes.len());

        for &n in &self.sizes {
            let (compressed, x) = self.workload(&mut generator, n)?;
            let baseline = self.measure(
                engine,
                Strategy::CompressedSequential.name(),
                Operand::Compressed(&compressed),
                Operand::Vector(&x),
                Strategy::CompressedSequential,
                reporter,
            )?;
            let candidate = self.measure(
                engine,
                Strategy::CompressedParallel.name(),
                Operand::Compressed(&compressed),
                Operand::Vector(&x),
                Strategy::CompressedParallel,
                reporter,
            )?;
            comparisons.push(self.compare(baseline, candidate));
        }
        Ok(comparisons)
    }

    /// Every strategy over CSR, CSC and dense storage of the same matrix
    pub fn all_strategies(
        &self,
        engine: &Engine,
        reporter: &mut dyn Reporter,
    ) -> Result<Vec<SpeedReport>> {
        let mut generator = RandomMatrixGenerator::new(self.seed);
        let mut reports = Vec::new();

        for &n in &self.sizes {
            let (csr, x) = self.workload(&mut generator, n)?;
            let csc = csr.to_order(StorageOrder::ColumnMajor).into_owned();
            let dense = csr.to_dense();

            for strategy in [Strategy::CompressedSequential, Strategy::CompressedParallel] {
                for (layout, matrix) in [("csr", &csr), ("csc", &csc)] {
                    reports.push(self.measure(
                        engine,
                        &format!("{}/{}", strategy.name(), layout),
                        Operand::Compressed(matrix),
                        Operand::Vector(&x),
                        strategy,
                        reporter,
                    )?);
                }
            }
            for strategy in [Strategy::DenseSequential, Strategy::DenseParallel] {
                reports.push(self.measure(
                    engine,
                    strategy.name(),
                    Operand::Dense(&dense),
                    Operand::Vector(&x),
                    strategy,
                    reporter,
                )?);
            }
        }
        Ok(reports)
    }

    /// Times every strategy on a matrix loaded from a Matrix Market file
    pub fn matrix_market<P: AsRef<Path>>(
        &self,
        engine: &Engine,
        path: P,
        reporter: &mut dyn Reporter,
    ) -> Result<Vec<SpeedReport>> {
        let matrix: CompressedMatrix<f64> =
            MatrixMarketReader::new(engine.thresholds()).read_path(path.as_ref())?;
        info!(
            "loaded {}: {}x{} with {} entries",
            path.as_ref().display(),
            matrix.rows(),
            matrix.cols(),
            matrix.nnz()
        );
        let x = RandomMatrixGenerator::new(self.seed).random_vector(matrix.cols(), -1.0..=1.0)?;
        let dense = matrix.to_dense();

        Strategy::ALL
            .into_iter()
            .map(|strategy| {
                let operand = if strategy.is_compressed() {
                    Operand::Compressed(&matrix)
                } else {
                    Operand::Dense(&dense)
                };
                self.measure(
                    engine,
                    strategy.name(),
                    operand,
                    Operand::Vector(&x),
                    strategy,
                    reporter,
                )
            })
            .collect()
    }

    fn workload(
        &self,
        generator: &mut RandomMatrixGenerator,
        n: usize,
    ) -> Result<(CompressedMatrix<f64>, Vector<f64>)> {
        let matrix =
            generator.random_sparse_matrix(n, n, self.density, -1.0..=1.0, StorageOrder::RowMajor)?;
        let x = generator.random_vector(n, -1.0..=1.0)?;
        Ok((matrix, x))
    }

    fn measure<T: Scalar>(
        &self,
        engine: &Engine,
        label: &str,
        a: Operand<'_, T>,
        b: Operand<'_, T>,
        strategy: Strategy,
        reporter: &mut dyn Reporter,
    ) -> Result<SpeedReport> {
        let plan = engine.plan(&a, &b)?;
        let (rows, cols) = match a {
            Operand::Dense(m) => m.shape(),
            Operand::Compressed(m) => m.shape(),
            Operand::Vector(_) => plan.output,
        };

        let trials = time_trials(self.trials, || engine.multiply_with(a, b, strategy));
        for (trial, &elapsed) in trials.iter().enumerate() {
            reporter.trial(&TrialRecord {
                strategy: label.to_string(),
                rows,
                cols,
                trial,
                elapsed,
            })?;
        }

        let report = SpeedReport {
            strategy: label.to_string(),
            rows,
            cols,
            trials,
        };
        reporter.report(&report)?;
        Ok(report)
    }

    fn compare(&self, baseline: SpeedReport, candidate: SpeedReport) -> Comparison {
        let comparison = Comparison {
            baseline,
            candidate,
            regression_threshold: self.regression_threshold,
        };
        info!(
            "{}x{}: {} vs {} speedup {:.2}{}",
            comparison.baseline.rows,
            comparison.baseline.cols,
            comparison.baseline.strategy,
            comparison.candidate.strategy,
            comparison.speedup(),
            if comparison.regressed() { " (regressed)" } else { "" }
        );
        comparison
    }
}

/// Shapes agree and every cell satisfies `|x - y| <= rel_tol * max(1, |x|, |y|)`
pub fn matrices_match<T, A, B>(a: &A, b: &B, rel_tol: f64) -> bool
where
    T: Scalar,
    A: Matrix<T> + ?Sized,
    B: Matrix<T> + ?Sized,
{
    if a.shape() != b.shape() {
        return false;
    }
    (0..a.rows()).all(|i| {
        (0..a.cols()).all(|j| match (a.get(i, j), b.get(i, j)) {
            (Ok(x), Ok(y)) => approx_eq(x.to_f64(), y.to_f64(), rel_tol),
            _ => false,
        })
    })
}

/// Element-wise form of [`matrices_match`] for vectors
pub fn vectors_match<T: Scalar>(a: &Vector<T>, b: &Vector<T>, rel_tol: f64) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b.iter())
            .all(|(&x, &y)| approx_eq(x.to_f64(), y.to_f64(), rel_tol))
}
