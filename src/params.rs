//! Parallelization thresholds and reader buffering parameters
//!
//! A single [`ParallelizationThresholds`] value is built once at startup and
//! handed to [`Engine::new`](crate::multiply::Engine::new) and
//! [`MatrixMarketReader::new`](crate::market::MatrixMarketReader::new).
//! Neither keeps a mutable handle to it, so the values cannot change while a
//! multiplication is in flight.

use crate::error::{AlgebraError, Result};

/// Row count above which multiplication switches to the parallel kernels.
pub const NROWS_PARALLELIZATION_LIMIT: usize = 1000;

/// Column count above which multiplication switches to the parallel kernels.
pub const NCOLS_PARALLELIZATION_LIMIT: usize = 1000;

/// Size in bytes of the read buffer used when parsing Matrix Market input.
pub const BUFFER_SIZE: usize = 8192;

/// How a dimension that sits exactly on a limit is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThresholdBoundary {
    /// Parallelize only when the dimension is strictly greater than the limit
    #[default]
    Exclusive,
    /// Parallelize when the dimension is greater than or equal to the limit
    Inclusive,
}

/// Process-wide thresholds consulted by the engine and the reader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParallelizationThresholds {
    /// Output rows above which the parallel kernels are used
    pub nrows_limit: usize,

    /// Output columns above which the parallel dense kernel is used
    pub ncols_limit: usize,

    /// Read buffer size in bytes for the Matrix Market reader
    pub buffer_size: usize,

    /// Number of worker threads in the engine's pool
    pub n_threads: usize,

    /// Tie-break for dimensions equal to a limit
    pub boundary: ThresholdBoundary,
}

impl Default for ParallelizationThresholds {
    fn default() -> Self {
        Self {
            nrows_limit: NROWS_PARALLELIZATION_LIMIT,
            ncols_limit: NCOLS_PARALLELIZATION_LIMIT,
            buffer_size: BUFFER_SIZE,
            n_threads: num_cpus::get(),
            boundary: ThresholdBoundary::Exclusive,
        }
    }
}

impl ParallelizationThresholds {
    pub fn with_nrows_limit(mut self, limit: usize) -> Self {
        self.nrows_limit = limit;
        self
    }

    pub fn with_ncols_limit(mut self, limit: usize) -> Self {
        self.ncols_limit = limit;
        self
    }

    pub fn with_buffer_size(mut self, bytes: usize) -> Self {
        self.buffer_size = bytes;
        self
    }

    pub fn with_threads(mut self, n_threads: usize) -> Self {
        self.n_threads = n_threads;
        self
    }

    pub fn with_boundary(mut self, boundary: ThresholdBoundary) -> Self {
        self.boundary = boundary;
        self
    }

    /// Thresholds that never select a parallel kernel
    pub fn always_sequential() -> Self {
        Self::default()
            .with_nrows_limit(usize::MAX)
            .with_ncols_limit(usize::MAX)
            .with_boundary(ThresholdBoundary::Exclusive)
    }

    /// Thresholds that select a parallel kernel for any non-empty output
    pub fn always_parallel() -> Self {
        Self::default()
            .with_nrows_limit(0)
            .with_ncols_limit(0)
            .with_boundary(ThresholdBoundary::Exclusive)
    }

    /// Read overrides from `MATALG_NROWS_LIMIT`, `MATALG_NCOLS_LIMIT`,
    /// `MATALG_BUFFER_SIZE` and `MATALG_THREADS`, keeping defaults for
    /// unset variables.
    pub fn from_env() -> Result<Self> {
        let mut thresholds = Self::default();
        if let Some(v) = env_usize("MATALG_NROWS_LIMIT")? {
            thresholds.nrows_limit = v;
        }
        if let Some(v) = env_usize("MATALG_NCOLS_LIMIT")? {
            thresholds.ncols_limit = v;
        }
        if let Some(v) = env_usize("MATALG_BUFFER_SIZE")? {
            thresholds.buffer_size = v;
        }
        if let Some(v) = env_usize("MATALG_THREADS")? {
            thresholds.n_threads = v;
        }
        thresholds.validate()?;
        Ok(thresholds)
    }

    /// Check that the values can drive a reader and a worker pool
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(AlgebraError::invalid_argument(
                "buffer_size",
                "must be at least one byte",
            ));
        }
        if self.n_threads == 0 {
            return Err(AlgebraError::invalid_argument(
                "n_threads",
                "must be at least one worker",
            ));
        }
        Ok(())
    }

    /// Whether `rows` output rows exceed the row limit
    pub fn exceeds_rows(&self, rows: usize) -> bool {
        self.exceeds(rows, self.nrows_limit)
    }

    /// Whether `cols` output columns exceed the column limit
    pub fn exceeds_cols(&self, cols: usize) -> bool {
        self.exceeds(cols, self.ncols_limit)
    }

    fn exceeds(&self, value: usize, limit: usize) -> bool {
        match self.boundary {
            ThresholdBoundary::Exclusive => value > limit,
            ThresholdBoundary::Inclusive => value >= limit,
        }
    }
}

fn env_usize(key: &'static str) -> Result<Option<usize>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| AlgebraError::invalid_argument(key, format!("'{raw}' is not a count"))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_constants() {
        let t = ParallelizationThresholds::default();
        assert_eq!(t.nrows_limit, 1000);
        assert_eq!(t.ncols_limit, 1000);
        assert_eq!(t.buffer_size, 8192);
        assert!(t.n_threads >= 1);
        assert!(t.validate().is_ok());
    }

    #[test]
    fn test_boundary_tie_break() {
        let exclusive = ParallelizationThresholds::default().with_nrows_limit(100);
        assert!(!exclusive.exceeds_rows(100));
        assert!(exclusive.exceeds_rows(101));

        let inclusive = exclusive.with_boundary(ThresholdBoundary::Inclusive);
        assert!(inclusive.exceeds_rows(100));
        assert!(!inclusive.exceeds_rows(99));
    }

    #[test]
    fn test_validate_rejects_zero_buffer() {
        let t = ParallelizationThresholds::default().with_buffer_size(0);
        assert!(matches!(
            t.validate(),
            Err(AlgebraError::InvalidArgument { arg: "buffer_size", .. })
        ));
    }

    #[test]
    fn test_always_presets() {
        assert!(!ParallelizationThresholds::always_sequential().exceeds_rows(usize::MAX - 1));
        assert!(ParallelizationThresholds::always_parallel().exceeds_rows(1));
        assert!(ParallelizationThresholds::always_parallel().exceeds_cols(1));
    }
}
