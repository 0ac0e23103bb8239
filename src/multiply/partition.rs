//! Fan-out helpers shared by the parallel kernels
//!
//! Output rows are split into `workers` contiguous blocks of
//! `ceil(rows / workers)` rows. Each block is handed to exactly one task, so
//! no two tasks ever write the same output cell and the result needs no
//! locking. Every helper returns only after all blocks are done.

use std::ops::Range;

use ndarray::{Array1, Array2, ArrayViewMut1, Axis};
use rayon::prelude::*;
use rayon::ThreadPool;

use crate::matrix::Scalar;

/// How a kernel should run
#[derive(Clone, Copy)]
pub(crate) enum Execution<'p> {
    Sequential,
    Parallel { pool: &'p ThreadPool, workers: usize },
}

/// Rows per block when `len` rows are spread over `workers` tasks
pub(crate) fn block_len(len: usize, workers: usize) -> usize {
    let workers = workers.max(1);
    ((len + workers - 1) / workers).max(1)
}

/// Deterministic contiguous ranges covering `0..len`
pub(crate) fn partition(len: usize, workers: usize) -> Vec<Range<usize>> {
    let block = block_len(len, workers);
    (0..len)
        .step_by(block)
        .map(|start| start..(start + block).min(len))
        .collect()
}

/// Allocates a `rows` x `cols` zero matrix and lets `fill` accumulate each row
pub(crate) fn fill_rows<T, F>(rows: usize, cols: usize, exec: Execution<'_>, fill: F) -> Array2<T>
where
    T: Scalar,
    F: Fn(usize, ArrayViewMut1<'_, T>) + Sync,
{
    let mut out = Array2::zeros((rows, cols));
    match exec {
        Execution::Sequential => {
            for (i, row) in out.rows_mut().into_iter().enumerate() {
                fill(i, row);
            }
        }
        Execution::Parallel { pool, workers } => {
            let block = block_len(rows, workers);
            pool.install(|| {
                out.axis_chunks_iter_mut(Axis(0), block)
                    .into_par_iter()
                    .enumerate()
                    .for_each(|(b, mut chunk)| {
                        log::trace!("row block {} starting at row {}", b, b * block);
                        for (local, row) in chunk.rows_mut().into_iter().enumerate() {
                            fill(b * block + local, row);
                        }
                    });
            });
        }
    }
    out
}

/// Builds a vector whose element `i` is `element(i)`
pub(crate) fn fill_vector<T, F>(len: usize, exec: Execution<'_>, element: F) -> Array1<T>
where
    T: Scalar,
    F: Fn(usize) -> T + Sync,
{
    match exec {
        Execution::Sequential => Array1::from_iter((0..len).map(&element)),
        Execution::Parallel { pool, workers } => {
            let mut out = Array1::zeros(len);
            let block = block_len(len, workers);
            pool.install(|| {
                out.axis_chunks_iter_mut(Axis(0), block)
                    .into_par_iter()
                    .enumerate()
                    .for_each(|(b, mut chunk)| {
                        for (local, y) in chunk.iter_mut().enumerate() {
                            *y = element(b * block + local);
                        }
                    });
            });
            out
        }
    }
}
