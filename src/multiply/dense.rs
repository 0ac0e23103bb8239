//! Dense kernels
//!
//! Every cell of both operands is visited; no zero skipping.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use crate::matrix::Scalar;
use crate::multiply::partition::{fill_rows, fill_vector, Execution};

/// C = A × B over ndarray views, one output row per call of the row kernel
pub(crate) fn matmul<T: Scalar>(
    a: ArrayView2<'_, T>,
    b: ArrayView2<'_, T>,
    exec: Execution<'_>,
) -> Array2<T> {
    debug_assert_eq!(a.ncols(), b.nrows());
    fill_rows(a.nrows(), b.ncols(), exec, |i, mut c_row| {
        // i-k-j order walks both B and C along contiguous rows
        for (t, &a_val) in a.row(i).iter().enumerate() {
            for (c, &b_val) in c_row.iter_mut().zip(b.row(t).iter()) {
                *c += a_val * b_val;
            }
        }
    })
}

/// y = A × x
pub(crate) fn matvec<T: Scalar>(
    a: ArrayView2<'_, T>,
    x: ArrayView1<'_, T>,
    exec: Execution<'_>,
) -> Array1<T> {
    debug_assert_eq!(a.ncols(), x.len());
    fill_vector(a.nrows(), exec, |i| dot(a.row(i), x))
}

pub(crate) fn dot<T: Scalar>(a: ArrayView1<'_, T>, b: ArrayView1<'_, T>) -> T {
    a.iter()
        .zip(b.iter())
        .fold(T::zero(), |acc, (&x, &y)| acc + x * y)
}
