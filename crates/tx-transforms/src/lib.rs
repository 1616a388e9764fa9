//! `tx-transforms` - whole-array transform operators for tensor-expr.
//!
//! Each operator here computes its whole result in one pass, using the
//! executor's `NumericBackend` where a kernel is needed:
//! - `all`, `any`, `sum` reductions and `argmin`
//! - `stdd` and `cov` statistics
//! - `hist` histograms
//! - `interp1` interpolation (linear, nearest, next, prev, cubic spline), along
//!   the last dim or any dim with `interp1_axis`
//! - `dct` (DCT-II through a real FFT)

pub mod argmin;
pub mod dct;
pub mod hist;
pub mod interp;
pub mod reduce;
pub mod stats;

pub use argmin::{argmin, argmin_full, ArgMin};
pub use dct::{dct, Dct};
pub use hist::{hist, Hist};
pub use interp::{interp1, interp1_axis, Interp1, InterpMethod};
pub use reduce::{all, all_full, any, any_full, sum, sum_full, ReduceOp, Reduced, Reduction};
pub use stats::{cov, stdd, stdd_full, Cov, Stdd};

use tx_core::host::walk;
use tx_core::ops::{permute, reduction_permutation, Permute};
use tx_core::{Operator, Result, Scalar, Shape, TensorError};

/// Reads every element of `op` in row-major order as `f64`.
pub(crate) fn read_f64<O: Operator + ?Sized>(op: &O) -> Result<Vec<f64>> {
    Ok(walk::evaluate(op, 1)?
        .into_iter()
        .map(|v| v.to_f64())
        .collect())
}

/// Reads every element of an integral operator exactly.
pub(crate) fn read_i128<O: Operator + ?Sized>(op: &O) -> Result<Vec<i128>> {
    walk::evaluate(op, 1)?
        .into_iter()
        .map(|v| {
            v.to_i128().ok_or_else(|| {
                TensorError::numeric(op.name(), format!("{} values are not integral", op.dtype()))
            })
        })
        .collect()
}

/// Converts backend output back into the operator's value type.
///
/// A value the type cannot hold (NaN or out of range) fails with a numeric
/// error naming `op`.
pub(crate) fn from_f64<T: Scalar>(
    op: &str,
    values: impl IntoIterator<Item = f64>,
) -> Result<Vec<T>> {
    values
        .into_iter()
        .map(|v| T::from_f64(v).ok_or_else(|| TensorError::unrepresentable(op, v, T::DTYPE)))
        .collect()
}

/// Exact counterpart of [`from_f64`] for integral results.
pub(crate) fn from_i128<T: Scalar>(op: &str, values: Vec<i128>) -> Result<Vec<T>> {
    values
        .into_iter()
        .map(|v| T::from_i128(v).ok_or_else(|| TensorError::unrepresentable(op, v, T::DTYPE)))
        .collect()
}

/// An input permuted so reduced dims come last, with the kept output shape
/// and the number of elements reduced per output element.
#[derive(Debug, Clone)]
pub(crate) struct ReducedInput<O> {
    pub input: Permute<O>,
    pub shape: Shape,
    pub inner: usize,
}

pub(crate) fn reduced_input<O: Operator>(op: O, dims: &[usize]) -> Result<ReducedInput<O>> {
    let rank = op.rank();
    let perm = reduction_permutation(rank, dims)?;
    let input = permute(op, &perm)?;
    let permuted = input.shape();
    let kept = rank - dims.len();
    Ok(ReducedInput {
        shape: Shape::from_slice(&permuted.dims()[..kept]),
        inner: permuted.dims()[kept..].iter().product(),
        input,
    })
}
