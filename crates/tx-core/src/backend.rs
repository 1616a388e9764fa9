use std::fmt::Debug;

use num_complex::Complex64;

use crate::error::Result;

/// Pluggable numeric collaborator used by heavyweight transforms.
///
/// Batched data is passed as row-major `f64` slices of `outer * inner` values,
/// where each of the `outer` rows is reduced or processed independently.
/// Results are returned as owned vectors.
pub trait NumericBackend: Send + Sync + Debug {
    /// Returns the name of this backend (e.g., "cpu").
    fn name(&self) -> &str;

    /// Per row: true when every element is non-zero.
    fn all(&self, x: &[f64], outer: usize, inner: usize) -> Result<Vec<bool>>;

    /// Per row: true when any element is non-zero.
    fn any(&self, x: &[f64], outer: usize, inner: usize) -> Result<Vec<bool>>;

    fn sum(&self, x: &[f64], outer: usize, inner: usize) -> Result<Vec<f64>>;

    /// Per row exact sum of integral values. Overflowing `i128` is an error.
    fn sum_integral(&self, x: &[i128], outer: usize, inner: usize) -> Result<Vec<i128>>;

    /// Per row: the minimum value and the position of its first occurrence.
    fn argmin(&self, x: &[f64], outer: usize, inner: usize) -> Result<(Vec<f64>, Vec<usize>)>;

    /// Per row standard deviation with `ddof` delta degrees of freedom.
    ///
    /// Rows with `inner <= ddof` produce NaN.
    fn std_dev(&self, x: &[f64], outer: usize, inner: usize, ddof: usize) -> Result<Vec<f64>>;

    /// Sample covariance of `batch` matrices of shape [observations, variables].
    ///
    /// Returns `batch` matrices of shape [variables, variables].
    fn covariance(
        &self,
        x: &[f64],
        batch: usize,
        observations: usize,
        variables: usize,
    ) -> Result<Vec<f64>>;

    /// Per row histogram of `levels - 1` equal bins over `[lower, upper)`.
    ///
    /// Values outside the range are not counted.
    fn histogram(
        &self,
        x: &[f64],
        outer: usize,
        inner: usize,
        lower: f64,
        upper: f64,
        levels: usize,
    ) -> Result<Vec<i64>>;

    /// Solves `batch = b.len() / n` tridiagonal systems of order `n` in place of `b`.
    ///
    /// `dl`, `d` and `du` hold the sub, main and super diagonals of each system,
    /// `n` entries per system (`dl[0]` and `du[n-1]` are ignored).
    fn solve_tridiagonal(
        &self,
        dl: &[f64],
        d: &[f64],
        du: &[f64],
        b: &mut [f64],
        n: usize,
    ) -> Result<()>;

    /// Real-to-complex FFT of each row of `x`, zero padded to `n_fft` points.
    ///
    /// Each row yields `n_fft / 2 + 1` bins.
    fn rfft(&self, x: &[f64], outer: usize, inner: usize, n_fft: usize) -> Result<Vec<Complex64>>;
}
