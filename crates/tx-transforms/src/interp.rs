//! One-dimensional interpolation.
//!
//! `x` holds sample points along its last dim, `v` the sampled values and `xq`
//! the query points. Trailing dims are right-aligned: the sample row used for an
//! output element is found by taking the last `rank(x)` (or `rank(v)`)
//! coordinates of the output index.

use std::fmt;
use std::mem;
use std::sync::Arc;

use log::{debug, warn};
use tx_core::operator;
use tx_core::ops::{inverse_permutation, permute, reduction_permutation, Permute};
use tx_core::{
    CapabilityKind, CapabilityValue, Executor, Index, Job, Node, Operator, OperatorMut, Result,
    Scalar, Shape, Temporary, TensorError,
};

use crate::read_f64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpMethod {
    Linear,
    /// Closest sample; ties go to the upper sample.
    Nearest,
    /// Next sample at or above the query.
    Next,
    /// Previous sample at or below the query.
    Prev,
    /// Cubic spline with not-a-knot end conditions.
    Spline,
}

impl fmt::Display for InterpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InterpMethod::Linear => "linear",
            InterpMethod::Nearest => "nearest",
            InterpMethod::Next => "next",
            InterpMethod::Prev => "prev",
            InterpMethod::Spline => "spline",
        };
        f.write_str(name)
    }
}

/// Interpolates `v`, sampled at `x`, at the points `xq`.
///
/// The output has the shape of `xq` and the value type of `v`. Spline
/// interpolation solves for the derivative at every sample point in `prepare`
/// and keeps them until `release`; the other methods read their inputs
/// directly and need no preparation of their own.
#[derive(Debug)]
pub struct Interp1<X, V, Q> {
    x: Arc<X>,
    v: Arc<V>,
    xq: Q,
    method: InterpMethod,
    n: usize,
    slopes: Option<Temporary<f64>>,
}

fn construction(reason: String) -> TensorError {
    TensorError::construction("interp1", reason)
}

pub fn interp1<X, V, Q>(x: X, v: V, xq: Q, method: InterpMethod) -> Result<Interp1<X, V, Q>>
where
    X: Operator + 'static,
    V: Operator + 'static,
    Q: Operator,
{
    let (rx, rv, rq) = (x.rank(), v.rank(), xq.rank());
    if rx == 0 {
        return Err(construction("sample points must have rank >= 1".into()));
    }
    if rv < rx || rq < rv {
        return Err(construction(format!(
            "ranks must satisfy x <= v <= xq, got {}, {}, {}",
            rx, rv, rq
        )));
    }
    let n = x.size(rx - 1);
    if v.size(rv - 1) != n {
        return Err(construction(format!(
            "{} sample points but {} values",
            n,
            v.size(rv - 1)
        )));
    }
    let min_points = if method == InterpMethod::Spline { 3 } else { 1 };
    if n < min_points {
        return Err(construction(format!(
            "{} interpolation needs at least {} sample points, got {}",
            method, min_points, n
        )));
    }
    for ri in 2..=rv {
        let want = xq.size(rq - ri);
        if v.size(rv - ri) != want || (ri <= rx && x.size(rx - ri) != want) {
            return Err(construction(format!(
                "dim {} of the queries does not match the samples",
                rq - ri
            )));
        }
    }

    let slopes = (method == InterpMethod::Spline).then(|| Temporary::new("interp1 slopes"));
    Ok(Interp1 {
        x: Arc::new(x),
        v: Arc::new(v),
        xq,
        method,
        n,
        slopes,
    })
}

/// Interpolates along dim `axis` of `xq` instead of its last dim.
///
/// The matching dims of `x` and `v` are found by right-aligning their ranks
/// with the queries, so both must extend to `axis`. The result has the shape
/// of `xq`.
#[allow(clippy::type_complexity)]
pub fn interp1_axis<X, V, Q>(
    x: X,
    v: V,
    xq: Q,
    axis: usize,
    method: InterpMethod,
) -> Result<Permute<Interp1<Permute<X>, Permute<V>, Permute<Q>>>>
where
    X: Operator + 'static,
    V: Operator + 'static,
    Q: Operator,
{
    let rq = xq.rank();
    xq.shape().check_dim(axis)?;
    let along = |rank: usize, what: &str| -> Result<Vec<usize>> {
        let dim = (axis + rank).checked_sub(rq).ok_or_else(|| {
            construction(format!("{} have no dim aligned with query dim {}", what, axis))
        })?;
        reduction_permutation(rank, &[dim])
    };
    let x_perm = along(x.rank(), "sample points")?;
    let v_perm = along(v.rank(), "sample values")?;
    let q_perm = reduction_permutation(rq, &[axis])?;
    debug!("interp1 along dim {} of {}", axis, xq.name());
    let inner = interp1(
        permute(x, &x_perm)?,
        permute(v, &v_perm)?,
        permute(xq, &q_perm)?,
        method,
    )?;
    permute(inner, &inverse_permutation(&q_perm))
}

/// Coordinates of sample `j` in an operand of rank `rank`.
fn sample_index(idx: &[usize], rank: usize, j: usize) -> Index {
    let mut out = Index::from_slice(&idx[idx.len() - rank..]);
    if let Some(last) = out.last_mut() {
        *last = j;
    }
    out
}

/// Brackets `xq` in the sorted row read by `x_at`.
///
/// Returns `(low, high)`. Below the first point this is `(n, 0)`, above the last
/// `(n - 1, n)`; an exact hit returns the same position twice.
fn search(n: usize, xq: f64, x_at: &dyn Fn(usize) -> Result<f64>) -> Result<(usize, usize)> {
    let (first, last) = (x_at(0)?, x_at(n - 1)?);
    if xq < first {
        return Ok((n, 0));
    }
    if xq == first {
        return Ok((0, 0));
    }
    if xq > last {
        return Ok((n - 1, n));
    }
    if xq == last {
        return Ok((n - 1, n - 1));
    }
    let (mut low, mut high) = (0, n - 1);
    while high - low > 1 {
        let mid = low + (high - low) / 2;
        let xm = x_at(mid)?;
        if xm == xq {
            return Ok((mid, mid));
        }
        if xm < xq {
            low = mid;
        } else {
            high = mid;
        }
    }
    Ok((low, high))
}

#[derive(Debug, Default)]
struct TridiagonalSystem {
    dl: Vec<f64>,
    d: Vec<f64>,
    du: Vec<f64>,
    b: Vec<f64>,
}

impl TridiagonalSystem {
    fn push(&mut self, dl: f64, d: f64, du: f64, b: f64) {
        self.dl.push(dl);
        self.d.push(d);
        self.du.push(du);
        self.b.push(b);
    }

    /// Appends the not-a-knot equations for one row of samples.
    fn fill_row(&mut self, x: &[f64], v: &[f64]) {
        let n = x.len();
        let secant = |a: usize, b: usize| (v[b] - v[a]) / (x[b] - x[a]);
        if n == 3 {
            // Singular as a not-a-knot system; the spline is the parabola
            // through the three points.
            let (h0, h1) = (x[1] - x[0], x[2] - x[1]);
            let (delta0, delta1) = (secant(0, 1), secant(1, 2));
            let c = (delta1 - delta0) / (h0 + h1);
            for slope in [delta0 - c * h0, delta0 + c * h0, delta0 + c * (h0 + 2.0 * h1)] {
                self.push(0.0, 1.0, 0.0, slope);
            }
            return;
        }
        for i in 0..n {
            let p = i.clamp(1, n - 2) - 1;
            let (h0, h1) = (x[p + 1] - x[p], x[p + 2] - x[p + 1]);
            let (delta0, delta1) = (secant(p, p + 1), secant(p + 1, p + 2));
            if i == 0 {
                let b = ((2.0 * h1 + 3.0 * h0) * h1 * delta0 + h0 * h0 * delta1) / (h1 + h0);
                self.push(0.0, h1, h1 + h0, b);
            } else if i == n - 1 {
                let b = ((2.0 * h0 + 3.0 * h1) * h0 * delta1 + h1 * h1 * delta0) / (h0 + h1);
                self.push(h0 + h1, h0, 0.0, b);
            } else {
                self.push(h1, 2.0 * (h0 + h1), h0, 3.0 * (delta1 * h0 + delta0 * h1));
            }
        }
    }
}

/// Builds one system of order `n` per row of `v`.
fn tridiagonal_system<X, V>(x: &X, v: &V, n: usize) -> Result<TridiagonalSystem>
where
    X: Operator + ?Sized,
    V: Operator + ?Sized,
{
    let (xs, vs) = (read_f64(x)?, read_f64(v)?);
    let (rx, rv) = (x.rank(), v.rank());
    let x_rows = Shape::from_slice(&x.shape().dims()[..rx - 1]);
    let v_rows = Shape::from_slice(&v.shape().dims()[..rv - 1]);

    let mut system = TridiagonalSystem::default();
    for (r, values) in vs.chunks(n).enumerate() {
        let prefix = v_rows.unravel(r);
        let xr = x_rows.ravel(&prefix[prefix.len() - (rx - 1)..]);
        system.fill_row(&xs[xr * n..(xr + 1) * n], values);
    }
    Ok(system)
}

impl<X, V, Q> Interp1<X, V, Q>
where
    X: Operator + 'static,
    V: Operator + 'static,
    Q: Operator,
{
    pub fn method(&self) -> InterpMethod {
        self.method
    }

    fn children(&self) -> [&dyn Node; 3] {
        [&*self.x, &*self.v, &self.xq]
    }

    /// Fills and solves the slope systems into a fresh temporary.
    ///
    /// The system storage lives only until the solve has run.
    fn solve_slopes(&self, slopes: &Temporary<f64>, ex: &dyn Executor) -> Result<()> {
        let n = self.n;
        let m = slopes.allocate(ex, &self.v.shape())?;
        let batch = self.v.total_size() / n;
        let system = match ex.allocate(3 * batch * n * mem::size_of::<f64>()) {
            Ok(a) => a,
            Err(err) => {
                if let Err(free_err) = slopes.discard(ex) {
                    warn!("{}: free after failed allocation: {}", self.name(), free_err);
                }
                return Err(err);
            }
        };
        debug!("{}: solving {} systems of order {}", self.name(), batch, n);

        let (x, v) = (Arc::clone(&self.x), Arc::clone(&self.v));
        let numeric = ex.numeric();
        let solved = ex.submit(Job::compute(format!("{} slopes", self.name()), move || {
            let mut sys = tridiagonal_system(&*x, &*v, n)?;
            numeric.solve_tridiagonal(&sys.dl, &sys.d, &sys.du, &mut sys.b, n)?;
            m.store(&sys.b)
        }));
        let allocator = ex.allocator();
        let freed = ex.submit(Job::cleanup(
            format!("free {} system", self.name()),
            move || allocator.free(system),
        ));
        if let Err(err) = solved.and(freed) {
            if let Err(free_err) = slopes.discard(ex) {
                warn!("{}: free after failed solve: {}", self.name(), free_err);
            }
            return Err(err);
        }
        Ok(())
    }

    fn spline(
        &self,
        idx: &[usize],
        xq: f64,
        (low, high): (usize, usize),
        x_at: &dyn Fn(usize) -> Result<f64>,
        v_at: &dyn Fn(usize) -> Result<f64>,
    ) -> Result<f64> {
        if low == high {
            return v_at(low);
        }
        let n = self.n;
        let (low, high) = if low == n {
            (0, 1)
        } else if high == n {
            (n - 2, n - 1)
        } else {
            (low, high)
        };
        let slopes = self
            .slopes
            .as_ref()
            .ok_or_else(|| TensorError::precondition(self.name(), "no slopes for spline"))?;
        let rv = self.v.rank();
        let m_low = slopes.read(&sample_index(idx, rv, low))?;
        let m_high = slopes.read(&sample_index(idx, rv, high))?;
        let (x_low, x_high) = (x_at(low)?, x_at(high)?);
        let (v_low, v_high) = (v_at(low)?, v_at(high)?);

        let h = x_high - x_low;
        let t = (xq - x_low) / h;
        let s = (x_high - xq) / h;
        Ok(s * v_low
            + t * v_high
            + (h * (m_low * s - m_high * t) + (v_high - v_low) * (t - s)) * t * s)
    }
}

impl<X, V, Q> Node for Interp1<X, V, Q>
where
    X: Operator + 'static,
    V: Operator + 'static,
    Q: Operator,
{
    fn name(&self) -> String {
        format!(
            "interp1<{}>({}, {}, {})",
            self.method,
            self.x.name(),
            self.v.name(),
            self.xq.name()
        )
    }

    fn capability(&self, kind: CapabilityKind) -> CapabilityValue {
        match kind {
            CapabilityKind::VectorWidth => CapabilityValue::Width(1),
            _ => operator::fold_children(kind, &self.children()),
        }
    }

    fn needs_prepare(&self) -> bool {
        self.slopes.is_some() || self.children().iter().any(|c| c.needs_prepare())
    }

    fn prepare(&self, ex: &dyn Executor) -> Result<()> {
        let children = self.children();
        let Some(slopes) = &self.slopes else {
            return operator::prepare_children(&children, ex);
        };
        slopes.begin_prepare()?;
        if let Err(err) = operator::prepare_children(&children, ex) {
            slopes.abort_prepare();
            return Err(err);
        }
        if let Err(err) = self.solve_slopes(slopes, ex) {
            if let Err(release_err) = operator::release_children(&children, ex) {
                warn!("{}: release after failed prepare: {}", self.name(), release_err);
            }
            slopes.abort_prepare();
            return Err(err);
        }
        slopes.complete_prepare()
    }

    fn release(&self, ex: &dyn Executor) -> Result<()> {
        let children = self.children();
        let Some(slopes) = &self.slopes else {
            return operator::release_children(&children, ex);
        };
        slopes.begin_release()?;
        let released = operator::release_children(&children, ex);
        ex.submit(slopes.release_job(ex))?;
        released
    }
}

impl<X, V, Q> Operator for Interp1<X, V, Q>
where
    X: Operator + 'static,
    V: Operator + 'static,
    Q: Operator,
{
    type Value = V::Value;

    fn rank(&self) -> usize {
        self.xq.rank()
    }

    fn size(&self, dim: usize) -> usize {
        self.xq.size(dim)
    }

    fn read(&self, idx: &[usize]) -> Result<V::Value> {
        let xq = self.xq.read(idx)?.to_f64();
        let (rx, rv, n) = (self.x.rank(), self.v.rank(), self.n);
        let x_at = |j: usize| -> Result<f64> { Ok(self.x.read(&sample_index(idx, rx, j))?.to_f64()) };
        let v_at = |j: usize| -> Result<f64> { Ok(self.v.read(&sample_index(idx, rv, j))?.to_f64()) };

        let (low, high) = search(n, xq, &x_at)?;
        let value = match self.method {
            InterpMethod::Linear => {
                if high == 0 || low == high {
                    v_at(high)?
                } else if low == n - 1 {
                    v_at(low)?
                } else {
                    let (x_low, x_high) = (x_at(low)?, x_at(high)?);
                    let (v_low, v_high) = (v_at(low)?, v_at(high)?);
                    v_low + (xq - x_low) * (v_high - v_low) / (x_high - x_low)
                }
            }
            InterpMethod::Nearest => {
                if low == n {
                    v_at(high)?
                } else if high == n {
                    v_at(low)?
                } else if xq - x_at(low)? < x_at(high)? - xq {
                    v_at(low)?
                } else {
                    v_at(high)?
                }
            }
            InterpMethod::Next => v_at(if high == n { low } else { high })?,
            InterpMethod::Prev => v_at(if low == n { high } else { low })?,
            InterpMethod::Spline => self.spline(idx, xq, (low, high), &x_at, &v_at)?,
        };
        <V::Value as Scalar>::from_f64(value).ok_or_else(|| {
            TensorError::unrepresentable("interp1", value, <V::Value as Scalar>::DTYPE)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{init, tensor};
    use approx::assert_abs_diff_eq;
    use std::sync::Arc;
    use tx_core::{
        eval, Allocator, ErrorKind, HostExecutor, LifecyclePhase, StreamExecutor, Tensor,
        TrackingAllocator,
    };

    fn samples() -> (Tensor<f64>, Tensor<f64>, Tensor<f64>) {
        (
            tensor(vec![0.0, 1.0, 2.0, 3.0], vec![4]),
            tensor(vec![0.0, 1.0, 4.0, 9.0], vec![4]),
            tensor(vec![-1.0, 0.0, 0.5, 2.0, 2.4, 3.0, 4.0], vec![7]),
        )
    }

    fn interpolate(method: InterpMethod) -> Vec<f64> {
        let (x, v, xq) = samples();
        let op = interp1(x, v, xq, method).unwrap();
        eval(op, &HostExecutor::new()).unwrap().to_vec().unwrap()
    }

    fn assert_close(got: &[f64], want: &[f64]) {
        assert_eq!(got.len(), want.len());
        for (g, w) in got.iter().zip(want) {
            assert_abs_diff_eq!(*g, *w, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_search_brackets() {
        let xs = [1.0, 2.0, 4.0, 8.0];
        let x_at = |j: usize| -> Result<f64> { Ok(xs[j]) };
        assert_eq!(search(4, 0.5, &x_at).unwrap(), (4, 0));
        assert_eq!(search(4, 1.0, &x_at).unwrap(), (0, 0));
        assert_eq!(search(4, 3.0, &x_at).unwrap(), (1, 2));
        assert_eq!(search(4, 4.0, &x_at).unwrap(), (2, 2));
        assert_eq!(search(4, 8.0, &x_at).unwrap(), (3, 3));
        assert_eq!(search(4, 9.0, &x_at).unwrap(), (3, 4));
    }

    #[test]
    fn test_linear() {
        init();
        assert_close(
            &interpolate(InterpMethod::Linear),
            &[0.0, 0.0, 0.5, 4.0, 6.0, 9.0, 9.0],
        );
    }

    #[test]
    fn test_nearest_next_prev() {
        assert_close(
            &interpolate(InterpMethod::Nearest),
            &[0.0, 0.0, 1.0, 4.0, 4.0, 9.0, 9.0],
        );
        assert_close(
            &interpolate(InterpMethod::Next),
            &[0.0, 0.0, 1.0, 4.0, 9.0, 9.0, 9.0],
        );
        assert_close(
            &interpolate(InterpMethod::Prev),
            &[0.0, 0.0, 0.0, 4.0, 4.0, 9.0, 9.0],
        );
    }

    #[test]
    fn test_batched_values() {
        let ex = HostExecutor::new();
        let x = tensor(vec![0.0, 1.0, 2.0], vec![3]);
        let v = tensor(vec![0.0, 1.0, 2.0, 0.0, 2.0, 4.0], vec![2, 3]);
        let xq = tensor(vec![0.5, 1.5, 0.5, 1.5], vec![2, 2]);
        let op = interp1(x, v, xq, InterpMethod::Linear).unwrap();
        assert_eq!(op.shape().dims(), &[2, 2]);
        let out = eval(op, &ex).unwrap().to_vec().unwrap();
        assert_close(&out, &[0.5, 1.5, 1.0, 3.0]);
    }

    #[test]
    fn test_interpolate_along_leading_axis() {
        let ex = HostExecutor::new();
        // Samples run down the columns.
        let x = tensor(vec![0.0, 0.0, 1.0, 1.0, 2.0, 2.0], vec![3, 2]);
        let v = tensor(vec![0.0, 0.0, 10.0, -1.0, 20.0, -2.0], vec![3, 2]);
        let xq = tensor(vec![0.5, 1.5, 1.5, 0.5], vec![2, 2]);
        let op =
            interp1_axis(x.clone(), v.clone(), xq.clone(), 0, InterpMethod::Linear).unwrap();
        assert_eq!(op.shape().dims(), &[2, 2]);
        let out = eval(op, &ex).unwrap().to_vec().unwrap();
        assert_close(&out, &[5.0, -1.5, 15.0, -0.5]);

        // The last axis is plain interp1.
        let last = interp1_axis(x.clone(), v.clone(), xq.clone(), 1, InterpMethod::Prev).unwrap();
        let plain = interp1(x, v, xq, InterpMethod::Prev).unwrap();
        assert_eq!(
            eval(last, &ex).unwrap().to_vec().unwrap(),
            eval(plain, &ex).unwrap().to_vec().unwrap()
        );
    }

    #[test]
    fn test_interp_axis_spline_lifecycle() {
        let alloc = Arc::new(TrackingAllocator::new());
        let ex = HostExecutor::new().with_allocator(alloc.clone());
        let xs: Vec<f64> = (0..4).flat_map(|v| [v as f64, v as f64]).collect();
        let vs: Vec<f64> = xs.iter().map(|v| v * v).collect();
        let x = tensor(xs, vec![4, 2]);
        let v = tensor(vs, vec![4, 2]);
        let xq = tensor(vec![0.5, 2.5], vec![1, 2]);
        let op = interp1_axis(x, v, xq, 0, InterpMethod::Spline).unwrap();
        let out = eval(op, &ex).unwrap().to_vec().unwrap();
        assert_close(&out, &[0.25, 6.25]);
        let stats = alloc.stats();
        assert_eq!(stats.allocations, stats.frees);
    }

    #[test]
    fn test_interp_axis_checks() {
        let x = tensor(vec![0.0, 1.0, 2.0], vec![3]);
        let v = tensor(vec![0.0, 1.0, 2.0], vec![3]);
        let xq = tensor(vec![0.5; 4], vec![2, 2]);
        let err =
            interp1_axis(x.clone(), v.clone(), xq.clone(), 0, InterpMethod::Linear).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Construction);
        assert!(interp1_axis(x, v, xq, 2, InterpMethod::Linear).is_err());
    }

    #[test]
    fn test_non_spline_has_no_lifecycle() {
        let (x, v, xq) = samples();
        let op = interp1(x, v, xq, InterpMethod::Linear).unwrap();
        assert!(!op.needs_prepare());
        assert_eq!(op.read(&[2]).unwrap(), 0.5);
        assert_eq!(
            op.capability(CapabilityKind::VectorWidth),
            CapabilityValue::Width(1)
        );
    }

    #[test]
    fn test_spline_reproduces_cubic() {
        init();
        let alloc = Arc::new(TrackingAllocator::new());
        let ex = HostExecutor::new().with_allocator(alloc.clone());
        let xs: Vec<f64> = (0..5).map(|v| v as f64).collect();
        let vs: Vec<f64> = xs.iter().map(|v| v * v * v).collect();
        let queries = vec![-0.5, 1.5, 2.0, 2.5, 4.5];
        let op = interp1(
            tensor(xs, vec![5]),
            tensor(vs, vec![5]),
            tensor(queries.clone(), vec![5]),
            InterpMethod::Spline,
        )
        .unwrap();
        assert!(op.needs_prepare());
        assert_eq!(op.read(&[1]).unwrap_err().kind(), ErrorKind::Precondition);

        op.prepare(&ex).unwrap();
        // slopes stay, the system is freed inside prepare
        let stats = alloc.stats();
        assert_eq!((stats.allocations, stats.frees), (2, 1));
        let got: Vec<f64> = (0..5).map(|i| op.read(&[i]).unwrap()).collect();
        let want: Vec<f64> = queries.iter().map(|q| q * q * q).collect();
        assert_close(&got, &want);

        op.release(&ex).unwrap();
        let stats = alloc.stats();
        assert_eq!((stats.allocations, stats.frees), (2, 2));
        assert_eq!(op.slopes.as_ref().map(|s| s.phase()), Some(LifecyclePhase::Released));
        assert_eq!(op.read(&[1]).unwrap_err().kind(), ErrorKind::Precondition);
    }

    #[test]
    fn test_three_point_spline_on_stream() {
        let ex = StreamExecutor::new().unwrap();
        let op = interp1(
            tensor(vec![0.0, 1.0, 2.0], vec![3]),
            tensor(vec![0.0, 1.0, 4.0], vec![3]),
            tensor(vec![0.5, 1.5, 3.0], vec![3]),
            InterpMethod::Spline,
        )
        .unwrap();
        let out = eval(op, &ex).unwrap().to_vec().unwrap();
        assert_close(&out, &[0.25, 2.25, 9.0]);
    }

    #[test]
    fn test_spline_batched_rows() {
        let ex = HostExecutor::new();
        let x = tensor(vec![0.0, 1.0, 2.0, 3.0], vec![4]);
        let v = tensor(
            vec![0.0, 1.0, 8.0, 27.0, 0.0, 2.0, 4.0, 6.0],
            vec![2, 4],
        );
        let xq = tensor(vec![1.5, 1.5], vec![2, 1]);
        let out = eval(interp1(x, v, xq, InterpMethod::Spline).unwrap(), &ex)
            .unwrap()
            .to_vec()
            .unwrap();
        assert_close(&out, &[3.375, 3.0]);
    }

    #[test]
    fn test_construction_checks() {
        let x = tensor(vec![0.0, 1.0, 2.0], vec![3]);
        let q = tensor(vec![0.5], vec![1]);
        let cases = vec![
            interp1(x.clone(), tensor(vec![0.0; 4], vec![4]), q.clone(), InterpMethod::Linear),
            interp1(
                tensor(vec![0.0, 1.0], vec![2]),
                tensor(vec![0.0, 1.0], vec![2]),
                q.clone(),
                InterpMethod::Spline,
            ),
            interp1(x.clone(), tensor(vec![0.0; 6], vec![2, 3]), q, InterpMethod::Linear),
            interp1(
                x,
                tensor(vec![0.0; 6], vec![2, 3]),
                tensor(vec![0.5; 3], vec![3, 1]),
                InterpMethod::Linear,
            ),
        ];
        for case in cases {
            assert_eq!(case.unwrap_err().kind(), ErrorKind::Construction);
        }
    }
}
