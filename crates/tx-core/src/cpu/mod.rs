use num_complex::Complex64;
use rustfft::FftPlanner;

use crate::backend::NumericBackend;
use crate::error::{Result, TensorError};

/// Pure-Rust CPU numeric backend.
///
/// Implements all operations with straightforward loops optimized for
/// correctness rather than peak performance. Intended as a reference
/// implementation and fallback.
#[derive(Debug, Clone)]
pub struct CpuNumeric;

impl CpuNumeric {
    pub fn new() -> Self {
        CpuNumeric
    }
}

impl Default for CpuNumeric {
    fn default() -> Self {
        Self::new()
    }
}

fn check_len(what: &str, len: usize, expected: usize) -> Result<()> {
    if len != expected {
        return Err(TensorError::numeric(
            "cpu",
            format!("{}: got {} values but expected {}", what, len, expected),
        ));
    }
    Ok(())
}

/// Splits `x` into `outer` rows of `inner` values. A zero `inner` yields empty rows.
fn rows(x: &[f64], outer: usize, inner: usize) -> impl Iterator<Item = &[f64]> {
    (0..outer).map(move |r| &x[r * inner..(r + 1) * inner])
}

impl NumericBackend for CpuNumeric {
    fn name(&self) -> &str {
        "cpu"
    }

    fn all(&self, x: &[f64], outer: usize, inner: usize) -> Result<Vec<bool>> {
        check_len("all", x.len(), outer * inner)?;
        Ok(rows(x, outer, inner)
            .map(|row| row.iter().all(|&v| v != 0.0))
            .collect())
    }

    fn any(&self, x: &[f64], outer: usize, inner: usize) -> Result<Vec<bool>> {
        check_len("any", x.len(), outer * inner)?;
        Ok(rows(x, outer, inner)
            .map(|row| row.iter().any(|&v| v != 0.0))
            .collect())
    }

    fn sum(&self, x: &[f64], outer: usize, inner: usize) -> Result<Vec<f64>> {
        check_len("sum", x.len(), outer * inner)?;
        Ok(rows(x, outer, inner).map(|row| row.iter().sum()).collect())
    }

    fn sum_integral(&self, x: &[i128], outer: usize, inner: usize) -> Result<Vec<i128>> {
        check_len("sum_integral", x.len(), outer * inner)?;
        (0..outer)
            .map(|r| {
                x[r * inner..(r + 1) * inner]
                    .iter()
                    .try_fold(0i128, |acc, &v| acc.checked_add(v))
                    .ok_or_else(|| {
                        TensorError::numeric("cpu", format!("integer sum of row {} overflows", r))
                    })
            })
            .collect()
    }

    fn argmin(&self, x: &[f64], outer: usize, inner: usize) -> Result<(Vec<f64>, Vec<usize>)> {
        check_len("argmin", x.len(), outer * inner)?;
        if inner == 0 {
            return Err(TensorError::numeric("cpu", "argmin over an empty row"));
        }
        let mut values = Vec::with_capacity(outer);
        let mut indices = Vec::with_capacity(outer);
        for row in rows(x, outer, inner) {
            let mut best = 0;
            for (i, &v) in row.iter().enumerate().skip(1) {
                // Strict comparison keeps the first occurrence on ties.
                if v < row[best] || (row[best].is_nan() && !v.is_nan()) {
                    best = i;
                }
            }
            values.push(row[best]);
            indices.push(best);
        }
        Ok((values, indices))
    }

    fn std_dev(&self, x: &[f64], outer: usize, inner: usize, ddof: usize) -> Result<Vec<f64>> {
        check_len("std_dev", x.len(), outer * inner)?;
        Ok(rows(x, outer, inner)
            .map(|row| {
                if inner <= ddof {
                    return f64::NAN;
                }
                let mean = row.iter().sum::<f64>() / inner as f64;
                let ss: f64 = row.iter().map(|&v| (v - mean) * (v - mean)).sum();
                (ss / (inner - ddof) as f64).sqrt()
            })
            .collect())
    }

    fn covariance(
        &self,
        x: &[f64],
        batch: usize,
        observations: usize,
        variables: usize,
    ) -> Result<Vec<f64>> {
        check_len("covariance", x.len(), batch * observations * variables)?;
        let mut out = vec![0.0; batch * variables * variables];
        if observations * variables == 0 {
            out.iter_mut().for_each(|c| *c = f64::NAN);
            return Ok(out);
        }
        for (b, m) in x
            .chunks(observations * variables)
            .take(batch)
            .enumerate()
        {
            let means: Vec<f64> = (0..variables)
                .map(|j| {
                    (0..observations).map(|o| m[o * variables + j]).sum::<f64>()
                        / observations as f64
                })
                .collect();
            let dst = &mut out[b * variables * variables..(b + 1) * variables * variables];
            for i in 0..variables {
                for j in i..variables {
                    let c = if observations < 2 {
                        f64::NAN
                    } else {
                        (0..observations)
                            .map(|o| {
                                (m[o * variables + i] - means[i]) * (m[o * variables + j] - means[j])
                            })
                            .sum::<f64>()
                            / (observations - 1) as f64
                    };
                    dst[i * variables + j] = c;
                    dst[j * variables + i] = c;
                }
            }
        }
        Ok(out)
    }

    fn histogram(
        &self,
        x: &[f64],
        outer: usize,
        inner: usize,
        lower: f64,
        upper: f64,
        levels: usize,
    ) -> Result<Vec<i64>> {
        check_len("histogram", x.len(), outer * inner)?;
        if levels < 2 || !(lower < upper) {
            return Err(TensorError::numeric(
                "cpu",
                format!(
                    "histogram needs levels >= 2 and lower < upper (levels={}, range=[{}, {}))",
                    levels, lower, upper
                ),
            ));
        }
        let bins = levels - 1;
        let width = (upper - lower) / bins as f64;
        let mut out = vec![0i64; outer * bins];
        for (r, row) in rows(x, outer, inner).enumerate() {
            for &v in row {
                if v >= lower && v < upper {
                    let bin = (((v - lower) / width) as usize).min(bins - 1);
                    out[r * bins + bin] += 1;
                }
            }
        }
        Ok(out)
    }

    fn solve_tridiagonal(
        &self,
        dl: &[f64],
        d: &[f64],
        du: &[f64],
        b: &mut [f64],
        n: usize,
    ) -> Result<()> {
        if n == 0 || b.len() % n != 0 {
            return Err(TensorError::numeric(
                "cpu",
                format!("tridiagonal: {} values is not a batch of order {}", b.len(), n),
            ));
        }
        check_len("tridiagonal dl", dl.len(), b.len())?;
        check_len("tridiagonal d", d.len(), b.len())?;
        check_len("tridiagonal du", du.len(), b.len())?;

        let mut c = vec![0.0; n];
        for (s, rhs) in b.chunks_mut(n).enumerate() {
            let (lo, mid, up) = (
                &dl[s * n..(s + 1) * n],
                &d[s * n..(s + 1) * n],
                &du[s * n..(s + 1) * n],
            );
            // Thomas algorithm: forward sweep, then back substitution.
            let mut denom = mid[0];
            for i in 0..n {
                if i > 0 {
                    denom = mid[i] - lo[i] * c[i - 1];
                }
                if denom == 0.0 {
                    return Err(TensorError::numeric(
                        "cpu",
                        format!("tridiagonal system {} is singular at row {}", s, i),
                    ));
                }
                c[i] = up[i] / denom;
                rhs[i] = if i == 0 {
                    rhs[0] / denom
                } else {
                    (rhs[i] - lo[i] * rhs[i - 1]) / denom
                };
            }
            for i in (0..n - 1).rev() {
                rhs[i] -= c[i] * rhs[i + 1];
            }
        }
        Ok(())
    }

    fn rfft(&self, x: &[f64], outer: usize, inner: usize, n_fft: usize) -> Result<Vec<Complex64>> {
        check_len("rfft", x.len(), outer * inner)?;
        if n_fft == 0 {
            return Err(TensorError::numeric("cpu", "rfft length must be positive"));
        }
        let bins = n_fft / 2 + 1;
        let plan = FftPlanner::<f64>::new().plan_fft_forward(n_fft);
        let mut out = Vec::with_capacity(outer * bins);
        let mut buf = vec![Complex64::new(0.0, 0.0); n_fft];
        for row in rows(x, outer, inner) {
            buf.fill(Complex64::new(0.0, 0.0));
            for (slot, &v) in buf.iter_mut().zip(row.iter()) {
                slot.re = v;
            }
            plan.process(&mut buf);
            out.extend_from_slice(&buf[..bins]);
        }
        Ok(out)
    }
}
