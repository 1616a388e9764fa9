use std::f64::consts::PI;

use tx_core::{
    CapabilityKind, CapabilityValue, ExecContext, ExecutorKind, Materialized, Node, Operator,
    OperatorMut, Placement, Result, Shape, TensorError, Transform,
};

use crate::{from_f64, read_f64};

/// DCT-II of a vector, `X[k] = 2 * sum(x[n] * cos(pi * k * (2n + 1) / 2N))`.
///
/// Computed from the real FFT of the input zero padded to `2N` points. Only
/// stream executors provide the FFT this needs.
#[derive(Debug)]
pub struct Dct<O> {
    input: O,
    shape: Shape,
}

pub fn dct<O: Operator + 'static>(op: O) -> Result<Materialized<Dct<O>>> {
    if op.rank() != 1 {
        return Err(TensorError::construction(
            "dct",
            format!("input must be a vector, got rank {}", op.rank()),
        ));
    }
    if op.size(0) == 0 {
        return Err(TensorError::construction("dct", "input is empty"));
    }
    Ok(Materialized::new(Dct {
        shape: op.shape(),
        input: op,
    }))
}

impl<O: Operator + 'static> Transform for Dct<O> {
    type Output = O::Value;

    fn name(&self) -> String {
        format!("dct({})", self.input.name())
    }

    fn output_shape(&self) -> &Shape {
        &self.shape
    }

    fn supports(&self, kind: ExecutorKind) -> bool {
        kind == ExecutorKind::Stream
    }

    fn inputs(&self) -> Vec<&dyn Node> {
        vec![&self.input]
    }

    fn capability(&self, kind: CapabilityKind) -> CapabilityValue {
        match kind {
            CapabilityKind::Placement => CapabilityValue::Placement(Placement::Device),
            _ => tx_core::operator::fold_children(kind, &self.inputs()),
        }
    }

    fn exec(&self, out: &dyn OperatorMut<Value = O::Value>, ctx: &ExecContext) -> Result<()> {
        let x = read_f64(&self.input)?;
        let n = x.len();
        let spectrum = ctx.numeric.rfft(&x, 1, n, 2 * n)?;
        let coeffs = spectrum.iter().take(n).enumerate().map(|(k, y)| {
            let theta = PI * k as f64 / (2 * n) as f64;
            2.0 * (y.re * theta.cos() + y.im * theta.sin())
        });
        out.store(&from_f64::<O::Value>("dct", coeffs)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{init, tensor};
    use approx::assert_abs_diff_eq;
    use tx_core::{eval, run_transform, ErrorKind, Executor, HostExecutor, StreamExecutor, Tensor};

    fn direct(x: &[f64]) -> Vec<f64> {
        let n = x.len() as f64;
        (0..x.len())
            .map(|k| {
                2.0 * x
                    .iter()
                    .enumerate()
                    .map(|(i, v)| v * (PI * k as f64 * (2.0 * i as f64 + 1.0) / (2.0 * n)).cos())
                    .sum::<f64>()
            })
            .collect()
    }

    #[test]
    fn test_dct_pair() {
        init();
        let ex = StreamExecutor::new().unwrap();
        let out = eval(dct(tensor(vec![1.0, 1.0], vec![2])).unwrap(), &ex).unwrap();
        let out = out.to_vec().unwrap();
        assert_abs_diff_eq!(out[0], 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out[1], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_dct_matches_direct_sum() {
        let ex = StreamExecutor::new().unwrap();
        let x = vec![0.5, -1.0, 2.0, 3.5, 0.0];
        let dst: Tensor<f64> = Tensor::zeros(vec![5]);
        let kernel = Dct {
            input: tensor(x.clone(), vec![5]),
            shape: Shape::new(vec![5]),
        };
        run_transform(&dst, kernel, &ex).unwrap();
        ex.sync().unwrap();
        for (got, want) in dst.to_vec().unwrap().iter().zip(direct(&x)) {
            assert_abs_diff_eq!(*got, want, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_dct_rejects_host() {
        let ex = HostExecutor::new();
        let d = dct(tensor(vec![1.0, 2.0, 3.0], vec![3])).unwrap();
        assert_eq!(
            d.capability(CapabilityKind::Placement),
            CapabilityValue::Placement(Placement::Device)
        );
        let err = d.prepare(&ex).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedExecutor);

        let d = dct(tensor(vec![1.0, 2.0], vec![2])).unwrap();
        let err = eval(d, &ex).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedExecutor);
    }

    #[test]
    fn test_dct_rank_check() {
        let err = dct(tensor(vec![1.0; 4], vec![2, 2])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Construction);
    }
}
