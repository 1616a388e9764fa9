//! Standard deviation and covariance.

use log::debug;
use tx_core::ops::Permute;
use tx_core::{
    ExecContext, Materialized, Node, Operator, OperatorMut, Result, Shape, TensorError, Transform,
};

use crate::{from_f64, read_f64, reduced_input};

/// Standard deviation over the reduced dims with `ddof` delta degrees of freedom.
#[derive(Debug)]
pub struct Stdd<O> {
    input: Permute<O>,
    ddof: usize,
    shape: Shape,
    inner: usize,
}

/// `ddof` at or above the number of reduced elements yields NaN.
pub fn stdd<O: Operator + 'static>(op: O, dims: &[usize], ddof: usize) -> Result<Materialized<Stdd<O>>> {
    let r = reduced_input(op, dims)?;
    Ok(Materialized::new(Stdd {
        input: r.input,
        ddof,
        shape: r.shape,
        inner: r.inner,
    }))
}

pub fn stdd_full<O: Operator + 'static>(op: O, ddof: usize) -> Result<Materialized<Stdd<O>>> {
    let dims: Vec<usize> = (0..op.rank()).collect();
    stdd(op, &dims, ddof)
}

impl<O: Operator + 'static> Transform for Stdd<O> {
    type Output = O::Value;

    fn name(&self) -> String {
        format!("stdd({})", self.input.child().name())
    }

    fn output_shape(&self) -> &Shape {
        &self.shape
    }

    fn inputs(&self) -> Vec<&dyn Node> {
        vec![&self.input]
    }

    fn exec(&self, out: &dyn OperatorMut<Value = O::Value>, ctx: &ExecContext) -> Result<()> {
        let x = read_f64(&self.input)?;
        let sd = ctx
            .numeric
            .std_dev(&x, self.shape.numel(), self.inner, self.ddof)?;
        out.store(&from_f64::<O::Value>("stdd", sd)?)
    }
}

/// Sample covariance of `[..., observations, variables]` matrices.
///
/// Produces `[..., variables, variables]`, normalized by `observations - 1`.
#[derive(Debug)]
pub struct Cov<O> {
    input: O,
    shape: Shape,
    batch: usize,
    observations: usize,
    variables: usize,
}

pub fn cov<O: Operator + 'static>(op: O) -> Result<Materialized<Cov<O>>> {
    let rank = op.rank();
    if rank < 2 {
        return Err(TensorError::construction(
            "cov",
            format!("input must have rank >= 2, got {}", rank),
        ));
    }
    let dims = op.shape();
    let (observations, variables) = (dims.dim(rank - 2), dims.dim(rank - 1));
    let batch: usize = dims.dims()[..rank - 2].iter().product();
    let mut out = dims.dims()[..rank - 2].to_vec();
    out.extend([variables, variables]);
    debug!(
        "cov: {} batches of {} observations x {} variables",
        batch, observations, variables
    );
    Ok(Materialized::new(Cov {
        input: op,
        shape: Shape::new(out),
        batch,
        observations,
        variables,
    }))
}

impl<O: Operator + 'static> Transform for Cov<O> {
    type Output = O::Value;

    fn name(&self) -> String {
        format!("cov({})", self.input.name())
    }

    fn output_shape(&self) -> &Shape {
        &self.shape
    }

    fn inputs(&self) -> Vec<&dyn Node> {
        vec![&self.input]
    }

    fn exec(&self, out: &dyn OperatorMut<Value = O::Value>, ctx: &ExecContext) -> Result<()> {
        let x = read_f64(&self.input)?;
        let c = ctx
            .numeric
            .covariance(&x, self.batch, self.observations, self.variables)?;
        out.store(&from_f64::<O::Value>("cov", c)?)
    }
}
