use std::fmt;

use log::debug;
use tx_core::ops::Permute;
use tx_core::{
    ExecContext, Materialized, Node, Operator, OperatorMut, Result, Scalar, Shape, Transform,
};

use crate::{from_f64, from_i128, read_f64, read_i128, reduced_input};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    /// 1 when every reduced element is non-zero.
    All,
    /// 1 when any reduced element is non-zero.
    Any,
    Sum,
}

impl fmt::Display for ReduceOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReduceOp::All => write!(f, "all"),
            ReduceOp::Any => write!(f, "any"),
            ReduceOp::Sum => write!(f, "sum"),
        }
    }
}

/// Reduces the trailing dims of a permuted input.
#[derive(Debug)]
pub struct Reduction<O> {
    input: Permute<O>,
    op: ReduceOp,
    shape: Shape,
    inner: usize,
}

pub type Reduced<O> = Materialized<Reduction<O>>;

fn reduction<O: Operator + 'static>(op: O, dims: &[usize], kind: ReduceOp) -> Result<Reduced<O>> {
    let r = reduced_input(op, dims)?;
    Ok(Materialized::new(Reduction {
        input: r.input,
        op: kind,
        shape: r.shape,
        inner: r.inner,
    }))
}

fn every_dim<O: Operator>(op: &O) -> Vec<usize> {
    (0..op.rank()).collect()
}

/// Logical AND over `dims`. The output drops those dims.
pub fn all<O: Operator + 'static>(op: O, dims: &[usize]) -> Result<Reduced<O>> {
    reduction(op, dims, ReduceOp::All)
}

/// Logical AND over every element, as a rank-0 operator.
pub fn all_full<O: Operator + 'static>(op: O) -> Result<Reduced<O>> {
    let dims = every_dim(&op);
    reduction(op, &dims, ReduceOp::All)
}

pub fn any<O: Operator + 'static>(op: O, dims: &[usize]) -> Result<Reduced<O>> {
    reduction(op, dims, ReduceOp::Any)
}

pub fn any_full<O: Operator + 'static>(op: O) -> Result<Reduced<O>> {
    let dims = every_dim(&op);
    reduction(op, &dims, ReduceOp::Any)
}

pub fn sum<O: Operator + 'static>(op: O, dims: &[usize]) -> Result<Reduced<O>> {
    reduction(op, dims, ReduceOp::Sum)
}

pub fn sum_full<O: Operator + 'static>(op: O) -> Result<Reduced<O>> {
    let dims = every_dim(&op);
    reduction(op, &dims, ReduceOp::Sum)
}

fn flags(values: Vec<bool>) -> impl Iterator<Item = f64> {
    values.into_iter().map(|b| if b { 1.0 } else { 0.0 })
}

impl<O: Operator + 'static> Transform for Reduction<O> {
    type Output = O::Value;

    fn name(&self) -> String {
        format!("{}({})", self.op, self.input.child().name())
    }

    fn output_shape(&self) -> &Shape {
        &self.shape
    }

    fn inputs(&self) -> Vec<&dyn Node> {
        vec![&self.input]
    }

    fn exec(&self, out: &dyn OperatorMut<Value = O::Value>, ctx: &ExecContext) -> Result<()> {
        let outer = self.shape.numel();
        let name = self.op.to_string();
        debug!("{}: {} rows of {} on {}", self.op, outer, self.inner, ctx.numeric.name());
        // Integral sums stay exact; everything else goes through f64.
        let values: Vec<O::Value> = match self.op {
            ReduceOp::Sum if <O::Value as Scalar>::DTYPE.is_integral() => {
                let x = read_i128(&self.input)?;
                from_i128(&name, ctx.numeric.sum_integral(&x, outer, self.inner)?)?
            }
            ReduceOp::Sum => {
                let x = read_f64(&self.input)?;
                from_f64(&name, ctx.numeric.sum(&x, outer, self.inner)?)?
            }
            ReduceOp::All => {
                let x = read_f64(&self.input)?;
                from_f64(&name, flags(ctx.numeric.all(&x, outer, self.inner)?))?
            }
            ReduceOp::Any => {
                let x = read_f64(&self.input)?;
                from_f64(&name, flags(ctx.numeric.any(&x, outer, self.inner)?))?
            }
        };
        out.store(&values)
    }
}
