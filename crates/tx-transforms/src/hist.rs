use tx_core::{
    ExecContext, Materialized, Node, Operator, OperatorMut, Result, Shape, TensorError, Transform,
};

use crate::read_f64;

/// Counts of the last dim's values in `levels - 1` equal bins over `[lower, upper)`.
#[derive(Debug)]
pub struct Hist<O> {
    input: O,
    lower: f64,
    upper: f64,
    levels: usize,
    shape: Shape,
    outer: usize,
    inner: usize,
}

/// Histogram of each row of `op`. Values outside `[lower, upper)` are not counted.
pub fn hist<O: Operator + 'static>(
    op: O,
    lower: f64,
    upper: f64,
    levels: usize,
) -> Result<Materialized<Hist<O>>> {
    let rank = op.rank();
    if rank == 0 {
        return Err(TensorError::construction("hist", "input must have rank >= 1"));
    }
    if levels < 2 {
        return Err(TensorError::construction(
            "hist",
            format!("need at least 2 levels, got {}", levels),
        ));
    }
    if !(lower < upper) {
        return Err(TensorError::construction(
            "hist",
            format!("empty range [{}, {})", lower, upper),
        ));
    }
    let dims = op.shape();
    let mut out = dims.dims()[..rank - 1].to_vec();
    out.push(levels - 1);
    Ok(Materialized::new(Hist {
        lower,
        upper,
        levels,
        outer: dims.dims()[..rank - 1].iter().product(),
        inner: dims.dim(rank - 1),
        shape: Shape::new(out),
        input: op,
    }))
}

impl<O: Operator + 'static> Transform for Hist<O> {
    type Output = i64;

    fn name(&self) -> String {
        format!("hist({})", self.input.name())
    }

    fn output_shape(&self) -> &Shape {
        &self.shape
    }

    fn inputs(&self) -> Vec<&dyn Node> {
        vec![&self.input]
    }

    fn exec(&self, out: &dyn OperatorMut<Value = i64>, ctx: &ExecContext) -> Result<()> {
        let x = read_f64(&self.input)?;
        let counts = ctx.numeric.histogram(
            &x,
            self.outer,
            self.inner,
            self.lower,
            self.upper,
            self.levels,
        )?;
        out.store(&counts)
    }
}
