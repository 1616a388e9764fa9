use std::sync::Arc;

use log::debug;
use tx_core::ops::Permute;
use tx_core::{
    Executor, Job, Node, Operator, OperatorMut, Result, Shape, TensorError,
};

use crate::{from_f64, read_f64, reduced_input};

/// Minimum values and their positions over a set of reduced dims.
///
/// There are two destinations so this is not readable as an operator. Use
/// [`ArgMin::exec_into`] to fill a value and an index destination together.
/// Indices are flat row-major positions within the reduced block, first
/// occurrence on ties.
#[derive(Debug)]
pub struct ArgMin<O> {
    input: Arc<Permute<O>>,
    shape: Shape,
    inner: usize,
}

pub fn argmin<O: Operator + 'static>(op: O, dims: &[usize]) -> Result<ArgMin<O>> {
    let r = reduced_input(op, dims)?;
    Ok(ArgMin {
        input: Arc::new(r.input),
        shape: r.shape,
        inner: r.inner,
    })
}

pub fn argmin_full<O: Operator + 'static>(op: O) -> Result<ArgMin<O>> {
    let dims: Vec<usize> = (0..op.rank()).collect();
    argmin(op, &dims)
}

fn check_destination(name: &str, expected: &Shape, got: Shape) -> Result<()> {
    if &got != expected {
        debug!("{}: destination shape {} does not match {}", name, got, expected);
        return Err(TensorError::ShapeMismatch {
            expected: expected.dims().to_vec(),
            got: got.dims().to_vec(),
        });
    }
    Ok(())
}

impl<O: Operator + 'static> ArgMin<O> {
    pub fn output_shape(&self) -> &Shape {
        &self.shape
    }

    pub fn name(&self) -> String {
        format!("argmin({})", self.input.child().name())
    }

    /// Writes minima into `values` and their positions into `indices`.
    ///
    /// Both results are computed before either destination is written, so a
    /// failure leaves both untouched.
    pub fn exec_into<V, I>(&self, values: &V, indices: &I, ex: &dyn Executor) -> Result<()>
    where
        V: OperatorMut<Value = O::Value> + Clone + 'static,
        I: OperatorMut<Value = i64> + Clone + 'static,
    {
        check_destination("argmin values", &self.shape, values.shape())?;
        check_destination("argmin indices", &self.shape, indices.shape())?;

        let children: [&dyn Node; 1] = [&*self.input];
        tx_core::operator::prepare_children(&children, ex)?;

        let input = Arc::clone(&self.input);
        let (outer, inner) = (self.shape.numel(), self.inner);
        let ctx = ex.context();
        let (values, indices) = (values.clone(), indices.clone());
        let issued = ex.submit(Job::compute(self.name(), move || {
            let x = read_f64(&*input)?;
            let (mins, positions) = ctx.numeric.argmin(&x, outer, inner)?;
            let mins: Vec<O::Value> = from_f64("argmin", mins)?;
            let positions: Vec<i64> = positions.into_iter().map(|p| p as i64).collect();
            values.store(&mins)?;
            indices.store(&positions)
        }));
        let released = tx_core::operator::release_children(&children, ex);
        issued?;
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{init, tensor};
    use crate::sum;
    use tx_core::ops::permute;
    use tx_core::{Allocator, ErrorKind, HostExecutor, StreamExecutor, Tensor, TrackingAllocator};

    #[test]
    fn test_argmin_last_dim() {
        init();
        let ex = HostExecutor::new();
        let x = tensor(vec![3.0, 1.0, 2.0, 1.0, 5.0, 0.0, 0.0, 4.0], vec![2, 4]);
        let a = argmin(x, &[1]).unwrap();
        let values: Tensor<f64> = Tensor::zeros(vec![2]);
        let indices: Tensor<i64> = Tensor::zeros(vec![2]);
        a.exec_into(&values, &indices, &ex).unwrap();
        assert_eq!(values.to_vec().unwrap(), vec![1.0, 0.0]);
        // first occurrence wins
        assert_eq!(indices.to_vec().unwrap(), vec![1, 1]);
    }

    #[test]
    fn test_argmin_full_on_stream() {
        let ex = StreamExecutor::new().unwrap();
        let x = tensor(vec![4.0, 2.0, 9.0, -1.0, 7.0, 3.0], vec![2, 3]);
        let a = argmin_full(x).unwrap();
        assert_eq!(a.output_shape().ndim(), 0);
        let values: Tensor<f64> = Tensor::zeros(Shape::scalar());
        let indices: Tensor<i64> = Tensor::zeros(Shape::scalar());
        a.exec_into(&values, &indices, &ex).unwrap();
        ex.sync().unwrap();
        assert_eq!(values.to_vec().unwrap(), vec![-1.0]);
        assert_eq!(indices.to_vec().unwrap(), vec![3]);
    }

    #[test]
    fn test_argmin_leading_dim() {
        let ex = HostExecutor::new();
        let x = tensor(vec![5.0, 1.0, 2.0, 8.0], vec![2, 2]);
        let a = argmin(x, &[0]).unwrap();
        let values: Tensor<f64> = Tensor::zeros(vec![2]);
        let indices: Tensor<i64> = Tensor::zeros(vec![2]);
        a.exec_into(&values, &indices, &ex).unwrap();
        assert_eq!(values.to_vec().unwrap(), vec![2.0, 1.0]);
        assert_eq!(indices.to_vec().unwrap(), vec![1, 0]);
    }

    #[test]
    fn test_argmin_destination_shape() {
        let ex = HostExecutor::new();
        let a = argmin(tensor(vec![1.0; 6], vec![2, 3]), &[1]).unwrap();
        let values: Tensor<f64> = Tensor::zeros(vec![2]);
        let indices: Tensor<i64> = Tensor::zeros(vec![3]);
        let err = a.exec_into(&values, &indices, &ex).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Construction);
        assert_eq!(values.to_vec().unwrap(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_argmin_prepares_transform_input() {
        let alloc = Arc::new(TrackingAllocator::new());
        let ex = HostExecutor::new().with_allocator(alloc.clone());
        let x = tensor((0..12).map(|v| (v % 5) as f64).collect(), vec![2, 3, 2]);
        let rows = sum(permute(x, &[0, 2, 1]).unwrap(), &[2]).unwrap();
        let a = argmin(rows, &[1]).unwrap();
        let values: Tensor<f64> = Tensor::zeros(vec![2]);
        let indices: Tensor<i64> = Tensor::zeros(vec![2]);
        a.exec_into(&values, &indices, &ex).unwrap();
        // column sums: [0+2+4, 1+3+0] and [1+3+0, 2+4+1]
        assert_eq!(values.to_vec().unwrap(), vec![4.0, 4.0]);
        assert_eq!(indices.to_vec().unwrap(), vec![1, 0]);
        let stats = alloc.stats();
        assert_eq!((stats.allocations, stats.frees), (1, 1));
    }
}
