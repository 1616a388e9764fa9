use std::sync::Arc;

use log::{debug, warn};

use crate::capability::{CapabilityKind, Placement};
use crate::error::{Result, TensorError};
use crate::executor::{Executor, ExecutorKind, Job};
use crate::host::walk;
use crate::operator::{self, Node, Operator, OperatorMut};
use crate::tensor::Tensor;

/// Fails when a subtree's placement is unreachable from `ex`.
pub fn check_placement(nodes: &[&dyn Node], ex: &dyn Executor) -> Result<()> {
    let placement = operator::fold_children(CapabilityKind::Placement, nodes).as_placement();
    let reachable = match (placement, ex.kind()) {
        (Some(Placement::Host), ExecutorKind::Stream) => false,
        (Some(Placement::Device), ExecutorKind::Host) => false,
        (None, _) => false,
        _ => true,
    };
    if !reachable {
        let names: Vec<String> = nodes.iter().map(|n| n.name()).collect();
        return Err(TensorError::unsupported_executor(names.join(" <- "), ex.name()));
    }
    Ok(())
}

/// Evaluates `expr` elementwise into `dst`.
///
/// Nodes owning temporaries are prepared first and released once the
/// evaluation has been issued. On a stream executor this returns at issue
/// time; call `sync` before reading `dst`.
pub fn run<D, O>(dst: &D, expr: O, ex: &dyn Executor) -> Result<()>
where
    D: OperatorMut + Clone + 'static,
    O: Operator<Value = D::Value> + 'static,
{
    let (want, got) = (dst.shape(), expr.shape());
    if want != got {
        return Err(TensorError::ShapeMismatch {
            expected: want.dims().to_vec(),
            got: got.dims().to_vec(),
        });
    }
    check_placement(&[dst, &expr], ex)?;

    let expr = Arc::new(expr);
    let lifecycle = expr.needs_prepare();
    if lifecycle {
        expr.prepare(ex)?;
    }

    let parallel = expr
        .capability(CapabilityKind::Parallel)
        .as_flag()
        .unwrap_or(false);
    let threads = if parallel {
        ex.threads()
    } else {
        if ex.threads() > 1 {
            warn!(
                "{} is not parallel safe; evaluating on one thread instead of {}",
                expr.name(),
                ex.threads()
            );
        }
        1
    };
    debug!(
        "run {} ({} elements) on {} with {} thread(s)",
        expr.name(),
        got.numel(),
        ex.name(),
        threads
    );

    let job_expr = Arc::clone(&expr);
    let out = dst.clone();
    let issued = ex.submit(Job::compute(format!("eval {}", expr.name()), move || {
        let values = walk::evaluate(&*job_expr, threads)?;
        out.store(&values)
    }));

    let released = if lifecycle { expr.release(ex) } else { Ok(()) };
    issued?;
    released
}

/// Evaluates `expr` into a new contiguous tensor and waits for it.
pub fn eval<O>(expr: O, ex: &dyn Executor) -> Result<Tensor<O::Value>>
where
    O: Operator + 'static,
{
    let dst = Tensor::zeros(expr.shape());
    run(&dst, expr, ex)?;
    ex.sync()?;
    Ok(dst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::{Allocator, TrackingAllocator};
    use crate::capability::CapabilityValue;
    use crate::error::ErrorKind;
    use crate::host::{HostExecParams, HostExecutor, ThreadsMode};
    use crate::ops::{add, map, permute, reverse, slice, SliceEnd};
    use crate::stream::StreamExecutor;
    use crate::transform::tests::Doubler;
    use crate::transform::Materialized;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn iota(dims: Vec<usize>) -> Tensor<f32> {
        let n: usize = dims.iter().product();
        Tensor::from_vec((0..n).map(|v| v as f32).collect(), dims).unwrap()
    }

    #[test]
    fn test_run_elementwise_host() {
        init();
        let ex = HostExecutor::new();
        let dst: Tensor<f32> = Tensor::zeros(vec![2, 2]);
        let expr = add(permute(iota(vec![2, 2]), &[1, 0]).unwrap(), iota(vec![2, 2])).unwrap();
        run(&dst, expr, &ex).unwrap();
        assert_eq!(dst.to_vec().unwrap(), vec![0.0, 3.0, 3.0, 6.0]);
    }

    #[test]
    fn test_run_multithreaded_matches_serial() {
        init();
        let ex = HostExecutor::with_params(HostExecParams {
            threads: ThreadsMode::Select(4),
        });
        let expr = map(reverse(iota(vec![5, 7]), 1).unwrap(), |v: f32| v * 2.0);
        let serial = eval(expr.clone(), &HostExecutor::new()).unwrap();
        let parallel = eval(expr, &ex).unwrap();
        assert_eq!(serial.to_vec().unwrap(), parallel.to_vec().unwrap());
    }

    #[test]
    fn test_shape_mismatch() {
        let ex = HostExecutor::new();
        let dst: Tensor<f32> = Tensor::zeros(vec![3]);
        let err = run(&dst, iota(vec![4]), &ex).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Construction);
    }

    #[test]
    fn test_placement_checked() {
        let ex = HostExecutor::new();
        let device = iota(vec![2]).with_placement(Placement::Device);
        let err = eval(device.clone(), &ex).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedExecutor);

        let stream = StreamExecutor::new().unwrap();
        assert_eq!(eval(device, &stream).unwrap().to_vec().unwrap(), vec![0.0, 1.0]);
        let host = iota(vec![2]).with_placement(Placement::Host);
        assert_eq!(
            eval(host, &stream).unwrap_err().kind(),
            ErrorKind::UnsupportedExecutor
        );
    }

    #[test]
    fn test_transform_in_tree_allocates_once() {
        init();
        let alloc = Arc::new(TrackingAllocator::new());
        let ex = HostExecutor::new().with_allocator(alloc.clone());
        let kernel = Doubler::new(vec![1.0, 2.0, 3.0, 4.0]);
        let runs = Arc::clone(&kernel.runs);
        let expr = slice(Materialized::new(kernel), &[1], &[SliceEnd::End]).unwrap();
        let out = eval(expr, &ex).unwrap();
        assert_eq!(out.to_vec().unwrap(), vec![4.0, 6.0, 8.0]);
        assert_eq!(runs.load(std::sync::atomic::Ordering::SeqCst), 1);
        let stats = alloc.stats();
        assert_eq!((stats.allocations, stats.frees), (1, 1));
    }

    #[test]
    fn test_stream_run_is_ordered() {
        init();
        let alloc = Arc::new(TrackingAllocator::new());
        let ex = StreamExecutor::with_backends(
            alloc.clone(),
            Arc::new(crate::cpu::CpuNumeric::new()),
        )
        .unwrap();
        let dst: Tensor<f64> = Tensor::zeros(vec![3]);
        run(&dst, Materialized::new(Doubler::new(vec![1.0, 2.0, 3.0])), &ex).unwrap();
        ex.sync().unwrap();
        assert_eq!(dst.to_vec().unwrap(), vec![2.0, 4.0, 6.0]);
        assert_eq!(alloc.stats().outstanding_bytes, 0);
    }

    #[test]
    fn test_parallel_capability_reported() {
        let t = iota(vec![3]);
        assert_eq!(
            t.capability(CapabilityKind::Parallel),
            CapabilityValue::Flag(true)
        );
    }
}
