use std::thread;

use crate::error::{Result, TensorError};
use crate::operator::Operator;
use crate::shape::Shape;

/// Reads every element of `op` in row-major order.
///
/// With `threads > 1` the output is split into contiguous blocks, each filled
/// by its own scoped thread. Blocks are disjoint so no element is written twice.
pub fn evaluate<O>(op: &O, threads: usize) -> Result<Vec<O::Value>>
where
    O: Operator + ?Sized,
{
    let shape = op.shape();
    let n = shape.numel();
    let mut out = vec![O::Value::default(); n];
    if n == 0 {
        return Ok(out);
    }

    let threads = threads.clamp(1, n);
    if threads == 1 {
        fill_range(op, &shape, 0, &mut out)?;
        return Ok(out);
    }

    let block = n.div_ceil(threads);
    thread::scope(|s| {
        let shape = &shape;
        let workers: Vec<_> = out
            .chunks_mut(block)
            .enumerate()
            .map(|(i, part)| s.spawn(move || fill_range(op, shape, i * block, part)))
            .collect();
        workers.into_iter().try_for_each(|w| {
            w.join()
                .map_err(|_| TensorError::Execution("host worker panicked".to_string()))?
        })
    })?;
    Ok(out)
}

/// Fills `out` with the elements starting at row-major position `start`.
pub fn fill_range<O>(op: &O, shape: &Shape, start: usize, out: &mut [O::Value]) -> Result<()>
where
    O: Operator + ?Sized,
{
    let mut idx = shape.unravel(start);
    for slot in out.iter_mut() {
        *slot = op.read(&idx)?;
        shape.increment(&mut idx);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::Tensor;

    #[test]
    fn test_single_thread() {
        let t = Tensor::from_vec((0..6).collect::<Vec<i32>>(), vec![2, 3]).unwrap();
        assert_eq!(evaluate(&t, 1).unwrap(), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_threads_cover_every_element_once() {
        let data: Vec<i64> = (0..101).collect();
        let t = Tensor::from_vec(data.clone(), vec![101]).unwrap();
        for threads in [2, 3, 7, 200] {
            assert_eq!(evaluate(&t, threads).unwrap(), data);
        }
    }

    #[test]
    fn test_rank_zero() {
        let t = Tensor::scalar(4.5f64);
        assert_eq!(evaluate(&t, 4).unwrap(), vec![4.5]);
    }
}
