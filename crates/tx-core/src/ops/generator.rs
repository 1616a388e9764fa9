use std::fmt;
use std::marker::PhantomData;

use crate::dtype::Scalar;
use crate::error::{Result, TensorError};
use crate::operator::{Node, Operator};
use crate::shape::Shape;

/// Rank-1 arithmetic sequence `first + i * step`, computed on read.
#[derive(Debug, Clone)]
pub struct Range<T> {
    len: usize,
    first: f64,
    step: f64,
    _value: PhantomData<fn() -> T>,
}

pub fn range<T: Scalar>(len: usize, first: f64, step: f64) -> Range<T> {
    Range {
        len,
        first,
        step,
        _value: PhantomData,
    }
}

/// `len` evenly spaced values from `first` to `last` inclusive.
pub fn linspace<T: Scalar>(len: usize, first: f64, last: f64) -> Result<Range<T>> {
    if len == 0 {
        return Err(TensorError::construction("linspace", "needs at least one point"));
    }
    let step = if len == 1 {
        0.0
    } else {
        (last - first) / (len - 1) as f64
    };
    Ok(range(len, first, step))
}

impl<T: Scalar> Node for Range<T> {
    fn name(&self) -> String {
        format!("range[{}]", self.len)
    }
}

impl<T: Scalar> Operator for Range<T> {
    type Value = T;

    fn rank(&self) -> usize {
        1
    }

    fn size(&self, _dim: usize) -> usize {
        self.len
    }

    fn read(&self, idx: &[usize]) -> Result<T> {
        let value = self.first + idx[0] as f64 * self.step;
        T::from_f64(value).ok_or_else(|| TensorError::unrepresentable("range", value, T::DTYPE))
    }
}

/// Elements computed from their coordinate by a closure.
pub struct Generator<F, T> {
    shape: Shape,
    f: F,
    _value: PhantomData<fn() -> T>,
}

pub fn from_fn<F, T>(shape: impl Into<Shape>, f: F) -> Generator<F, T>
where
    F: Fn(&[usize]) -> T + Send + Sync,
    T: Scalar,
{
    Generator {
        shape: shape.into(),
        f,
        _value: PhantomData,
    }
}

impl<F: Clone, T> Clone for Generator<F, T> {
    fn clone(&self) -> Self {
        Generator {
            shape: self.shape.clone(),
            f: self.f.clone(),
            _value: PhantomData,
        }
    }
}

impl<F, T> fmt::Debug for Generator<F, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator").field("shape", &self.shape).finish()
    }
}

impl<F, T> Node for Generator<F, T>
where
    F: Fn(&[usize]) -> T + Send + Sync,
    T: Scalar,
{
    fn name(&self) -> String {
        format!("generator{}", self.shape)
    }
}

impl<F, T> Operator for Generator<F, T>
where
    F: Fn(&[usize]) -> T + Send + Sync,
    T: Scalar,
{
    type Value = T;

    fn rank(&self) -> usize {
        self.shape.ndim()
    }

    fn size(&self, dim: usize) -> usize {
        self.shape.dim(dim)
    }

    fn read(&self, idx: &[usize]) -> Result<T> {
        Ok((self.f)(idx))
    }

    fn shape(&self) -> Shape {
        self.shape.clone()
    }
}
