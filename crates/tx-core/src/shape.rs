use crate::error::{Result, TensorError};
use smallvec::SmallVec;
use std::fmt;

/// A multi-dimensional coordinate, outermost dimension first.
///
/// Most operator trees are low rank, so coordinates live on the stack.
pub type Index = SmallVec<[usize; 6]>;

/// Dimension sizes of an operator, outermost first.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    pub fn new(dims: Vec<usize>) -> Self {
        Shape { dims }
    }

    pub fn from_slice(dims: &[usize]) -> Self {
        Shape {
            dims: dims.to_vec(),
        }
    }

    /// The rank-0 shape. It has exactly one element.
    pub fn scalar() -> Self {
        Shape { dims: Vec::new() }
    }

    /// The rank.
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Element count. 1 for rank 0.
    pub fn numel(&self) -> usize {
        self.dims.iter().copied().product()
    }

    /// Size of dimension `i`, which must be below `ndim()`.
    pub fn dim(&self, i: usize) -> usize {
        self.dims[i]
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Returns `InvalidAxis` unless `axis < ndim()`.
    pub fn check_dim(&self, axis: usize) -> Result<()> {
        if axis >= self.dims.len() {
            return Err(TensorError::InvalidAxis {
                axis,
                ndim: self.dims.len(),
            });
        }
        Ok(())
    }

    /// Row-major element strides, innermost stride 1.
    pub fn strides(&self) -> Vec<usize> {
        let mut strides = vec![1usize; self.dims.len()];
        let mut step = 1;
        for (stride, &d) in strides.iter_mut().zip(self.dims.iter()).rev() {
            *stride = step;
            step *= d;
        }
        strides
    }

    /// True when `strides` are the row-major strides of this shape.
    pub fn is_contiguous(&self, strides: &[usize]) -> bool {
        strides == self.strides().as_slice()
    }

    /// Row-major linear position of `idx`.
    pub fn ravel(&self, idx: &[usize]) -> usize {
        idx.iter()
            .zip(self.dims.iter())
            .fold(0, |acc, (&i, &d)| acc * d + i)
    }

    /// Writes the row-major coordinate of `linear` into `out`.
    ///
    /// `out` must have `ndim()` entries.
    pub fn unravel_into(&self, mut linear: usize, out: &mut [usize]) {
        for (slot, &d) in out.iter_mut().zip(self.dims.iter()).rev() {
            if d == 0 {
                *slot = 0;
                continue;
            }
            *slot = linear % d;
            linear /= d;
        }
    }

    /// Row-major coordinate of `linear`.
    pub fn unravel(&self, linear: usize) -> Index {
        let mut idx: Index = SmallVec::from_elem(0, self.dims.len());
        self.unravel_into(linear, &mut idx);
        idx
    }

    /// Advances `idx` to the next coordinate in row-major order.
    ///
    /// Returns false once every coordinate has been visited; `idx` wraps to zeros.
    pub fn increment(&self, idx: &mut [usize]) -> bool {
        for (slot, &d) in idx.iter_mut().zip(self.dims.iter()).rev() {
            *slot += 1;
            if *slot < d {
                return true;
            }
            *slot = 0;
        }
        false
    }

    /// Shape produced by broadcasting `a` against `b`.
    ///
    /// Dims are right-aligned and missing leading dims count as 1. Each pair
    /// must be equal or contain a 1.
    pub fn broadcast_shape(a: &Shape, b: &Shape) -> Result<Shape> {
        let rank = a.ndim().max(b.ndim());
        let aligned = |s: &Shape, i: usize| {
            (i + s.ndim())
                .checked_sub(rank)
                .map_or(1, |j| s.dims[j])
        };
        let mut dims = Vec::with_capacity(rank);
        for i in 0..rank {
            let (da, db) = (aligned(a, i), aligned(b, i));
            match (da, db) {
                _ if da == db => dims.push(da),
                (1, _) => dims.push(db),
                (_, 1) => dims.push(da),
                _ => {
                    return Err(TensorError::BroadcastError {
                        a: a.dims.clone(),
                        b: b.dims.clone(),
                    })
                }
            }
        }
        Ok(Shape::new(dims))
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims: Vec<String> = self.dims.iter().map(|d| d.to_string()).collect();
        write!(f, "[{}]", dims.join(", "))
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Shape::new(dims)
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Shape::from_slice(dims)
    }
}
