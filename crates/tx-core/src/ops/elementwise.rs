use std::fmt;
use std::marker::PhantomData;
use std::ops::{Add, Mul, Sub};

use crate::capability::{CapabilityKind, CapabilityValue};
use crate::dtype::Scalar;
use crate::error::{Result, TensorError};
use crate::executor::Executor;
use crate::operator::{self, Node, Operator};
use crate::shape::{Index, Shape};

/// Applies `f` to every element of a child.
pub struct Map<O, F, U> {
    child: O,
    f: F,
    _out: PhantomData<fn() -> U>,
}

pub fn map<O, F, U>(op: O, f: F) -> Map<O, F, U>
where
    O: Operator,
    F: Fn(O::Value) -> U + Send + Sync,
    U: Scalar,
{
    Map {
        child: op,
        f,
        _out: PhantomData,
    }
}

impl<O: Clone, F: Clone, U> Clone for Map<O, F, U> {
    fn clone(&self) -> Self {
        Map {
            child: self.child.clone(),
            f: self.f.clone(),
            _out: PhantomData,
        }
    }
}

impl<O: fmt::Debug, F, U> fmt::Debug for Map<O, F, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Map").field("child", &self.child).finish()
    }
}

impl<O, F, U> Node for Map<O, F, U>
where
    O: Operator,
    F: Fn(O::Value) -> U + Send + Sync,
    U: Scalar,
{
    fn name(&self) -> String {
        format!("map({})", self.child.name())
    }

    fn capability(&self, kind: CapabilityKind) -> CapabilityValue {
        self.child.capability(kind)
    }

    fn needs_prepare(&self) -> bool {
        self.child.needs_prepare()
    }

    fn prepare(&self, ex: &dyn Executor) -> Result<()> {
        self.child.prepare(ex)
    }

    fn release(&self, ex: &dyn Executor) -> Result<()> {
        self.child.release(ex)
    }
}

impl<O, F, U> Operator for Map<O, F, U>
where
    O: Operator,
    F: Fn(O::Value) -> U + Send + Sync,
    U: Scalar,
{
    type Value = U;

    fn rank(&self) -> usize {
        self.child.rank()
    }

    fn size(&self, dim: usize) -> usize {
        self.child.size(dim)
    }

    fn read(&self, idx: &[usize]) -> Result<U> {
        Ok((self.f)(self.child.read(idx)?))
    }
}

/// Combines two children elementwise, broadcasting numpy style.
pub struct ZipWith<A, B, F, U> {
    a: A,
    b: B,
    f: F,
    shape: Shape,
    _out: PhantomData<fn() -> U>,
}

pub fn zip_with<A, B, F, U>(a: A, b: B, f: F) -> Result<ZipWith<A, B, F, U>>
where
    A: Operator,
    B: Operator,
    F: Fn(A::Value, B::Value) -> U + Send + Sync,
    U: Scalar,
{
    let shape = Shape::broadcast_shape(&a.shape(), &b.shape())?;
    Ok(ZipWith {
        a,
        b,
        f,
        shape,
        _out: PhantomData,
    })
}

type BinaryFn<T> = fn(T, T) -> T;

pub fn add<A, B>(a: A, b: B) -> Result<ZipWith<A, B, BinaryFn<A::Value>, A::Value>>
where
    A: Operator,
    B: Operator<Value = A::Value>,
    A::Value: Add<Output = A::Value>,
{
    let f: BinaryFn<A::Value> = |x, y| x + y;
    zip_with(a, b, f)
}

pub fn sub<A, B>(a: A, b: B) -> Result<ZipWith<A, B, BinaryFn<A::Value>, A::Value>>
where
    A: Operator,
    B: Operator<Value = A::Value>,
    A::Value: Sub<Output = A::Value>,
{
    let f: BinaryFn<A::Value> = |x, y| x - y;
    zip_with(a, b, f)
}

pub fn mul<A, B>(a: A, b: B) -> Result<ZipWith<A, B, BinaryFn<A::Value>, A::Value>>
where
    A: Operator,
    B: Operator<Value = A::Value>,
    A::Value: Mul<Output = A::Value>,
{
    let f: BinaryFn<A::Value> = |x, y| x * y;
    zip_with(a, b, f)
}

/// Maps an output coordinate onto an operand that broadcasts into `out_rank` dims.
fn broadcast_index<O: Operator>(op: &O, idx: &[usize]) -> Index {
    let skip = idx.len() - op.rank();
    idx[skip..]
        .iter()
        .enumerate()
        .map(|(d, &i)| if op.size(d) == 1 { 0 } else { i })
        .collect()
}

impl<A: Clone, B: Clone, F: Clone, U> Clone for ZipWith<A, B, F, U> {
    fn clone(&self) -> Self {
        ZipWith {
            a: self.a.clone(),
            b: self.b.clone(),
            f: self.f.clone(),
            shape: self.shape.clone(),
            _out: PhantomData,
        }
    }
}

impl<A: fmt::Debug, B: fmt::Debug, F, U> fmt::Debug for ZipWith<A, B, F, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZipWith")
            .field("a", &self.a)
            .field("b", &self.b)
            .field("shape", &self.shape)
            .finish()
    }
}

impl<A, B, F, U> Node for ZipWith<A, B, F, U>
where
    A: Operator,
    B: Operator,
    F: Fn(A::Value, B::Value) -> U + Send + Sync,
    U: Scalar,
{
    fn name(&self) -> String {
        format!("zip({}, {})", self.a.name(), self.b.name())
    }

    fn capability(&self, kind: CapabilityKind) -> CapabilityValue {
        let broadcasting = self.a.shape() != self.shape || self.b.shape() != self.shape;
        match kind {
            CapabilityKind::VectorWidth if broadcasting => CapabilityValue::Width(1),
            _ => operator::fold_children(kind, &[&self.a, &self.b]),
        }
    }

    fn needs_prepare(&self) -> bool {
        self.a.needs_prepare() || self.b.needs_prepare()
    }

    fn prepare(&self, ex: &dyn Executor) -> Result<()> {
        operator::prepare_children(&[&self.a, &self.b], ex)
    }

    fn release(&self, ex: &dyn Executor) -> Result<()> {
        operator::release_children(&[&self.a, &self.b], ex)
    }
}

impl<A, B, F, U> Operator for ZipWith<A, B, F, U>
where
    A: Operator,
    B: Operator,
    F: Fn(A::Value, B::Value) -> U + Send + Sync,
    U: Scalar,
{
    type Value = U;

    fn rank(&self) -> usize {
        self.shape.ndim()
    }

    fn size(&self, dim: usize) -> usize {
        self.shape.dim(dim)
    }

    fn read(&self, idx: &[usize]) -> Result<U> {
        let x = self.a.read(&broadcast_index(&self.a, idx))?;
        let y = self.b.read(&broadcast_index(&self.b, idx))?;
        Ok((self.f)(x, y))
    }

    fn shape(&self) -> Shape {
        self.shape.clone()
    }
}

/// Evaluates `first` for its effects, such as an [`assign`](super::assign), then
/// yields `second`.
#[derive(Debug, Clone)]
pub struct Sequenced<A, B> {
    first: A,
    second: B,
}

pub fn sequenced<A: Operator, B: Operator>(first: A, second: B) -> Result<Sequenced<A, B>> {
    let (a, b) = (first.shape(), second.shape());
    if a != b {
        return Err(TensorError::ShapeMismatch {
            expected: a.dims().to_vec(),
            got: b.dims().to_vec(),
        });
    }
    Ok(Sequenced { first, second })
}

impl<A: Operator, B: Operator> Node for Sequenced<A, B> {
    fn name(&self) -> String {
        format!("({}, {})", self.first.name(), self.second.name())
    }

    fn capability(&self, kind: CapabilityKind) -> CapabilityValue {
        operator::fold_children(kind, &[&self.first, &self.second])
    }

    fn needs_prepare(&self) -> bool {
        self.first.needs_prepare() || self.second.needs_prepare()
    }

    fn prepare(&self, ex: &dyn Executor) -> Result<()> {
        operator::prepare_children(&[&self.first, &self.second], ex)
    }

    fn release(&self, ex: &dyn Executor) -> Result<()> {
        operator::release_children(&[&self.first, &self.second], ex)
    }
}

impl<A: Operator, B: Operator> Operator for Sequenced<A, B> {
    type Value = B::Value;

    fn rank(&self) -> usize {
        self.second.rank()
    }

    fn size(&self, dim: usize) -> usize {
        self.second.size(dim)
    }

    fn read(&self, idx: &[usize]) -> Result<B::Value> {
        self.first.read(idx)?;
        self.second.read(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::Tensor;

    #[test]
    fn test_map() {
        let t = Tensor::from_vec(vec![1i32, -2, 3], vec![3]).unwrap();
        let m = map(t, |v: i32| v as f64 * 0.5);
        assert_eq!(m.read(&[1]).unwrap(), -1.0);
        assert_eq!(m.dtype(), crate::dtype::DType::F64);
    }

    #[test]
    fn test_add_broadcasts() {
        let a = Tensor::from_vec(vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]).unwrap();
        let b = Tensor::from_vec(vec![10.0f32, 20.0, 30.0], vec![3]).unwrap();
        let s = add(a, b).unwrap();
        assert_eq!(s.shape().dims(), &[2, 3]);
        assert_eq!(s.read(&[1, 2]).unwrap(), 36.0);
        assert_eq!(
            s.capability(CapabilityKind::VectorWidth),
            CapabilityValue::Width(1)
        );
    }

    #[test]
    fn test_column_broadcast() {
        let a = Tensor::from_vec(vec![1i64, 2], vec![2, 1]).unwrap();
        let b = Tensor::from_vec(vec![10i64, 20, 30], vec![1, 3]).unwrap();
        let p = mul(a.clone(), b.clone()).unwrap();
        assert_eq!(p.shape().dims(), &[2, 3]);
        assert_eq!(p.read(&[1, 2]).unwrap(), 60);
        let d = sub(b, a).unwrap();
        assert_eq!(d.read(&[0, 1]).unwrap(), 19);
    }

    #[test]
    fn test_incompatible_shapes() {
        let a: Tensor<f32> = Tensor::zeros(vec![2, 3]);
        let b: Tensor<f32> = Tensor::zeros(vec![4]);
        assert!(matches!(
            add(a, b),
            Err(TensorError::BroadcastError { .. })
        ));
    }

    #[test]
    fn test_sequenced_yields_second() {
        let a = Tensor::from_vec(vec![1u8, 2], vec![2]).unwrap();
        let b = Tensor::from_vec(vec![7i32, 8], vec![2]).unwrap();
        let s = sequenced(a.clone(), b).unwrap();
        assert_eq!(s.read(&[1]).unwrap(), 8);
        let c: Tensor<i32> = Tensor::zeros(vec![3]);
        assert!(sequenced(a, c).is_err());
    }
}
