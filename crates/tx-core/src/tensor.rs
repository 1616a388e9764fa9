use std::sync::Arc;

use crate::capability::{CapabilityKind, CapabilityValue, Placement};
use crate::dtype::Scalar;
use crate::error::{Result, TensorError};
use crate::operator::{Node, Operator, OperatorMut};
use crate::shape::Shape;
use crate::storage::Storage;

/// A strided view of shared host storage. The leaf of every operator tree.
///
/// Cloning a tensor clones the view; both views address the same elements.
#[derive(Debug, Clone)]
pub struct Tensor<T> {
    storage: Arc<Storage<T>>,
    shape: Shape,
    strides: Vec<usize>,
    offset: usize,
    placement: Placement,
}

impl<T: Scalar> Tensor<T> {
    /// Create a new tensor from row-major data and a shape.
    pub fn from_vec(data: Vec<T>, shape: impl Into<Shape>) -> Result<Self> {
        let shape = shape.into();
        if data.len() != shape.numel() {
            return Err(TensorError::ShapeMismatch {
                expected: shape.dims().to_vec(),
                got: vec![data.len()],
            });
        }
        Ok(Self::contiguous(Storage::from_vec(data), shape))
    }

    /// Create a zero-filled tensor with the given shape.
    pub fn zeros(shape: impl Into<Shape>) -> Self {
        let shape = shape.into();
        Self::contiguous(Storage::zeros(shape.numel()), shape)
    }

    pub fn full(shape: impl Into<Shape>, value: T) -> Self {
        let shape = shape.into();
        Self::contiguous(Storage::from_vec(vec![value; shape.numel()]), shape)
    }

    /// A rank-0 tensor holding `value`.
    pub fn scalar(value: T) -> Self {
        Self::contiguous(Storage::from_vec(vec![value]), Shape::scalar())
    }

    fn contiguous(storage: Storage<T>, shape: Shape) -> Self {
        Tensor {
            storage: Arc::new(storage),
            strides: shape.strides(),
            shape,
            offset: 0,
            placement: Placement::Any,
        }
    }

    /// Marks where this tensor's memory lives. Executors refuse trees whose
    /// placement they cannot reach.
    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    /// Returns a reference to the tensor's shape.
    pub fn dims(&self) -> &Shape {
        &self.shape
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub fn is_contiguous(&self) -> bool {
        self.shape.is_contiguous(&self.strides)
    }

    /// True when both views address the same storage.
    pub fn shares_storage(&self, other: &Tensor<T>) -> bool {
        Arc::ptr_eq(&self.storage, &other.storage)
    }

    /// Copies the viewed elements out in row-major order.
    pub fn to_vec(&self) -> Result<Vec<T>> {
        let data = self.storage.read()?;
        if self.is_contiguous() {
            let n = self.shape.numel();
            return Ok(data[self.offset..self.offset + n].to_vec());
        }
        let mut out = Vec::with_capacity(self.shape.numel());
        let mut idx = self.shape.unravel(0);
        for _ in 0..self.shape.numel() {
            out.push(data[self.offset_of(&idx)]);
            self.shape.increment(&mut idx);
        }
        Ok(out)
    }

    /// Reshape a contiguous tensor, returning a view over the same storage.
    ///
    /// The total number of elements must remain the same.
    pub fn reshape(&self, new_shape: impl Into<Shape>) -> Result<Tensor<T>> {
        let new_shape = new_shape.into();
        if self.shape.numel() != new_shape.numel() {
            return Err(TensorError::ShapeMismatch {
                expected: self.shape.dims().to_vec(),
                got: new_shape.dims().to_vec(),
            });
        }
        if !self.is_contiguous() {
            return Err(TensorError::construction(
                "reshape",
                "only contiguous tensors can be reshaped",
            ));
        }
        Ok(Tensor {
            storage: Arc::clone(&self.storage),
            strides: new_shape.strides(),
            shape: new_shape,
            offset: self.offset,
            placement: self.placement,
        })
    }

    fn offset_of(&self, idx: &[usize]) -> usize {
        self.offset
            + idx
                .iter()
                .zip(self.strides.iter())
                .map(|(i, s)| i * s)
                .sum::<usize>()
    }

    fn checked_offset(&self, idx: &[usize]) -> Result<usize> {
        if idx.len() != self.shape.ndim()
            || idx.iter().zip(self.shape.dims()).any(|(&i, &d)| i >= d)
        {
            return Err(TensorError::precondition(
                "tensor",
                format!("index {:?} out of bounds for shape {}", idx, self.shape),
            ));
        }
        Ok(self.offset_of(idx))
    }
}

impl<T: Scalar> Node for Tensor<T> {
    fn name(&self) -> String {
        format!("tensor{}", self.shape)
    }

    fn capability(&self, kind: CapabilityKind) -> CapabilityValue {
        match kind {
            CapabilityKind::VectorWidth if !self.is_contiguous() => CapabilityValue::Width(1),
            CapabilityKind::Placement => CapabilityValue::Placement(self.placement),
            _ => kind.default_value(),
        }
    }
}

impl<T: Scalar> Operator for Tensor<T> {
    type Value = T;

    fn rank(&self) -> usize {
        self.shape.ndim()
    }

    fn size(&self, dim: usize) -> usize {
        self.shape.dim(dim)
    }

    fn read(&self, idx: &[usize]) -> Result<T> {
        let offset = self.checked_offset(idx)?;
        self.storage.get(offset)
    }

    fn shape(&self) -> Shape {
        self.shape.clone()
    }
}

impl<T: Scalar> OperatorMut for Tensor<T> {
    fn write(&self, idx: &[usize], value: T) -> Result<()> {
        let offset = self.checked_offset(idx)?;
        self.storage.set(offset, value)
    }

    fn store(&self, values: &[T]) -> Result<()> {
        let n = self.shape.numel();
        if values.len() != n {
            return Err(TensorError::ShapeMismatch {
                expected: self.shape.dims().to_vec(),
                got: vec![values.len()],
            });
        }
        let mut data = self.storage.write()?;
        if self.is_contiguous() {
            data[self.offset..self.offset + n].copy_from_slice(values);
            return Ok(());
        }
        let mut idx = self.shape.unravel(0);
        for &v in values {
            let offset = self.offset_of(&idx);
            data[offset] = v;
            self.shape.increment(&mut idx);
        }
        Ok(())
    }
}
