//! Views between a complex operator and its planar real layout.
//!
//! A planar layout stores the real parts of a block of complex values followed
//! by their imaginary parts, split along the planar dim: dim 0 for rank 1, the
//! second-to-last dim otherwise. Leading dims are batch dims.

use num_complex::Complex;

use crate::capability::{CapabilityKind, CapabilityValue};
use crate::dtype::Scalar;
use crate::error::{Result, TensorError};
use crate::executor::Executor;
use crate::operator::{Node, Operator};
use crate::shape::Index;

fn planar_dim(rank: usize) -> usize {
    rank.saturating_sub(2)
}

/// Complex view of a real planar operator. The planar dim halves.
#[derive(Debug, Clone)]
pub struct Interleaved<O> {
    child: O,
    dim: usize,
    half: usize,
}

pub fn interleaved<O>(op: O) -> Result<Interleaved<O>>
where
    O: Operator,
    Complex<O::Value>: Scalar,
{
    if op.rank() == 0 {
        return Err(TensorError::construction("interleaved", "input must have rank >= 1"));
    }
    let dim = planar_dim(op.rank());
    let len = op.size(dim);
    if len % 2 != 0 {
        return Err(TensorError::construction(
            "interleaved",
            format!("planar dimension {} has odd length {}", dim, len),
        ));
    }
    Ok(Interleaved {
        child: op,
        dim,
        half: len / 2,
    })
}

impl<O: Operator> Node for Interleaved<O> {
    fn name(&self) -> String {
        format!("interleaved({})", self.child.name())
    }

    fn capability(&self, kind: CapabilityKind) -> CapabilityValue {
        match kind {
            CapabilityKind::VectorWidth => CapabilityValue::Width(1),
            _ => self.child.capability(kind),
        }
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

impl<O> Operator for Interleaved<O>
where
    O: Operator,
    Complex<O::Value>: Scalar,
{
    type Value = Complex<O::Value>;

    fn rank(&self) -> usize {
        self.child.rank()
    }

    fn size(&self, dim: usize) -> usize {
        if dim == self.dim {
            self.half
        } else {
            self.child.size(dim)
        }
    }

    fn read(&self, idx: &[usize]) -> Result<Self::Value> {
        let re = self.child.read(idx)?;
        let mut imag: Index = Index::from_slice(idx);
        imag[self.dim] += self.half;
        let im = self.child.read(&imag)?;
        Ok(Complex::new(re, im))
    }
}

/// Real planar view of a complex operator. The planar dim doubles.
#[derive(Debug, Clone)]
pub struct Planar<O> {
    child: O,
    dim: usize,
}

pub fn planar<O, T>(op: O) -> Result<Planar<O>>
where
    O: Operator<Value = Complex<T>>,
    T: Scalar,
{
    if op.rank() == 0 {
        return Err(TensorError::construction("planar", "input must have rank >= 1"));
    }
    let dim = planar_dim(op.rank());
    Ok(Planar { child: op, dim })
}

impl<O: Operator> Node for Planar<O> {
    fn name(&self) -> String {
        format!("planar({})", self.child.name())
    }

    fn capability(&self, kind: CapabilityKind) -> CapabilityValue {
        match kind {
            CapabilityKind::VectorWidth => CapabilityValue::Width(1),
            _ => self.child.capability(kind),
        }
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

impl<O, T> Operator for Planar<O>
where
    O: Operator<Value = Complex<T>>,
    T: Scalar,
{
    type Value = T;

    fn rank(&self) -> usize {
        self.child.rank()
    }

    fn size(&self, dim: usize) -> usize {
        let n = self.child.size(dim);
        if dim == self.dim {
            2 * n
        } else {
            n
        }
    }

    fn read(&self, idx: &[usize]) -> Result<T> {
        let half = self.child.size(self.dim);
        if idx[self.dim] < half {
            return Ok(self.child.read(idx)?.re);
        }
        let mut child: Index = Index::from_slice(idx);
        child[self.dim] -= half;
        Ok(self.child.read(&child)?.im)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::host::HostExecutor;
    use crate::run::eval;
    use crate::tensor::Tensor;
    use num_complex::{Complex32, Complex64};

    #[test]
    fn test_rank_one_halves() {
        let t = Tensor::from_vec(vec![1.0f64, 2.0, 3.0, 4.0], vec![4]).unwrap();
        let z = interleaved(t).unwrap();
        assert_eq!(z.shape().dims(), &[2]);
        assert_eq!(z.read(&[0]).unwrap(), Complex64::new(1.0, 3.0));
        assert_eq!(z.read(&[1]).unwrap(), Complex64::new(2.0, 4.0));
        assert_eq!(z.dtype(), crate::dtype::DType::C64);
    }

    #[test]
    fn test_batched_rows_split() {
        // Per batch: two rows of real parts, then two rows of imaginary parts.
        let t = Tensor::from_vec((0..24).map(|v| v as f32).collect(), vec![2, 4, 3]).unwrap();
        let z = interleaved(t).unwrap();
        assert_eq!(z.shape().dims(), &[2, 2, 3]);
        assert_eq!(z.read(&[1, 1, 2]).unwrap(), Complex32::new(17.0, 23.0));
    }

    #[test]
    fn test_planar_inverts_interleaved() {
        let ex = HostExecutor::new();
        let t = Tensor::from_vec((0..12).map(|v| v as f64).collect(), vec![4, 3]).unwrap();
        let back = eval(planar(interleaved(t.clone()).unwrap()).unwrap(), &ex).unwrap();
        assert_eq!(back.shape(), t.shape());
        assert_eq!(back.to_vec().unwrap(), t.to_vec().unwrap());
    }

    #[test]
    fn test_odd_planar_dim_rejected() {
        let t: Tensor<f64> = Tensor::zeros(vec![3, 2]);
        assert_eq!(interleaved(t).unwrap_err().kind(), ErrorKind::Construction);
        let s: Tensor<f64> = Tensor::zeros(Vec::<usize>::new());
        assert!(interleaved(s).is_err());
    }
}
