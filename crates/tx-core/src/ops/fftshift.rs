use crate::capability::{CapabilityKind, CapabilityValue};
use crate::error::{Result, TensorError};
use crate::executor::Executor;
use crate::operator::{Node, Operator, OperatorMut};
use crate::shape::Index;

/// Circular shift of the trailing one or two dimensions.
#[derive(Debug, Clone)]
pub struct FftShift<O> {
    child: O,
    /// (dimension, offset added modulo the dimension size)
    shifts: Vec<(usize, usize)>,
    label: &'static str,
}

fn build<O: Operator>(op: O, dims: usize, inverse: bool, label: &'static str) -> Result<FftShift<O>> {
    let rank = op.rank();
    if rank < dims {
        return Err(TensorError::construction(
            label,
            format!("needs rank >= {}, got {}", dims, rank),
        ));
    }
    let shifts = (rank - dims..rank)
        .map(|d| {
            let n = op.size(d);
            (d, if inverse { n / 2 } else { (n + 1) / 2 })
        })
        .collect();
    Ok(FftShift {
        child: op,
        shifts,
        label,
    })
}

/// Moves the zero-frequency bin of the last dimension to the center.
pub fn fftshift_1d<O: Operator>(op: O) -> Result<FftShift<O>> {
    build(op, 1, false, "fftshift_1d")
}

/// Undoes [`fftshift_1d`].
pub fn ifftshift_1d<O: Operator>(op: O) -> Result<FftShift<O>> {
    build(op, 1, true, "ifftshift_1d")
}

pub fn fftshift_2d<O: Operator>(op: O) -> Result<FftShift<O>> {
    build(op, 2, false, "fftshift_2d")
}

pub fn ifftshift_2d<O: Operator>(op: O) -> Result<FftShift<O>> {
    build(op, 2, true, "ifftshift_2d")
}

impl<O: Operator> FftShift<O> {
    fn child_index(&self, idx: &[usize]) -> Index {
        let mut out: Index = idx.iter().copied().collect();
        for &(d, shift) in &self.shifts {
            out[d] = (idx[d] + shift) % self.child.size(d);
        }
        out
    }
}

impl<O: Operator> Node for FftShift<O> {
    fn name(&self) -> String {
        format!("{}({})", self.label, self.child.name())
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

impl<O: Operator> Operator for FftShift<O> {
    type Value = O::Value;

    fn rank(&self) -> usize {
        self.child.rank()
    }

    fn size(&self, dim: usize) -> usize {
        self.child.size(dim)
    }

    fn read(&self, idx: &[usize]) -> Result<O::Value> {
        self.child.read(&self.child_index(idx))
    }
}

impl<O: OperatorMut> OperatorMut for FftShift<O> {
    fn write(&self, idx: &[usize], value: O::Value) -> Result<()> {
        self.child.write(&self.child_index(idx), value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::Tensor;

    fn values<O: Operator>(op: &O) -> Vec<O::Value> {
        (0..op.size(0)).map(|i| op.read(&[i]).unwrap()).collect()
    }

    #[test]
    fn test_fftshift_odd_and_even() {
        let odd = Tensor::from_vec(vec![0i32, 1, 2, 3, 4], vec![5]).unwrap();
        assert_eq!(values(&fftshift_1d(odd.clone()).unwrap()), vec![3, 4, 0, 1, 2]);
        assert_eq!(values(&ifftshift_1d(odd).unwrap()), vec![2, 3, 4, 0, 1]);

        let even = Tensor::from_vec(vec![0i32, 1, 2, 3], vec![4]).unwrap();
        assert_eq!(values(&fftshift_1d(even).unwrap()), vec![2, 3, 0, 1]);
    }

    #[test]
    fn test_inverse_undoes_shift() {
        let t = Tensor::from_vec((0..7).collect::<Vec<i32>>(), vec![7]).unwrap();
        let round = ifftshift_1d(fftshift_1d(t.clone()).unwrap()).unwrap();
        assert_eq!(values(&round), t.to_vec().unwrap());
    }

    #[test]
    fn test_2d_shifts_last_two_dims() {
        let t = Tensor::from_vec((0..6).collect::<Vec<i32>>(), vec![2, 3]).unwrap();
        let s = fftshift_2d(t.clone()).unwrap();
        // rows shift by 1, columns by 2
        assert_eq!(s.read(&[0, 0]).unwrap(), 5);
        assert!(fftshift_2d(Tensor::from_vec(vec![1i32], vec![1]).unwrap()).is_err());
        assert!(fftshift_1d(Tensor::scalar(1i32)).is_err());
    }
}
