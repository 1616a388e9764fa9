use crate::capability::{CapabilityKind, CapabilityValue};
use crate::error::{Result, TensorError};
use crate::executor::Executor;
use crate::operator::{Node, Operator, OperatorMut};
use crate::shape::Index;

/// Reads one dimension of the child back to front.
#[derive(Debug, Clone)]
pub struct Reverse<O> {
    child: O,
    dim: usize,
}

pub fn reverse<O: Operator>(op: O, dim: usize) -> Result<Reverse<O>> {
    op.shape().check_dim(dim)?;
    Ok(Reverse { child: op, dim })
}

/// Reverses every dimension in `dims`.
pub fn reverse_dims<O>(op: O, dims: &[usize]) -> Result<Box<dyn Operator<Value = O::Value>>>
where
    O: Operator + 'static,
{
    for (i, d) in dims.iter().enumerate() {
        if dims[..i].contains(d) {
            return Err(TensorError::construction(
                "reverse",
                format!("dimension {} reversed twice", d),
            ));
        }
    }
    let mut current: Box<dyn Operator<Value = O::Value>> = Box::new(op);
    for &d in dims {
        current = Box::new(reverse(current, d)?);
    }
    Ok(current)
}

impl<O: Operator> Reverse<O> {
    fn child_index(&self, idx: &[usize]) -> Index {
        let mut out: Index = idx.iter().copied().collect();
        out[self.dim] = self.child.size(self.dim) - idx[self.dim] - 1;
        out
    }
}

impl<O: Operator> Node for Reverse<O> {
    fn name(&self) -> String {
        format!("reverse({})", self.child.name())
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

impl<O: Operator> Operator for Reverse<O> {
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

impl<O: OperatorMut> OperatorMut for Reverse<O> {
    fn write(&self, idx: &[usize], value: O::Value) -> Result<()> {
        self.child.write(&self.child_index(idx), value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::Tensor;

    #[test]
    fn test_reverse_vector() {
        let r = reverse(Tensor::from_vec(vec![10i32, 20, 30], vec![3]).unwrap(), 0).unwrap();
        assert_eq!(r.read(&[0]).unwrap(), 30);
        assert_eq!(r.read(&[1]).unwrap(), 20);
        assert_eq!(r.read(&[2]).unwrap(), 10);
    }

    #[test]
    fn test_reverse_twice_is_identity() {
        let t = Tensor::from_vec((0..12).collect::<Vec<i32>>(), vec![3, 4]).unwrap();
        for dim in 0..2 {
            let rr = reverse(reverse(t.clone(), dim).unwrap(), dim).unwrap();
            for i in 0..3 {
                for j in 0..4 {
                    assert_eq!(rr.read(&[i, j]).unwrap(), t.read(&[i, j]).unwrap());
                }
            }
        }
    }

    #[test]
    fn test_reverse_dims() {
        let t = Tensor::from_vec((0..6).collect::<Vec<i32>>(), vec![2, 3]).unwrap();
        let r = reverse_dims(t.clone(), &[0, 1]).unwrap();
        assert_eq!(r.read(&[0, 0]).unwrap(), 5);
        assert!(reverse_dims(t.clone(), &[1, 1]).is_err());
        assert!(reverse(t, 2).is_err());
    }
}
