use crate::capability::{CapabilityKind, CapabilityValue};
use crate::dtype::Scalar;
use crate::error::{Result, TensorError};
use crate::executor::Executor;
use crate::operator::{Node, Operator};
use crate::shape::Index;

/// Conjugate transpose of the last two dims. Leading dims are batch dims.
///
/// Real element types are transposed unchanged.
#[derive(Debug, Clone)]
pub struct Hermitian<O> {
    child: O,
}

pub fn hermitian<O: Operator>(op: O) -> Result<Hermitian<O>> {
    if op.rank() < 2 {
        return Err(TensorError::construction(
            "hermitian",
            format!("input must have rank >= 2, got {}", op.rank()),
        ));
    }
    Ok(Hermitian { child: op })
}

impl<O: Operator> Hermitian<O> {
    /// Swaps the trailing pair of coordinates.
    fn swapped(&self, idx: &[usize]) -> Index {
        let mut out = Index::from_slice(idx);
        let n = out.len();
        out.swap(n - 2, n - 1);
        out
    }
}

impl<O: Operator> Node for Hermitian<O> {
    fn name(&self) -> String {
        format!("hermitian({})", self.child.name())
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

impl<O: Operator> Operator for Hermitian<O> {
    type Value = O::Value;

    fn rank(&self) -> usize {
        self.child.rank()
    }

    fn size(&self, dim: usize) -> usize {
        let rank = self.child.rank();
        match dim {
            d if d + 2 < rank => self.child.size(d),
            d if d + 1 == rank => self.child.size(rank - 2),
            _ => self.child.size(rank - 1),
        }
    }

    fn read(&self, idx: &[usize]) -> Result<O::Value> {
        Ok(self.child.read(&self.swapped(idx))?.conj())
    }
}
