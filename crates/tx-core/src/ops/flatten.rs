use crate::capability::{CapabilityKind, CapabilityValue};
use crate::error::Result;
use crate::executor::Executor;
use crate::operator::{Node, Operator, OperatorMut};
use crate::shape::Shape;

/// Rank-1 view of a child in row-major order.
#[derive(Debug, Clone)]
pub struct Flatten<O> {
    child: O,
    child_shape: Shape,
}

pub fn flatten<O: Operator>(op: O) -> Flatten<O> {
    let child_shape = op.shape();
    Flatten {
        child: op,
        child_shape,
    }
}

impl<O: Operator> Node for Flatten<O> {
    fn name(&self) -> String {
        format!("flatten({})", self.child.name())
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

impl<O: Operator> Operator for Flatten<O> {
    type Value = O::Value;

    fn rank(&self) -> usize {
        1
    }

    fn size(&self, _dim: usize) -> usize {
        self.child_shape.numel()
    }

    fn read(&self, idx: &[usize]) -> Result<O::Value> {
        self.child.read(&self.child_shape.unravel(idx[0]))
    }
}

impl<O: OperatorMut> OperatorMut for Flatten<O> {
    fn write(&self, idx: &[usize], value: O::Value) -> Result<()> {
        self.child.write(&self.child_shape.unravel(idx[0]), value)
    }
}
