use crate::capability::{CapabilityKind, CapabilityValue};
use crate::error::{Result, TensorError};
use crate::executor::Executor;
use crate::operator::{Node, Operator};
use crate::shape::Index;

/// Tiles the child `reps[d]` times along each dimension.
#[derive(Debug, Clone)]
pub struct RepMat<O> {
    child: O,
    reps: Vec<usize>,
}

pub fn repmat<O: Operator>(op: O, reps: &[usize]) -> Result<RepMat<O>> {
    if reps.len() != op.rank() {
        return Err(TensorError::construction(
            "repmat",
            format!("{} repetitions for a rank {} operator", reps.len(), op.rank()),
        ));
    }
    if reps.contains(&0) {
        return Err(TensorError::construction(
            "repmat",
            format!("repetitions must be at least 1, got {:?}", reps),
        ));
    }
    Ok(RepMat {
        child: op,
        reps: reps.to_vec(),
    })
}

/// Tiles every dimension `reps` times.
pub fn repmat_uniform<O: Operator>(op: O, reps: usize) -> Result<RepMat<O>> {
    let all = vec![reps; op.rank()];
    repmat(op, &all)
}

impl<O: Operator> Node for RepMat<O> {
    fn name(&self) -> String {
        format!("repmat({})", self.child.name())
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

impl<O: Operator> Operator for RepMat<O> {
    type Value = O::Value;

    fn rank(&self) -> usize {
        self.child.rank()
    }

    fn size(&self, dim: usize) -> usize {
        self.child.size(dim) * self.reps[dim]
    }

    fn read(&self, idx: &[usize]) -> Result<O::Value> {
        let child_idx: Index = idx
            .iter()
            .enumerate()
            .map(|(d, &i)| i % self.child.size(d))
            .collect();
        self.child.read(&child_idx)
    }
}
