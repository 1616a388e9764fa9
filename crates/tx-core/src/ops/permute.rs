use crate::capability::{CapabilityKind, CapabilityValue};
use crate::error::{Result, TensorError};
use crate::executor::Executor;
use crate::operator::{Node, Operator, OperatorMut};
use crate::shape::Index;

/// Reorders the dimensions of a child: output dim `i` is child dim `perm[i]`.
#[derive(Debug, Clone)]
pub struct Permute<O> {
    child: O,
    perm: Vec<usize>,
}

/// Builds a permuted view of `op`. `perm` must be a bijection on `0..rank`.
pub fn permute<O: Operator>(op: O, perm: &[usize]) -> Result<Permute<O>> {
    let rank = op.rank();
    if perm.len() != rank {
        return Err(TensorError::construction(
            "permute",
            format!("{} dims given for a rank {} operator", perm.len(), rank),
        ));
    }
    let mut seen = vec![false; rank];
    for &d in perm {
        if d >= rank || seen[d] {
            return Err(TensorError::construction(
                "permute",
                format!("{:?} is not a permutation of 0..{}", perm, rank),
            ));
        }
        seen[d] = true;
    }
    Ok(Permute {
        child: op,
        perm: perm.to_vec(),
    })
}

/// The permutation that undoes `perm`.
pub fn inverse_permutation(perm: &[usize]) -> Vec<usize> {
    let mut inv = vec![0; perm.len()];
    for (i, &p) in perm.iter().enumerate() {
        inv[p] = i;
    }
    inv
}

/// Permutation that moves `reduced` dims last, keeping the rest first in their
/// input order. Reduced dims keep the order they are given in.
pub fn reduction_permutation(rank: usize, reduced: &[usize]) -> Result<Vec<usize>> {
    if reduced.len() > rank {
        return Err(TensorError::construction(
            "reduce",
            format!("cannot reduce {} dims of a rank {} operator", reduced.len(), rank),
        ));
    }
    let mut is_reduced = vec![false; rank];
    for &d in reduced {
        if d >= rank {
            return Err(TensorError::InvalidAxis { axis: d, ndim: rank });
        }
        if is_reduced[d] {
            return Err(TensorError::construction(
                "reduce",
                format!("dimension {} listed twice", d),
            ));
        }
        is_reduced[d] = true;
    }
    let mut perm: Vec<usize> = (0..rank).filter(|&d| !is_reduced[d]).collect();
    perm.extend_from_slice(reduced);
    Ok(perm)
}

impl<O> Permute<O> {
    pub fn permutation(&self) -> &[usize] {
        &self.perm
    }

    pub fn child(&self) -> &O {
        &self.child
    }

    fn child_index(&self, idx: &[usize]) -> Index {
        let mut out: Index = Index::from_elem(0, self.perm.len());
        for (i, &p) in self.perm.iter().enumerate() {
            out[p] = idx[i];
        }
        out
    }
}

impl<O: Operator> Node for Permute<O> {
    fn name(&self) -> String {
        format!("permute({})", self.child.name())
    }

    fn capability(&self, kind: CapabilityKind) -> CapabilityValue {
        match kind {
            // The innermost dimension moves unless the permutation keeps it last.
            CapabilityKind::VectorWidth
                if matches!(self.perm.last(), Some(&l) if l + 1 != self.perm.len()) =>
            {
                CapabilityValue::Width(1)
            }
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

impl<O: Operator> Operator for Permute<O> {
    type Value = O::Value;

    fn rank(&self) -> usize {
        self.perm.len()
    }

    fn size(&self, dim: usize) -> usize {
        self.child.size(self.perm[dim])
    }

    fn read(&self, idx: &[usize]) -> Result<O::Value> {
        self.child.read(&self.child_index(idx))
    }
}

impl<O: OperatorMut> OperatorMut for Permute<O> {
    fn write(&self, idx: &[usize], value: O::Value) -> Result<()> {
        self.child.write(&self.child_index(idx), value)
    }
}
