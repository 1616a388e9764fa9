use crate::capability::{CapabilityKind, CapabilityValue};
use crate::error::{Result, TensorError};
use crate::executor::Executor;
use crate::operator::{self, Node, Operator, OperatorMut};

/// Writes `src` into `dst` as it is read, yielding the written value.
///
/// Reading element `idx` stores `src[idx]` into `dst[idx]`. Chained with
/// [`sequenced`](super::sequenced) this expresses `(dst = src, ...)`.
/// The source may alias the destination, so the write order is observable and
/// the node reports itself as not parallel safe.
#[derive(Debug, Clone)]
pub struct Assign<D, S> {
    dst: D,
    src: S,
}

pub fn assign<D, S>(dst: D, src: S) -> Result<Assign<D, S>>
where
    D: OperatorMut,
    S: Operator<Value = D::Value>,
{
    let (want, got) = (dst.shape(), src.shape());
    if want != got {
        return Err(TensorError::ShapeMismatch {
            expected: want.dims().to_vec(),
            got: got.dims().to_vec(),
        });
    }
    Ok(Assign { dst, src })
}

impl<D, S> Assign<D, S> {
    pub fn destination(&self) -> &D {
        &self.dst
    }
}

impl<D, S> Node for Assign<D, S>
where
    D: OperatorMut,
    S: Operator<Value = D::Value>,
{
    fn name(&self) -> String {
        format!("{} = {}", self.dst.name(), self.src.name())
    }

    fn capability(&self, kind: CapabilityKind) -> CapabilityValue {
        match kind {
            CapabilityKind::Parallel => CapabilityValue::Flag(false),
            _ => operator::fold_children(kind, &[&self.dst, &self.src]),
        }
    }

    fn needs_prepare(&self) -> bool {
        self.dst.needs_prepare() || self.src.needs_prepare()
    }

    fn prepare(&self, ex: &dyn Executor) -> Result<()> {
        operator::prepare_children(&[&self.dst, &self.src], ex)
    }

    fn release(&self, ex: &dyn Executor) -> Result<()> {
        operator::release_children(&[&self.dst, &self.src], ex)
    }
}

impl<D, S> Operator for Assign<D, S>
where
    D: OperatorMut,
    S: Operator<Value = D::Value>,
{
    type Value = D::Value;

    fn rank(&self) -> usize {
        self.dst.rank()
    }

    fn size(&self, dim: usize) -> usize {
        self.dst.size(dim)
    }

    fn read(&self, idx: &[usize]) -> Result<D::Value> {
        let value = self.src.read(idx)?;
        self.dst.write(idx, value)?;
        Ok(value)
    }
}
