use crate::capability::{CapabilityKind, CapabilityValue};
use crate::dtype::IndexScalar;
use crate::error::{Result, TensorError};
use crate::executor::Executor;
use crate::operator::{self, Node, Operator, OperatorMut};
use crate::shape::Index;

/// Substitutes one coordinate of the child with values read from an index operator.
///
/// Output dimension `dim` has the index operator's length (1 for a rank-0
/// index); output coordinate `i` along it reads child coordinate `index[i]`.
#[derive(Debug, Clone)]
pub struct Remap<O, I> {
    child: O,
    index: I,
    dim: usize,
}

pub fn remap<O, I>(op: O, dim: usize, index: I) -> Result<Remap<O, I>>
where
    O: Operator,
    I: Operator,
    I::Value: IndexScalar,
{
    op.shape().check_dim(dim)?;
    if index.rank() > 1 {
        return Err(TensorError::construction(
            "remap",
            format!("index operator must have rank 0 or 1, got {}", index.rank()),
        ));
    }
    Ok(Remap {
        child: op,
        index,
        dim,
    })
}

/// Remaps several dimensions at once, one index operator per dimension.
pub fn remap_dims<O, I>(
    op: O,
    dims: &[usize],
    indices: Vec<I>,
) -> Result<Box<dyn Operator<Value = O::Value>>>
where
    O: Operator + 'static,
    I: Operator + 'static,
    I::Value: IndexScalar,
{
    if dims.len() != indices.len() {
        return Err(TensorError::construction(
            "remap",
            format!("{} dims but {} index operators", dims.len(), indices.len()),
        ));
    }
    for (i, d) in dims.iter().enumerate() {
        if dims[..i].contains(d) {
            return Err(TensorError::construction(
                "remap",
                format!("dimension {} remapped twice", d),
            ));
        }
    }
    let mut current: Box<dyn Operator<Value = O::Value>> = Box::new(op);
    for (&d, index) in dims.iter().zip(indices) {
        current = Box::new(remap(current, d, index)?);
    }
    Ok(current)
}

impl<O, I> Remap<O, I>
where
    O: Operator,
    I: Operator,
    I::Value: IndexScalar,
{
    fn child_index(&self, idx: &[usize]) -> Result<Index> {
        let position: &[usize] = if self.index.rank() == 0 {
            &[]
        } else {
            &idx[self.dim..=self.dim]
        };
        let raw = self.index.read(position)?;
        let limit = self.child.size(self.dim);
        let coord = raw
            .to_index()
            .filter(|&c| c < limit)
            .ok_or_else(|| {
                TensorError::precondition(
                    "remap",
                    format!("index value {:?} out of range for size {}", raw, limit),
                )
            })?;
        let mut out: Index = idx.iter().copied().collect();
        out[self.dim] = coord;
        Ok(out)
    }
}

impl<O, I> Node for Remap<O, I>
where
    O: Operator,
    I: Operator,
    I::Value: IndexScalar,
{
    fn name(&self) -> String {
        format!("remap({}, {})", self.child.name(), self.index.name())
    }

    fn capability(&self, kind: CapabilityKind) -> CapabilityValue {
        match kind {
            CapabilityKind::VectorWidth => CapabilityValue::Width(1),
            _ => operator::fold_children(kind, &[&self.child, &self.index]),
        }
    }

    fn needs_prepare(&self) -> bool {
        self.child.needs_prepare() || self.index.needs_prepare()
    }

    fn prepare(&self, ex: &dyn Executor) -> Result<()> {
        operator::prepare_children(&[&self.child, &self.index], ex)
    }

    fn release(&self, ex: &dyn Executor) -> Result<()> {
        operator::release_children(&[&self.child, &self.index], ex)
    }
}

impl<O, I> Operator for Remap<O, I>
where
    O: Operator,
    I: Operator,
    I::Value: IndexScalar,
{
    type Value = O::Value;

    fn rank(&self) -> usize {
        self.child.rank()
    }

    fn size(&self, dim: usize) -> usize {
        if dim != self.dim {
            return self.child.size(dim);
        }
        if self.index.rank() == 0 {
            1
        } else {
            self.index.size(0)
        }
    }

    fn read(&self, idx: &[usize]) -> Result<O::Value> {
        self.child.read(&self.child_index(idx)?)
    }
}

impl<O, I> OperatorMut for Remap<O, I>
where
    O: OperatorMut,
    I: Operator,
    I::Value: IndexScalar,
{
    fn write(&self, idx: &[usize], value: O::Value) -> Result<()> {
        self.child.write(&self.child_index(idx)?, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::tensor::Tensor;

    #[test]
    fn test_gather_along_dim() {
        let x = Tensor::from_vec(vec![0.0f32, 1.0, 2.0, 3.0, 4.0, 5.0], vec![6]).unwrap();
        let idx = Tensor::from_vec(vec![4i32, 2, 0], vec![3]).unwrap();
        let r = remap(x, 0, idx).unwrap();
        assert_eq!(r.shape().dims(), &[3]);
        assert_eq!(r.read(&[0]).unwrap(), 4.0);
        assert_eq!(r.read(&[1]).unwrap(), 2.0);
        assert_eq!(r.read(&[2]).unwrap(), 0.0);
    }

    #[test]
    fn test_rank_zero_index() {
        let x = Tensor::from_vec((0..6).collect::<Vec<i64>>(), vec![2, 3]).unwrap();
        let r = remap(x, 1, Tensor::scalar(2u32)).unwrap();
        assert_eq!(r.shape().dims(), &[2, 1]);
        assert_eq!(r.read(&[1, 0]).unwrap(), 5);
    }

    #[test]
    fn test_index_rank_rejected() {
        let x = Tensor::from_vec(vec![1i32, 2, 3, 4], vec![4]).unwrap();
        let idx = Tensor::from_vec(vec![0i32, 1, 2, 3], vec![2, 2]).unwrap();
        let err = remap(x.clone(), 0, idx).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Construction);
        assert!(remap(x, 1, Tensor::scalar(0i32)).is_err());
    }

    #[test]
    fn test_out_of_range_index_value() {
        let x = Tensor::from_vec(vec![1i32, 2], vec![2]).unwrap();
        let r = remap(x, 0, Tensor::from_vec(vec![-1i64, 5], vec![2]).unwrap()).unwrap();
        assert_eq!(r.read(&[0]).unwrap_err().kind(), ErrorKind::Precondition);
        assert!(r.read(&[1]).is_err());
    }

    #[test]
    fn test_remap_dims() {
        let x = Tensor::from_vec((0..9).collect::<Vec<i32>>(), vec![3, 3]).unwrap();
        let rows = Tensor::from_vec(vec![2u8, 0], vec![2]).unwrap();
        let cols = Tensor::from_vec(vec![1u8], vec![1]).unwrap();
        let r = remap_dims(x.clone(), &[0, 1], vec![rows, cols]).unwrap();
        assert_eq!(r.shape().dims(), &[2, 1]);
        assert_eq!(r.read(&[0, 0]).unwrap(), 7);
        assert_eq!(r.read(&[1, 0]).unwrap(), 1);

        let dup = Tensor::from_vec(vec![0u8], vec![1]).unwrap();
        assert!(remap_dims(x, &[0, 0], vec![dup.clone(), dup]).is_err());
    }

    #[test]
    fn test_scatter_through_remap() {
        let x: Tensor<f64> = Tensor::zeros(vec![4]);
        let r = remap(x.clone(), 0, Tensor::from_vec(vec![3i32, 1], vec![2]).unwrap()).unwrap();
        r.store(&[7.0, 8.0]).unwrap();
        assert_eq!(x.to_vec().unwrap(), vec![0.0, 8.0, 0.0, 7.0]);
    }
}
