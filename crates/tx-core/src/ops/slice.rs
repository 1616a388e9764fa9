use crate::capability::{CapabilityKind, CapabilityValue};
use crate::error::{Result, TensorError};
use crate::executor::Executor;
use crate::operator::{Node, Operator, OperatorMut};
use crate::shape::Index;

/// Where a sliced dimension stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceEnd {
    /// Exclusive end; negative values count back from the dimension size.
    To(i64),
    /// Runs to the end of the dimension.
    End,
    /// Removes the dimension; its start selects the fixed coordinate.
    Drop,
}

impl From<i64> for SliceEnd {
    fn from(end: i64) -> Self {
        SliceEnd::To(end)
    }
}

/// A rectangular, optionally strided window onto a child.
#[derive(Debug, Clone)]
pub struct Slice<O> {
    child: O,
    /// Per child dimension.
    starts: Vec<usize>,
    strides: Vec<usize>,
    /// Output dimension `i` walks child dimension `dims[i]`.
    dims: Vec<usize>,
    sizes: Vec<usize>,
}

/// Unit-stride slice. `starts` and `ends` have one entry per child dimension.
pub fn slice<O: Operator>(op: O, starts: &[i64], ends: &[SliceEnd]) -> Result<Slice<O>> {
    let strides = vec![1; starts.len()];
    slice_strided(op, starts, ends, &strides)
}

pub fn slice_strided<O: Operator>(
    op: O,
    starts: &[i64],
    ends: &[SliceEnd],
    strides: &[i64],
) -> Result<Slice<O>> {
    let rank = op.rank();
    if starts.len() != rank || ends.len() != rank || strides.len() != rank {
        return Err(TensorError::construction(
            "slice",
            format!(
                "expected {} starts, ends and strides, got {}, {} and {}",
                rank,
                starts.len(),
                ends.len(),
                strides.len()
            ),
        ));
    }

    let mut norm_starts = Vec::with_capacity(rank);
    let mut norm_strides = Vec::with_capacity(rank);
    let mut dims = Vec::with_capacity(rank);
    let mut sizes = Vec::with_capacity(rank);

    for d in 0..rank {
        let size = op.size(d) as i64;
        let start = if starts[d] < 0 { starts[d] + size } else { starts[d] };
        let end = match ends[d] {
            SliceEnd::To(e) if e < 0 => Some(e + size),
            SliceEnd::To(e) => Some(e),
            SliceEnd::End => Some(size),
            SliceEnd::Drop => None,
        };

        let in_range = match end {
            Some(end) => 0 <= start && start <= end && end <= size,
            None => 0 <= start && start < size,
        };
        if !in_range {
            return Err(TensorError::construction(
                "slice",
                format!(
                    "dimension {}: bounds {}..{:?} fall outside 0..{}",
                    d, starts[d], ends[d], size
                ),
            ));
        }
        if end.is_some() && strides[d] < 1 {
            return Err(TensorError::construction(
                "slice",
                format!("dimension {}: stride {} must be positive", d, strides[d]),
            ));
        }

        norm_starts.push(start as usize);
        norm_strides.push(strides[d].max(1) as usize);
        if let Some(end) = end {
            dims.push(d);
            sizes.push(((end - start) as u64).div_ceil(strides[d] as u64) as usize);
        }
    }

    Ok(Slice {
        child: op,
        starts: norm_starts,
        strides: norm_strides,
        dims,
        sizes,
    })
}

impl<O> Slice<O> {
    fn child_index(&self, idx: &[usize]) -> Index {
        let mut out: Index = self.starts.iter().copied().collect();
        for (o, &c) in self.dims.iter().enumerate() {
            out[c] = self.starts[c] + idx[o] * self.strides[c];
        }
        out
    }
}

impl<O: Operator> Node for Slice<O> {
    fn name(&self) -> String {
        format!("slice({})", self.child.name())
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

impl<O: Operator> Operator for Slice<O> {
    type Value = O::Value;

    fn rank(&self) -> usize {
        self.dims.len()
    }

    fn size(&self, dim: usize) -> usize {
        self.sizes[dim]
    }

    fn read(&self, idx: &[usize]) -> Result<O::Value> {
        self.child.read(&self.child_index(idx))
    }
}

impl<O: OperatorMut> OperatorMut for Slice<O> {
    fn write(&self, idx: &[usize], value: O::Value) -> Result<()> {
        self.child.write(&self.child_index(idx), value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::tensor::Tensor;

    fn grid() -> Tensor<i32> {
        Tensor::from_vec((0..16).collect(), vec![4, 4]).unwrap()
    }

    #[test]
    fn test_inner_window() {
        let s = slice(grid(), &[1, 1], &[SliceEnd::To(3), SliceEnd::To(3)]).unwrap();
        assert_eq!(s.shape().dims(), &[2, 2]);
        assert_eq!(s.read(&[0, 0]).unwrap(), 5);
        assert_eq!(s.read(&[1, 1]).unwrap(), 10);
        assert_eq!(
            s.capability(CapabilityKind::VectorWidth),
            CapabilityValue::Width(1)
        );
    }

    #[test]
    fn test_identity_slice() {
        let t = grid();
        let s = slice(t.clone(), &[0, 0], &[SliceEnd::End, SliceEnd::To(4)]).unwrap();
        assert_eq!(s.shape(), t.shape());
        for i in 0..4 {
            for j in 0..4 {
                assert_eq!(s.read(&[i, j]).unwrap(), t.read(&[i, j]).unwrap());
            }
        }
    }

    #[test]
    fn test_negative_bounds_and_stride() {
        let s = slice_strided(grid(), &[-4, 0], &[SliceEnd::To(-1), SliceEnd::End], &[2, 3])
            .unwrap();
        // rows 0 and 2, columns 0 and 3
        assert_eq!(s.shape().dims(), &[2, 2]);
        assert_eq!(s.read(&[1, 1]).unwrap(), 11);
    }

    #[test]
    fn test_stride_larger_than_extent() {
        let s = slice_strided(
            grid(),
            &[0, 0],
            &[SliceEnd::End, SliceEnd::End],
            &[i64::MAX, 1],
        )
        .unwrap();
        assert_eq!(s.shape().dims(), &[1, 4]);
        assert_eq!(s.read(&[0, 3]).unwrap(), 3);

        let s = slice_strided(grid(), &[3, 1], &[SliceEnd::End, SliceEnd::End], &[5, i64::MAX])
            .unwrap();
        assert_eq!(s.shape().dims(), &[1, 1]);
        assert_eq!(s.read(&[0, 0]).unwrap(), 13);
    }

    #[test]
    fn test_drop_dimension() {
        let s = slice(grid(), &[2, 0], &[SliceEnd::Drop, SliceEnd::End]).unwrap();
        assert_eq!(s.rank(), 1);
        assert_eq!(s.read(&[3]).unwrap(), 11);
    }

    #[test]
    fn test_out_of_range_fails_at_construction() {
        let err = slice(grid(), &[0, 0], &[SliceEnd::To(5), SliceEnd::End]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Construction);
        assert!(slice(grid(), &[3, 0], &[SliceEnd::To(2), SliceEnd::End]).is_err());
        assert!(slice(grid(), &[4, 0], &[SliceEnd::Drop, SliceEnd::End]).is_err());
        assert!(slice_strided(grid(), &[0, 0], &[SliceEnd::End, SliceEnd::End], &[0, 1]).is_err());
    }

    #[test]
    fn test_write_through() {
        let t = grid();
        let s = slice(t.clone(), &[1, 2], &[SliceEnd::To(2), SliceEnd::To(4)]).unwrap();
        s.store(&[-1, -2]).unwrap();
        assert_eq!(t.read(&[1, 2]).unwrap(), -1);
        assert_eq!(t.read(&[1, 3]).unwrap(), -2);
    }
}
