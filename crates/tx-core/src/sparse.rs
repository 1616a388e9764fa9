//! Read-only rank-2 sparse operands in COO, CSR and CSC layouts.
//!
//! The factories take ownership of already-built coordinate buffers and only
//! validate them; no format conversion happens here.

use std::fmt;
use std::sync::Arc;

use crate::capability::{CapabilityKind, CapabilityValue};
use crate::dtype::Scalar;
use crate::error::{Result, TensorError};
use crate::operator::{Node, Operator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SparseFormat {
    Coo,
    Csr,
    Csc,
}

impl fmt::Display for SparseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SparseFormat::Coo => write!(f, "coo"),
            SparseFormat::Csr => write!(f, "csr"),
            SparseFormat::Csc => write!(f, "csc"),
        }
    }
}

#[derive(Debug)]
enum Layout {
    /// (row, col) pairs in strictly increasing lexicographic order.
    Coo(Vec<(usize, usize)>),
    /// Compressed major positions plus the minor coordinate of each value.
    Compressed { ptr: Vec<usize>, minor: Vec<usize> },
}

#[derive(Debug, Clone)]
pub struct SparseMatrix<T> {
    format: SparseFormat,
    rows: usize,
    cols: usize,
    values: Arc<Vec<T>>,
    layout: Arc<Layout>,
}

fn invalid(format: SparseFormat, reason: String) -> TensorError {
    TensorError::construction(format!("make_{}", format), reason)
}

/// Builds a COO matrix. Coordinates must be in range, sorted by (row, col)
/// and free of duplicates.
pub fn make_coo<T: Scalar>(
    values: Vec<T>,
    row_idx: Vec<usize>,
    col_idx: Vec<usize>,
    shape: [usize; 2],
) -> Result<SparseMatrix<T>> {
    let [rows, cols] = shape;
    let format = SparseFormat::Coo;
    if row_idx.len() != values.len() || col_idx.len() != values.len() {
        return Err(invalid(
            format,
            format!(
                "{} values but {} row and {} column coordinates",
                values.len(),
                row_idx.len(),
                col_idx.len()
            ),
        ));
    }
    let coords: Vec<(usize, usize)> = row_idx.into_iter().zip(col_idx).collect();
    if let Some(&(r, c)) = coords.iter().find(|&&(r, c)| r >= rows || c >= cols) {
        return Err(invalid(
            format,
            format!("coordinate ({}, {}) outside {}x{}", r, c, rows, cols),
        ));
    }
    if let Some(w) = coords.windows(2).find(|w| w[0] >= w[1]) {
        return Err(invalid(
            format,
            format!("coordinates not strictly increasing at {:?} -> {:?}", w[0], w[1]),
        ));
    }
    Ok(SparseMatrix {
        format,
        rows,
        cols,
        values: Arc::new(values),
        layout: Arc::new(Layout::Coo(coords)),
    })
}

/// Builds a CSR matrix from row offsets (`rows + 1` entries) and column indices.
pub fn make_csr<T: Scalar>(
    values: Vec<T>,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    shape: [usize; 2],
) -> Result<SparseMatrix<T>> {
    compressed(SparseFormat::Csr, values, row_ptr, col_idx, shape)
}

/// Builds a CSC matrix from column offsets (`cols + 1` entries) and row indices.
pub fn make_csc<T: Scalar>(
    values: Vec<T>,
    col_ptr: Vec<usize>,
    row_idx: Vec<usize>,
    shape: [usize; 2],
) -> Result<SparseMatrix<T>> {
    compressed(SparseFormat::Csc, values, col_ptr, row_idx, shape)
}

fn compressed<T: Scalar>(
    format: SparseFormat,
    values: Vec<T>,
    ptr: Vec<usize>,
    minor: Vec<usize>,
    shape: [usize; 2],
) -> Result<SparseMatrix<T>> {
    let [rows, cols] = shape;
    let (major_len, minor_len) = match format {
        SparseFormat::Csc => (cols, rows),
        _ => (rows, cols),
    };
    if minor.len() != values.len() {
        return Err(invalid(
            format,
            format!("{} values but {} indices", values.len(), minor.len()),
        ));
    }
    if ptr.len() != major_len + 1 || ptr.first() != Some(&0) || ptr.last() != Some(&values.len())
    {
        return Err(invalid(
            format,
            format!(
                "{} positions must start at 0 and end at {} with {} entries",
                format,
                values.len(),
                major_len + 1
            ),
        ));
    }
    if let Some(m) = ptr.windows(2).position(|w| w[0] > w[1]) {
        return Err(invalid(format, format!("positions decrease at {}", m)));
    }
    for (m, w) in ptr.windows(2).enumerate() {
        let segment = &minor[w[0]..w[1]];
        if segment.iter().any(|&i| i >= minor_len) {
            return Err(invalid(format, format!("index out of range in segment {}", m)));
        }
        if segment.windows(2).any(|p| p[0] >= p[1]) {
            return Err(invalid(
                format,
                format!("indices of segment {} are not strictly increasing", m),
            ));
        }
    }
    Ok(SparseMatrix {
        format,
        rows,
        cols,
        values: Arc::new(values),
        layout: Arc::new(Layout::Compressed { ptr, minor }),
    })
}

impl<T: Scalar> SparseMatrix<T> {
    pub fn format(&self) -> SparseFormat {
        self.format
    }

    /// Number of stored values.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    fn position(&self, row: usize, col: usize) -> Option<usize> {
        match self.layout.as_ref() {
            Layout::Coo(coords) => coords.binary_search(&(row, col)).ok(),
            Layout::Compressed { ptr, minor } => {
                let (major, target) = match self.format {
                    SparseFormat::Csc => (col, row),
                    _ => (row, col),
                };
                let (start, end) = (ptr[major], ptr[major + 1]);
                minor[start..end]
                    .binary_search(&target)
                    .ok()
                    .map(|k| start + k)
            }
        }
    }
}

impl<T: Scalar> Node for SparseMatrix<T> {
    fn name(&self) -> String {
        format!("sparse_{}[{}, {}]", self.format, self.rows, self.cols)
    }

    fn capability(&self, kind: CapabilityKind) -> CapabilityValue {
        match kind {
            CapabilityKind::VectorWidth => CapabilityValue::Width(1),
            _ => kind.default_value(),
        }
    }
}

impl<T: Scalar> Operator for SparseMatrix<T> {
    type Value = T;

    fn rank(&self) -> usize {
        2
    }

    fn size(&self, dim: usize) -> usize {
        if dim == 0 {
            self.rows
        } else {
            self.cols
        }
    }

    fn read(&self, idx: &[usize]) -> Result<T> {
        if idx.len() != 2 || idx[0] >= self.rows || idx[1] >= self.cols {
            return Err(TensorError::precondition(
                self.name(),
                format!("index {:?} out of bounds", idx),
            ));
        }
        Ok(self
            .position(idx[0], idx[1])
            .map(|k| self.values[k])
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    // [[1 0 2]
    //  [0 0 3]]
    fn dense<O: Operator>(op: &O) -> Vec<O::Value> {
        let mut out = Vec::new();
        for i in 0..op.size(0) {
            for j in 0..op.size(1) {
                out.push(op.read(&[i, j]).unwrap());
            }
        }
        out
    }

    #[test]
    fn test_coo() {
        let m = make_coo(vec![1.0f32, 2.0, 3.0], vec![0, 0, 1], vec![0, 2, 2], [2, 3]).unwrap();
        assert_eq!(m.nnz(), 3);
        assert_eq!(dense(&m), vec![1.0, 0.0, 2.0, 0.0, 0.0, 3.0]);
        assert_eq!(
            m.capability(CapabilityKind::VectorWidth),
            CapabilityValue::Width(1)
        );
    }

    #[test]
    fn test_csr_and_csc_agree() {
        let csr = make_csr(vec![1i32, 2, 3], vec![0, 2, 3], vec![0, 2, 2], [2, 3]).unwrap();
        let csc = make_csc(vec![1i32, 2, 3], vec![0, 1, 1, 3], vec![0, 0, 1], [2, 3]).unwrap();
        assert_eq!(dense(&csr), vec![1, 0, 2, 0, 0, 3]);
        assert_eq!(dense(&csr), dense(&csc));
    }

    #[test]
    fn test_validation() {
        let err = make_coo(vec![1.0f64], vec![2], vec![0], [2, 2]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Construction);
        assert!(make_coo(vec![1.0f64, 2.0], vec![1, 0], vec![0, 0], [2, 2]).is_err());
        assert!(make_coo(vec![1.0f64, 2.0], vec![0, 0], vec![1, 1], [2, 2]).is_err());
        assert!(make_csr(vec![1i32], vec![0, 1], vec![0], [2, 2]).is_err());
        assert!(make_csr(vec![1i32, 2], vec![0, 2, 1], vec![0, 1], [2, 2]).is_err());
        assert!(make_csc(vec![1i32], vec![0, 1, 1], vec![5], [2, 2]).is_err());
    }
}
