use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::dtype::{DType, Scalar};
use crate::error::{poisoned, Result, TensorError};

/// Host-side element buffer shared by every view of a tensor.
///
/// Views are cheap handles onto the same buffer, and destinations are written
/// through `&self`, so the buffer sits behind a lock.
#[derive(Debug)]
pub struct Storage<T> {
    data: RwLock<Vec<T>>,
}

impl<T: Scalar> Storage<T> {
    pub fn from_vec(data: Vec<T>) -> Self {
        Storage {
            data: RwLock::new(data),
        }
    }

    pub fn zeros(n: usize) -> Self {
        Self::from_vec(vec![T::default(); n])
    }

    /// Number of elements in this storage.
    pub fn len(&self) -> usize {
        self.read().map(|d| d.len()).unwrap_or(0)
    }

    /// Returns true if the storage contains no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> DType {
        T::DTYPE
    }

    pub fn get(&self, offset: usize) -> Result<T> {
        let data = self.read()?;
        data.get(offset)
            .copied()
            .ok_or_else(|| out_of_bounds(offset, data.len()))
    }

    pub fn set(&self, offset: usize, value: T) -> Result<()> {
        let mut data = self.write()?;
        let len = data.len();
        let slot = data
            .get_mut(offset)
            .ok_or_else(|| out_of_bounds(offset, len))?;
        *slot = value;
        Ok(())
    }

    pub fn read(&self) -> Result<RwLockReadGuard<'_, Vec<T>>> {
        self.data.read().map_err(poisoned("storage"))
    }

    pub fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<T>>> {
        self.data.write().map_err(poisoned("storage"))
    }

    pub fn to_vec(&self) -> Result<Vec<T>> {
        Ok(self.read()?.clone())
    }
}

fn out_of_bounds(offset: usize, len: usize) -> TensorError {
    TensorError::Execution(format!(
        "storage offset {} out of bounds for {} elements",
        offset, len
    ))
}
