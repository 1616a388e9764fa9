use std::fmt::Display;

use thiserror::Error;

use crate::dtype::DType;

/// Coarse classification of a [`TensorError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A shape, rank, permutation or index invariant was violated while building a node.
    Construction,
    /// An operator was dispatched to an executor it cannot run on.
    UnsupportedExecutor,
    /// A temporary could not be allocated.
    Allocation,
    /// A lifecycle method or element read was called in the wrong phase.
    Precondition,
    /// Failure while a kernel or collaborator was running.
    Execution,
}

#[derive(Error, Debug, Clone)]
pub enum TensorError {
    #[error("{op}: {reason}")]
    Construction { op: String, reason: String },
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: Vec<usize>, got: Vec<usize> },
    #[error("invalid axis {axis} for tensor with {ndim} dimensions")]
    InvalidAxis { axis: usize, ndim: usize },
    #[error("cannot broadcast shapes {a:?} and {b:?}")]
    BroadcastError { a: Vec<usize>, b: Vec<usize> },
    #[error("{op} does not support the {executor} executor")]
    UnsupportedExecutor { op: String, executor: String },
    #[error("failed to allocate {bytes} bytes of {kind} memory: {reason}")]
    Allocation {
        bytes: usize,
        kind: String,
        reason: String,
    },
    #[error("{op}: {reason}")]
    Precondition { op: String, reason: String },
    #[error("numeric error in '{source_name}': {reason}")]
    Numeric { source_name: String, reason: String },
    #[error("{0}")]
    Execution(String),
}

impl TensorError {
    pub fn construction(op: impl Into<String>, reason: impl Into<String>) -> Self {
        TensorError::Construction {
            op: op.into(),
            reason: reason.into(),
        }
    }

    pub fn precondition(op: impl Into<String>, reason: impl Into<String>) -> Self {
        TensorError::Precondition {
            op: op.into(),
            reason: reason.into(),
        }
    }

    pub fn unsupported_executor(op: impl Into<String>, executor: impl Into<String>) -> Self {
        TensorError::UnsupportedExecutor {
            op: op.into(),
            executor: executor.into(),
        }
    }

    /// A failure reported by a numeric backend or computed inside operator `source_name`.
    pub fn numeric(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        TensorError::Numeric {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    /// A value computed by `op` that `dtype` cannot hold.
    pub fn unrepresentable(op: impl Into<String>, value: impl Display, dtype: DType) -> Self {
        TensorError::numeric(op, format!("{} is not representable as {}", value, dtype))
    }

    /// Returns the error category this variant belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TensorError::Construction { .. }
            | TensorError::ShapeMismatch { .. }
            | TensorError::InvalidAxis { .. }
            | TensorError::BroadcastError { .. } => ErrorKind::Construction,
            TensorError::UnsupportedExecutor { .. } => ErrorKind::UnsupportedExecutor,
            TensorError::Allocation { .. } => ErrorKind::Allocation,
            TensorError::Precondition { .. } => ErrorKind::Precondition,
            TensorError::Numeric { .. } | TensorError::Execution(_) => ErrorKind::Execution,
        }
    }
}

/// Maps a poisoned lock into an execution error naming what was being locked.
pub(crate) fn poisoned<E>(what: &str) -> impl FnOnce(E) -> TensorError + '_ {
    move |_| TensorError::Execution(format!("{} lock poisoned", what))
}

pub type Result<T> = std::result::Result<T, TensorError>;
