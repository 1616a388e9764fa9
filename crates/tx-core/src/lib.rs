//! `tx-core` - lazy tensor operator trees for tensor-expr.
//!
//! This crate provides:
//! - Shape and index algebra (`Shape`, row-major ravel/unravel)
//! - The `Operator` trait family and derived operators (permute, slice, remap,
//!   reverse, repmat, flatten, fftshift, hermitian, planar/interleaved complex
//!   views, elementwise, assign, generators)
//! - Capability negotiation across operator trees
//! - The prepare/execute/release protocol for whole-array transforms
//! - Host and stream executors, a tracking allocator and a CPU numeric backend

pub mod allocator;
pub mod backend;
pub mod capability;
pub mod config;
pub mod cpu;
pub mod dtype;
pub mod error;
pub mod executor;
pub mod host;
pub mod operator;
pub mod ops;
pub mod run;
pub mod shape;
pub mod sparse;
pub mod storage;
pub mod stream;
pub mod tensor;
pub mod transform;

// Re-export primary types at the crate root for convenience.
pub use allocator::{Allocation, Allocator, AllocatorStats, TrackingAllocator};
pub use backend::NumericBackend;
pub use capability::{CapabilityKind, CapabilityValue, Placement};
pub use config::ExecConfig;
pub use cpu::CpuNumeric;
pub use dtype::{DType, IndexScalar, Scalar};
pub use error::{ErrorKind, Result, TensorError};
pub use executor::{ExecContext, Executor, ExecutorKind, Job, JobClass, MemoryKind};
pub use host::{HostExecParams, HostExecutor, ThreadsMode};
pub use operator::{Node, Operator, OperatorMut};
pub use run::{eval, run};
pub use shape::{Index, Shape};
pub use sparse::{make_coo, make_csc, make_csr, SparseFormat, SparseMatrix};
pub use storage::Storage;
pub use stream::StreamExecutor;
pub use tensor::Tensor;
pub use transform::{run_transform, LifecyclePhase, Materialized, Temporary, Transform};

pub use num_complex::{Complex, Complex32, Complex64};
