use std::fmt;
use std::sync::Arc;

use crate::allocator::{Allocation, Allocator};
use crate::backend::NumericBackend;
use crate::error::Result;

/// The two execution environments an operator tree can be dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutorKind {
    /// Runs on the calling thread, optionally fanning element evaluation out
    /// across worker threads.
    Host,
    /// Accelerator-style: work is enqueued on an ordered queue and runs
    /// asynchronously until `sync`.
    Stream,
}

impl fmt::Display for ExecutorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutorKind::Host => write!(f, "host"),
            ExecutorKind::Stream => write!(f, "stream"),
        }
    }
}

/// Memory space a temporary is allocated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryKind {
    Host,
    Pinned,
    Device,
}

impl fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryKind::Host => write!(f, "host"),
            MemoryKind::Pinned => write!(f, "pinned"),
            MemoryKind::Device => write!(f, "device"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobClass {
    /// Skipped once the executor has recorded an error.
    Compute,
    /// Always runs, so temporaries are freed even after a failure.
    Cleanup,
}

type Work = Box<dyn FnOnce() -> Result<()> + Send + 'static>;

/// A unit of work submitted to an executor.
pub struct Job {
    label: String,
    class: JobClass,
    work: Work,
}

impl Job {
    pub fn compute<F>(label: impl Into<String>, work: F) -> Self
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        Job {
            label: label.into(),
            class: JobClass::Compute,
            work: Box::new(work),
        }
    }

    pub fn cleanup<F>(label: impl Into<String>, work: F) -> Self
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        Job {
            label: label.into(),
            class: JobClass::Cleanup,
            work: Box::new(work),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn class(&self) -> JobClass {
        self.class
    }

    pub fn run(self) -> Result<()> {
        (self.work)()
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("label", &self.label)
            .field("class", &self.class)
            .finish()
    }
}

/// What a running kernel may use from the executor that launched it.
#[derive(Debug, Clone)]
pub struct ExecContext {
    pub kind: ExecutorKind,
    pub threads: usize,
    pub numeric: Arc<dyn NumericBackend>,
}

/// An execution environment: runs jobs and owns an allocator for temporaries.
pub trait Executor: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn kind(&self) -> ExecutorKind;

    /// Memory space temporaries for this executor live in.
    fn memory_kind(&self) -> MemoryKind;

    /// Number of threads element evaluation may fan out to.
    fn threads(&self) -> usize {
        1
    }

    fn allocator(&self) -> Arc<dyn Allocator>;

    fn numeric(&self) -> Arc<dyn NumericBackend>;

    fn context(&self) -> ExecContext {
        ExecContext {
            kind: self.kind(),
            threads: self.threads(),
            numeric: self.numeric(),
        }
    }

    /// Runs `job`, either immediately or in submission order on a queue.
    fn submit(&self, job: Job) -> Result<()>;

    /// Blocks until every submitted job has finished and reports the first
    /// failure since the last sync.
    fn sync(&self) -> Result<()>;

    fn allocate(&self, bytes: usize) -> Result<Allocation> {
        self.allocator().allocate(bytes, self.memory_kind())
    }

    fn free(&self, allocation: Allocation) -> Result<()> {
        self.allocator().free(allocation)
    }
}
