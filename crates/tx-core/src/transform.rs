//! Whole-array transforms and the prepare/execute/release protocol.
//!
//! A [`Transform`] describes one heavyweight computation: its output shape, the
//! executors it can run on, its inputs, and an `exec` call that fills a
//! destination in one pass. [`Materialized`] turns a transform into a readable
//! operator by computing it into a temporary during `prepare` and freeing that
//! temporary during `release`.

use std::fmt;
use std::sync::{Arc, Mutex, RwLock};

use log::{debug, warn};

use crate::allocator::Allocation;
use crate::capability::{CapabilityKind, CapabilityValue};
use crate::dtype::Scalar;
use crate::error::{poisoned, Result, TensorError};
use crate::executor::{ExecContext, Executor, ExecutorKind, Job};
use crate::operator::{self, Node, Operator, OperatorMut};
use crate::shape::Shape;
use crate::tensor::Tensor;

/// Caller-side state of a node that owns a temporary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    Constructed,
    Preparing,
    Materialized,
    /// Terminal. A released node cannot be prepared again.
    Released,
}

#[derive(Debug)]
struct Materialization<U> {
    buffer: Tensor<U>,
    allocation: Allocation,
}

type Slot<U> = Arc<RwLock<Option<Materialization<U>>>>;

/// A buffer owned by exactly one node, allocated in `prepare` and freed in `release`.
///
/// The phase follows the caller's calls. The buffer itself is dropped by a
/// cleanup job, so on a stream executor it stays readable by every job issued
/// before the release.
#[derive(Debug)]
pub struct Temporary<U> {
    label: String,
    phase: Mutex<LifecyclePhase>,
    slot: Slot<U>,
}

impl<U: Scalar> Temporary<U> {
    pub fn new(label: impl Into<String>) -> Self {
        Temporary {
            label: label.into(),
            phase: Mutex::new(LifecyclePhase::Constructed),
            slot: Arc::new(RwLock::new(None)),
        }
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.phase
            .lock()
            .map(|p| *p)
            .unwrap_or(LifecyclePhase::Released)
    }

    fn transition(&self, from: LifecyclePhase, to: LifecyclePhase, call: &str) -> Result<()> {
        let mut phase = self.phase.lock().map_err(poisoned("lifecycle"))?;
        if *phase != from {
            return Err(TensorError::precondition(
                self.label.as_str(),
                format!("{} called in phase {:?}", call, *phase),
            ));
        }
        debug!("{}: {:?} -> {:?}", self.label, from, to);
        *phase = to;
        Ok(())
    }

    pub fn begin_prepare(&self) -> Result<()> {
        self.transition(LifecyclePhase::Constructed, LifecyclePhase::Preparing, "prepare")
    }

    /// Returns a failed prepare to `Constructed`; nothing is retained.
    pub fn abort_prepare(&self) {
        if let Ok(mut phase) = self.phase.lock() {
            *phase = LifecyclePhase::Constructed;
        }
    }

    pub fn complete_prepare(&self) -> Result<()> {
        self.transition(LifecyclePhase::Preparing, LifecyclePhase::Materialized, "prepare")
    }

    pub fn begin_release(&self) -> Result<()> {
        self.transition(LifecyclePhase::Materialized, LifecyclePhase::Released, "release")
    }

    /// Reserves `shape`'s bytes from the executor's allocator, then creates a
    /// zeroed buffer and stores both in the slot. Returns a view the producing
    /// kernel can write into.
    ///
    /// The allocator only accounts for the bytes; the buffer itself lives on
    /// the heap and is dropped when the release job clears the slot.
    pub fn allocate(&self, ex: &dyn Executor, shape: &Shape) -> Result<Tensor<U>> {
        let bytes = shape.numel() * U::DTYPE.size_in_bytes();
        let allocation = ex.allocate(bytes)?;
        debug!(
            "{}: allocated {} bytes of {} memory for {}",
            self.label,
            bytes,
            allocation.kind(),
            shape
        );
        let buffer = Tensor::zeros(shape.clone());
        let view = buffer.clone();
        let mut slot = self.slot.write().map_err(poisoned("temporary"))?;
        if let Some(stale) = slot.replace(Materialization { buffer, allocation }) {
            warn!("{}: replacing a temporary that was never freed", self.label);
            ex.free(stale.allocation)?;
        }
        Ok(view)
    }

    /// Frees the buffer immediately. Only used to unwind a failed prepare.
    pub fn discard(&self, ex: &dyn Executor) -> Result<()> {
        let taken = self.slot.write().map_err(poisoned("temporary"))?.take();
        match taken {
            Some(m) => ex.free(m.allocation),
            None => Ok(()),
        }
    }

    /// A cleanup job that drops the buffer and returns its allocation.
    pub fn release_job(&self, ex: &dyn Executor) -> Job {
        let slot = Arc::clone(&self.slot);
        let allocator = ex.allocator();
        let label = self.label.clone();
        Job::cleanup(format!("free {}", self.label), move || {
            let taken = slot.write().map_err(poisoned("temporary"))?.take();
            match taken {
                Some(m) => {
                    debug!("{}: freeing {} bytes", label, m.allocation.bytes());
                    allocator.free(m.allocation)
                }
                None => Ok(()),
            }
        })
    }

    /// The materialized buffer, or a precondition error outside prepare..release.
    pub fn buffer(&self) -> Result<Tensor<U>> {
        let slot = self.slot.read().map_err(poisoned("temporary"))?;
        match slot.as_ref() {
            Some(m) => Ok(m.buffer.clone()),
            None => Err(self.not_materialized()),
        }
    }

    pub fn read(&self, idx: &[usize]) -> Result<U> {
        let slot = self.slot.read().map_err(poisoned("temporary"))?;
        match slot.as_ref() {
            Some(m) => m.buffer.read(idx),
            None => Err(self.not_materialized()),
        }
    }

    fn not_materialized(&self) -> TensorError {
        let when = match self.phase() {
            LifecyclePhase::Released => "after release",
            _ => "before prepare completed",
        };
        TensorError::precondition(self.label.as_str(), format!("read {}", when))
    }
}

/// A whole-array computation that fills a destination in a single pass.
pub trait Transform: Send + Sync + fmt::Debug + 'static {
    type Output: Scalar;

    fn name(&self) -> String;

    fn output_shape(&self) -> &Shape;

    /// Whether this transform can run on executors of `kind`.
    fn supports(&self, _kind: ExecutorKind) -> bool {
        true
    }

    /// Operators read by `exec`, prepared before it runs and released after.
    fn inputs(&self) -> Vec<&dyn Node>;

    fn capability(&self, kind: CapabilityKind) -> CapabilityValue {
        operator::fold_children(kind, &self.inputs())
    }

    /// Fully populates `out`, which has `output_shape()`, or fails.
    fn exec(&self, out: &dyn OperatorMut<Value = Self::Output>, ctx: &ExecContext) -> Result<()>;
}

fn check_supported<K: Transform>(kernel: &K, ex: &dyn Executor) -> Result<()> {
    if !kernel.supports(ex.kind()) {
        return Err(TensorError::unsupported_executor(kernel.name(), ex.name()));
    }
    Ok(())
}

/// A transform made readable: it owns a temporary holding its result.
///
/// Not `Clone`; the temporary belongs to exactly one node.
#[derive(Debug)]
pub struct Materialized<K: Transform> {
    kernel: Arc<K>,
    temp: Temporary<K::Output>,
}

impl<K: Transform> Materialized<K> {
    pub fn new(kernel: K) -> Self {
        let temp = Temporary::new(kernel.name());
        Materialized {
            kernel: Arc::new(kernel),
            temp,
        }
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.temp.phase()
    }

    fn materialize(&self, ex: &dyn Executor) -> Result<()> {
        let buffer = self.temp.allocate(ex, self.kernel.output_shape())?;
        let kernel = Arc::clone(&self.kernel);
        let ctx = ex.context();
        let submitted = ex.submit(Job::compute(self.kernel.name(), move || {
            kernel.exec(&buffer, &ctx)
        }));
        if let Err(err) = submitted {
            if let Err(free_err) = self.temp.discard(ex) {
                warn!("{}: free after failed exec: {}", self.kernel.name(), free_err);
            }
            return Err(err);
        }
        Ok(())
    }
}

impl<K: Transform> Node for Materialized<K> {
    fn name(&self) -> String {
        self.kernel.name()
    }

    fn capability(&self, kind: CapabilityKind) -> CapabilityValue {
        self.kernel.capability(kind)
    }

    fn needs_prepare(&self) -> bool {
        true
    }

    fn prepare(&self, ex: &dyn Executor) -> Result<()> {
        check_supported(&*self.kernel, ex)?;
        self.temp.begin_prepare()?;
        let inputs = self.kernel.inputs();
        if let Err(err) = operator::prepare_children(&inputs, ex) {
            self.temp.abort_prepare();
            return Err(err);
        }
        if let Err(err) = self.materialize(ex) {
            if let Err(release_err) = operator::release_children(&inputs, ex) {
                warn!("{}: release after failed prepare: {}", self.name(), release_err);
            }
            self.temp.abort_prepare();
            return Err(err);
        }
        self.temp.complete_prepare()
    }

    fn release(&self, ex: &dyn Executor) -> Result<()> {
        self.temp.begin_release()?;
        let children = operator::release_children(&self.kernel.inputs(), ex);
        ex.submit(self.temp.release_job(ex))?;
        children
    }
}

impl<K: Transform> Operator for Materialized<K> {
    type Value = K::Output;

    fn rank(&self) -> usize {
        self.kernel.output_shape().ndim()
    }

    fn size(&self, dim: usize) -> usize {
        self.kernel.output_shape().dim(dim)
    }

    fn read(&self, idx: &[usize]) -> Result<K::Output> {
        self.temp.read(idx)
    }

    fn shape(&self) -> Shape {
        self.kernel.output_shape().clone()
    }
}

/// Executes `kernel` straight into `dst` without a temporary.
///
/// Inputs are prepared first and released after the kernel has been issued.
pub fn run_transform<K, D>(dst: &D, kernel: K, ex: &dyn Executor) -> Result<()>
where
    K: Transform,
    D: OperatorMut<Value = K::Output> + Clone + 'static,
{
    let expected = kernel.output_shape();
    let got = dst.shape();
    if &got != expected {
        return Err(TensorError::ShapeMismatch {
            expected: expected.dims().to_vec(),
            got: got.dims().to_vec(),
        });
    }
    check_supported(&kernel, ex)?;

    let kernel = Arc::new(kernel);
    let inputs = kernel.inputs();
    operator::prepare_children(&inputs, ex)?;

    let job_kernel = Arc::clone(&kernel);
    let out = dst.clone();
    let ctx = ex.context();
    let issued = ex.submit(Job::compute(kernel.name(), move || {
        job_kernel.exec(&out, &ctx)
    }));
    let released = operator::release_children(&inputs, ex);
    issued?;
    released
}
