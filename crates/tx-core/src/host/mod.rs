pub mod walk;

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use log::debug;

use crate::allocator::{Allocator, TrackingAllocator};
use crate::backend::NumericBackend;
use crate::cpu::CpuNumeric;
use crate::error::{poisoned, Result, TensorError};
use crate::executor::{Executor, ExecutorKind, Job, MemoryKind};

/// How many threads a host executor evaluates elements with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThreadsMode {
    #[default]
    Single,
    /// A fixed number of threads (at least one).
    Select(usize),
    /// One thread per available core.
    All,
}

impl ThreadsMode {
    pub fn resolve(&self) -> usize {
        match self {
            ThreadsMode::Single => 1,
            ThreadsMode::Select(n) => (*n).max(1),
            ThreadsMode::All => thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HostExecParams {
    pub threads: ThreadsMode,
}

#[derive(Debug, Default)]
struct Timer {
    started: Option<Instant>,
    elapsed: Option<Duration>,
}

/// Executor that runs jobs synchronously on the calling thread.
///
/// Element evaluation may fan out to `threads()` scoped workers, but every job
/// has finished by the time `submit` returns, so `sync` has nothing to wait for.
#[derive(Debug)]
pub struct HostExecutor {
    params: HostExecParams,
    threads: usize,
    allocator: Arc<dyn Allocator>,
    numeric: Arc<dyn NumericBackend>,
    timer: Mutex<Timer>,
}

impl HostExecutor {
    /// A single-threaded executor with a fresh tracking allocator.
    pub fn new() -> Self {
        Self::with_params(HostExecParams::default())
    }

    pub fn with_params(params: HostExecParams) -> Self {
        HostExecutor {
            params,
            threads: params.threads.resolve(),
            allocator: Arc::new(TrackingAllocator::new()),
            numeric: Arc::new(CpuNumeric::new()),
            timer: Mutex::new(Timer::default()),
        }
    }

    pub fn with_allocator(mut self, allocator: Arc<dyn Allocator>) -> Self {
        self.allocator = allocator;
        self
    }

    pub fn with_numeric(mut self, numeric: Arc<dyn NumericBackend>) -> Self {
        self.numeric = numeric;
        self
    }

    pub fn params(&self) -> HostExecParams {
        self.params
    }

    pub fn is_single_threaded(&self) -> bool {
        self.threads == 1
    }

    fn check_timer(&self) -> Result<()> {
        if !self.is_single_threaded() {
            return Err(TensorError::unsupported_executor(
                "timer",
                format!("{}-thread host", self.threads),
            ));
        }
        Ok(())
    }

    /// Starts the wall-clock timer. Only available in single-threaded mode.
    pub fn start_timer(&self) -> Result<()> {
        self.check_timer()?;
        let mut timer = self.timer.lock().map_err(poisoned("timer"))?;
        timer.started = Some(Instant::now());
        timer.elapsed = None;
        Ok(())
    }

    pub fn stop_timer(&self) -> Result<()> {
        self.check_timer()?;
        let mut timer = self.timer.lock().map_err(poisoned("timer"))?;
        let started = timer
            .started
            .take()
            .ok_or_else(|| TensorError::precondition("timer", "stop_timer before start_timer"))?;
        timer.elapsed = Some(started.elapsed());
        Ok(())
    }

    /// Milliseconds between the last start and stop.
    pub fn elapsed_ms(&self) -> Result<f64> {
        self.check_timer()?;
        let timer = self.timer.lock().map_err(poisoned("timer"))?;
        timer
            .elapsed
            .map(|d| d.as_secs_f64() * 1000.0)
            .ok_or_else(|| TensorError::precondition("timer", "timer has not been stopped"))
    }
}

impl Default for HostExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor for HostExecutor {
    fn name(&self) -> &str {
        "host"
    }

    fn kind(&self) -> ExecutorKind {
        ExecutorKind::Host
    }

    fn memory_kind(&self) -> MemoryKind {
        MemoryKind::Host
    }

    fn threads(&self) -> usize {
        self.threads
    }

    fn allocator(&self) -> Arc<dyn Allocator> {
        Arc::clone(&self.allocator)
    }

    fn numeric(&self) -> Arc<dyn NumericBackend> {
        Arc::clone(&self.numeric)
    }

    fn submit(&self, job: Job) -> Result<()> {
        debug!("host: running {}", job.label());
        job.run()
    }

    fn sync(&self) -> Result<()> {
        Ok(())
    }
}
