use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use log::{debug, error, warn};

use crate::allocator::{Allocator, TrackingAllocator};
use crate::backend::NumericBackend;
use crate::cpu::CpuNumeric;
use crate::error::{poisoned, Result, TensorError};
use crate::executor::{Executor, ExecutorKind, Job, JobClass, MemoryKind};

#[derive(Debug, Default)]
struct QueueState {
    pending: usize,
    /// First failure since the last sync. Later compute jobs are skipped while set.
    error: Option<TensorError>,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<QueueState>,
    idle: Condvar,
}

/// Accelerator-style executor backed by a single ordered work queue.
///
/// Jobs run on a dedicated worker thread in submission order, asynchronously
/// to the caller. Once a job fails, later compute jobs are skipped until the
/// failure has been reported by `sync`; cleanup jobs always run so temporaries
/// are released in stream order.
#[derive(Debug)]
pub struct StreamExecutor {
    sender: Mutex<Option<Sender<Job>>>,
    worker: Option<JoinHandle<()>>,
    shared: Arc<Shared>,
    allocator: Arc<dyn Allocator>,
    numeric: Arc<dyn NumericBackend>,
}

impl StreamExecutor {
    pub fn new() -> Result<Self> {
        Self::with_backends(
            Arc::new(TrackingAllocator::new()),
            Arc::new(CpuNumeric::new()),
        )
    }

    pub fn with_backends(
        allocator: Arc<dyn Allocator>,
        numeric: Arc<dyn NumericBackend>,
    ) -> Result<Self> {
        let (sender, receiver) = mpsc::channel();
        let shared = Arc::new(Shared::default());
        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("tx-stream".to_string())
            .spawn(move || drain(receiver, worker_shared))
            .map_err(|e| TensorError::Execution(format!("failed to start stream worker: {}", e)))?;
        Ok(StreamExecutor {
            sender: Mutex::new(Some(sender)),
            worker: Some(worker),
            shared,
            allocator,
            numeric,
        })
    }

    /// Number of submitted jobs that have not finished.
    pub fn pending(&self) -> usize {
        self.shared.state.lock().map(|s| s.pending).unwrap_or(0)
    }
}

fn drain(receiver: Receiver<Job>, shared: Arc<Shared>) {
    for job in receiver {
        let skip = job.class() == JobClass::Compute
            && shared
                .state
                .lock()
                .map(|s| s.error.is_some())
                .unwrap_or(true);
        let outcome = if skip {
            debug!("stream: skipping {} after earlier failure", job.label());
            Ok(())
        } else {
            let label = job.label().to_string();
            panic::catch_unwind(AssertUnwindSafe(|| job.run()))
                .unwrap_or_else(|_| Err(TensorError::Execution(format!("{} panicked", label))))
                .map_err(|e| {
                    error!("stream: {} failed: {}", label, e);
                    e
                })
        };

        // The count must drop even if another thread poisoned the lock, or sync never returns.
        let mut state = shared.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = outcome {
            if state.error.is_none() {
                state.error = Some(e);
            } else {
                warn!("stream: dropping error after the first: {}", e);
            }
        }
        state.pending -= 1;
        if state.pending == 0 {
            shared.idle.notify_all();
        }
    }
}

impl Executor for StreamExecutor {
    fn name(&self) -> &str {
        "stream"
    }

    fn kind(&self) -> ExecutorKind {
        ExecutorKind::Stream
    }

    fn memory_kind(&self) -> MemoryKind {
        MemoryKind::Device
    }

    fn allocator(&self) -> Arc<dyn Allocator> {
        Arc::clone(&self.allocator)
    }

    fn numeric(&self) -> Arc<dyn NumericBackend> {
        Arc::clone(&self.numeric)
    }

    fn submit(&self, job: Job) -> Result<()> {
        let sender = self.sender.lock().map_err(poisoned("stream sender"))?;
        let sender = sender
            .as_ref()
            .ok_or_else(|| TensorError::Execution("stream is shut down".to_string()))?;
        self.shared
            .state
            .lock()
            .map_err(poisoned("stream state"))?
            .pending += 1;
        debug!("stream: enqueue {}", job.label());
        sender.send(job).map_err(|_| {
            if let Ok(mut state) = self.shared.state.lock() {
                state.pending -= 1;
            }
            TensorError::Execution("stream worker has exited".to_string())
        })
    }

    fn sync(&self) -> Result<()> {
        let mut state = self.shared.state.lock().map_err(poisoned("stream state"))?;
        while state.pending > 0 {
            state = self
                .shared
                .idle
                .wait(state)
                .map_err(poisoned("stream state"))?;
        }
        match state.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Drop for StreamExecutor {
    fn drop(&mut self) {
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("stream worker panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_jobs_run_in_order() {
        let ex = StreamExecutor::new().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        for i in 0..5 {
            let log = Arc::clone(&log);
            ex.submit(Job::compute(format!("job {}", i), move || {
                log.lock().unwrap().push(i);
                Ok(())
            }))
            .unwrap();
        }
        ex.sync().unwrap();
        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3, 4]);
        assert_eq!(ex.pending(), 0);
    }

    #[test]
    fn test_error_is_sticky_until_sync() {
        let ex = StreamExecutor::new().unwrap();
        let computed = Arc::new(AtomicUsize::new(0));
        let cleaned = Arc::new(AtomicUsize::new(0));

        ex.submit(Job::compute("fail", || {
            Err(TensorError::Execution("kernel fault".into()))
        }))
        .unwrap();
        let c = Arc::clone(&computed);
        ex.submit(Job::compute("after", move || {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }))
        .unwrap();
        let c = Arc::clone(&cleaned);
        ex.submit(Job::cleanup("free", move || {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }))
        .unwrap();

        let err = ex.sync().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Execution);
        assert_eq!(computed.load(Ordering::SeqCst), 0);
        assert_eq!(cleaned.load(Ordering::SeqCst), 1);

        // The failure is reported once; the stream is usable again.
        ex.sync().unwrap();
        let c = Arc::clone(&computed);
        ex.submit(Job::compute("again", move || {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }))
        .unwrap();
        ex.sync().unwrap();
        assert_eq!(computed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_job_is_reported_by_sync() {
        let ex = StreamExecutor::new().unwrap();
        let cleaned = Arc::new(AtomicUsize::new(0));
        ex.submit(Job::compute("boom", || panic!("kernel bug"))).unwrap();
        let c = Arc::clone(&cleaned);
        ex.submit(Job::cleanup("free", move || {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }))
        .unwrap();

        let err = ex.sync().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Execution);
        assert_eq!(err.to_string(), "boom panicked");
        assert_eq!(cleaned.load(Ordering::SeqCst), 1);
        assert_eq!(ex.pending(), 0);

        // The worker survived the panic.
        let c = Arc::clone(&cleaned);
        ex.submit(Job::compute("after", move || {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }))
        .unwrap();
        ex.sync().unwrap();
        assert_eq!(cleaned.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_memory_kind_is_device() {
        let ex = StreamExecutor::new().unwrap();
        let a = ex.allocate(8).unwrap();
        assert_eq!(a.kind(), MemoryKind::Device);
        ex.free(a).unwrap();
    }
}
