use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use log::{debug, trace};

use crate::error::{poisoned, Result, TensorError};
use crate::executor::MemoryKind;

/// Handle to a live allocation. Must be returned to the allocator that issued it.
#[derive(Debug, PartialEq, Eq)]
pub struct Allocation {
    id: u64,
    bytes: usize,
    kind: MemoryKind,
}

impl Allocation {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn bytes(&self) -> usize {
        self.bytes
    }

    pub fn kind(&self) -> MemoryKind {
        self.kind
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocatorStats {
    pub allocations: usize,
    pub frees: usize,
    pub outstanding_bytes: usize,
    pub peak_bytes: usize,
}

/// Source of temporary memory for executors.
pub trait Allocator: Send + Sync + Debug {
    fn allocate(&self, bytes: usize, kind: MemoryKind) -> Result<Allocation>;

    fn free(&self, allocation: Allocation) -> Result<()>;

    fn stats(&self) -> AllocatorStats;
}

#[derive(Debug, Default)]
struct Ledger {
    live: HashMap<u64, usize>,
    stats: AllocatorStats,
}

/// Allocator that records every allocation and free, with an optional byte limit.
///
/// This is bookkeeping only: it hands out no memory. Element buffers are heap
/// vectors owned by tensors, so the capacity bounds the bytes temporaries may
/// reserve, not the process's memory use. Leaks, double frees and requests over
/// the capacity surface as errors.
#[derive(Debug, Default)]
pub struct TrackingAllocator {
    capacity: Option<usize>,
    next_id: AtomicU64,
    ledger: Mutex<Ledger>,
}

impl TrackingAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocator that refuses to hold more than `bytes` outstanding.
    pub fn with_capacity(bytes: usize) -> Self {
        TrackingAllocator {
            capacity: Some(bytes),
            ..Self::default()
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Number of allocations not yet freed.
    pub fn live(&self) -> usize {
        self.ledger.lock().map(|l| l.live.len()).unwrap_or(0)
    }
}

impl Allocator for TrackingAllocator {
    fn allocate(&self, bytes: usize, kind: MemoryKind) -> Result<Allocation> {
        let mut ledger = self.ledger.lock().map_err(poisoned("allocator"))?;
        let requested = ledger.stats.outstanding_bytes.saturating_add(bytes);
        if let Some(cap) = self.capacity {
            if requested > cap {
                return Err(TensorError::Allocation {
                    bytes,
                    kind: kind.to_string(),
                    reason: format!(
                        "limit of {} bytes exceeded ({} outstanding)",
                        cap, ledger.stats.outstanding_bytes
                    ),
                });
            }
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        ledger.live.insert(id, bytes);
        ledger.stats.allocations += 1;
        ledger.stats.outstanding_bytes = requested;
        ledger.stats.peak_bytes = ledger.stats.peak_bytes.max(requested);
        trace!("allocated #{} ({} bytes, {})", id, bytes, kind);
        Ok(Allocation { id, bytes, kind })
    }

    fn free(&self, allocation: Allocation) -> Result<()> {
        let mut ledger = self.ledger.lock().map_err(poisoned("allocator"))?;
        match ledger.live.remove(&allocation.id) {
            Some(bytes) => {
                ledger.stats.frees += 1;
                ledger.stats.outstanding_bytes -= bytes;
                trace!("freed #{} ({} bytes)", allocation.id, bytes);
                Ok(())
            }
            None => {
                debug!("free of unknown allocation #{}", allocation.id);
                Err(TensorError::Execution(format!(
                    "free of unknown allocation #{}",
                    allocation.id
                )))
            }
        }
    }

    fn stats(&self) -> AllocatorStats {
        self.ledger
            .lock()
            .map(|l| l.stats)
            .unwrap_or_default()
    }
}
