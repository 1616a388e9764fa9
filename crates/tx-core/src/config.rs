use std::env;
use std::sync::Arc;

use crate::allocator::{Allocator, TrackingAllocator};
use crate::cpu::CpuNumeric;
use crate::error::{Result, TensorError};
use crate::host::{HostExecParams, HostExecutor, ThreadsMode};
use crate::stream::StreamExecutor;

pub const HOST_THREADS_VAR: &str = "TX_HOST_THREADS";
pub const MEMORY_LIMIT_VAR: &str = "TX_MEMORY_LIMIT";

/// Executor settings, usually read from the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecConfig {
    pub threads: ThreadsMode,
    /// Cap on outstanding temporary bytes; `None` is unlimited.
    pub memory_limit: Option<usize>,
}

impl ExecConfig {
    /// Reads `TX_HOST_THREADS` (`single`, `all` or a thread count) and
    /// `TX_MEMORY_LIMIT` (bytes of temporaries the allocator may account for at
    /// once). Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ExecConfig::default();
        if let Some(raw) = lookup(HOST_THREADS_VAR) {
            config.threads = match raw.trim().to_ascii_lowercase().as_str() {
                "single" => ThreadsMode::Single,
                "all" => ThreadsMode::All,
                other => match other.parse::<usize>() {
                    Ok(n) if n > 0 => ThreadsMode::Select(n),
                    _ => return Err(invalid(HOST_THREADS_VAR, &raw)),
                },
            };
        }
        if let Some(raw) = lookup(MEMORY_LIMIT_VAR) {
            let bytes = raw
                .trim()
                .parse::<usize>()
                .map_err(|_| invalid(MEMORY_LIMIT_VAR, &raw))?;
            config.memory_limit = Some(bytes);
        }
        Ok(config)
    }

    pub fn allocator(&self) -> Arc<dyn Allocator> {
        match self.memory_limit {
            Some(bytes) => Arc::new(TrackingAllocator::with_capacity(bytes)),
            None => Arc::new(TrackingAllocator::new()),
        }
    }

    pub fn host_executor(&self) -> HostExecutor {
        HostExecutor::with_params(HostExecParams {
            threads: self.threads,
        })
        .with_allocator(self.allocator())
    }

    pub fn stream_executor(&self) -> Result<StreamExecutor> {
        StreamExecutor::with_backends(self.allocator(), Arc::new(CpuNumeric::new()))
    }
}

fn invalid(var: &str, raw: &str) -> TensorError {
    TensorError::construction("config", format!("invalid {}={:?}", var, raw))
}
