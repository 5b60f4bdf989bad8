//! Live process accounting.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Tracks the sandboxed processes that have been spawned and not yet reaped.
///
/// Cloning shares the underlying set.
#[derive(Debug, Clone, Default)]
pub struct ExecutionAccounting {
    live: Arc<Mutex<HashSet<u32>>>,
}

impl ExecutionAccounting {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a live pid. The returned guard forgets it on drop.
    pub(crate) fn track(&self, pid: u32) -> LiveProcess {
        self.live
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(pid);
        LiveProcess {
            pid,
            accounting: self.clone(),
        }
    }

    pub fn live_count(&self) -> usize {
        self.live.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn live_pids(&self) -> Vec<u32> {
        let mut pids: Vec<u32> = self
            .live
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .copied()
            .collect();
        pids.sort_unstable();
        pids
    }
}

/// Guard for one tracked process.
pub(crate) struct LiveProcess {
    pid: u32,
    accounting: ExecutionAccounting,
}

impl Drop for LiveProcess {
    fn drop(&mut self) {
        self.accounting
            .live
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.pid);
    }
}
