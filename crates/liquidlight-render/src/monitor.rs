//! Periodic memory monitor for a shared [`GpuResourcePool`]

use crate::pool::{GpuResourcePool, ResourceAllocator};
use crate::Result;
use liquidlight_core::PeriodicTask;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// Pool shared between the render loop and the monitor thread
pub type SharedResourcePool<A> = Arc<Mutex<GpuResourcePool<A>>>;

/// Runs [`GpuResourcePool::check_memory`] on a background thread
#[derive(Debug)]
pub struct PoolMonitor {
    task: PeriodicTask,
    checks: Arc<AtomicUsize>,
    destroyed: Arc<AtomicUsize>,
}

impl PoolMonitor {
    /// Start checking `pool` every `interval`
    pub fn start<A>(pool: SharedResourcePool<A>, interval: Duration) -> Result<Self>
    where
        A: ResourceAllocator + 'static,
        A::Resource: 'static,
    {
        let checks = Arc::new(AtomicUsize::new(0));
        let destroyed = Arc::new(AtomicUsize::new(0));
        let (checks_in, destroyed_in) = (checks.clone(), destroyed.clone());

        let task = PeriodicTask::spawn("resource-pool-monitor", interval, move || {
            let freed = pool.lock().check_memory();
            checks_in.fetch_add(1, Ordering::Relaxed);
            if freed > 0 {
                destroyed_in.fetch_add(freed, Ordering::Relaxed);
            }
            trace!("Pool memory check freed {} resources", freed);
        })?;

        Ok(Self {
            task,
            checks,
            destroyed,
        })
    }

    /// Checks run so far
    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::Relaxed)
    }

    /// Resources destroyed by the monitor so far
    pub fn destroyed(&self) -> usize {
        self.destroyed.load(Ordering::Relaxed)
    }

    /// Stop the monitor thread
    pub fn stop(&mut self) {
        self.task.stop();
    }
}
