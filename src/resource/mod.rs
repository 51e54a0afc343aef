// src/resource/mod.rs

//! Resource pools and point-in-time capacity snapshots.
//!
//! - [`ResourcePool`] is the read-only view the schedulers use.
//! - [`pool::SharedPool`] is the concrete pool whose ground truth is
//!   mutated by the execution backend.
//! - [`CoreSnapshot`] is a scheduler-local copy of every pool's idle cores
//!   for one scheduling pass.

pub mod pool;

use std::fmt::Debug;
use std::sync::Arc;

use tracing::warn;

use crate::errors::PoolError;

pub use pool::{HostCores, SharedPool};

/// Canonical pool identifier.
pub type PoolId = String;

/// Read-only view of a compute resource.
pub trait ResourcePool: Send + Sync + Debug {
    fn id(&self) -> &str;

    fn host_count(&self) -> usize;

    /// Point-in-time idle cores per host, in host order.
    ///
    /// No lock is held after the call returns; callers must tolerate the
    /// answer going stale.
    fn idle_cores(&self) -> Result<Vec<u32>, PoolError>;

    /// Sum of idle cores across hosts.
    fn total_idle_cores(&self) -> Result<u64, PoolError> {
        Ok(self.idle_cores()?.iter().map(|&c| u64::from(c)).sum())
    }
}

pub type PoolRef = Arc<dyn ResourcePool>;

/// Idle cores of one pool as seen at the start of a scheduling pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSnapshot {
    pub pool: PoolId,
    pub idle: Vec<u32>,
}

/// Scheduler-local capacity view; decremented as tasks are packed so one
/// pass never over-subscribes a host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoreSnapshot {
    pools: Vec<PoolSnapshot>,
}

impl CoreSnapshot {
    /// Read every pool once. A pool that faults contributes no hosts.
    pub fn capture(pools: &[PoolRef]) -> Self {
        let pools = pools
            .iter()
            .map(|pool| {
                let idle = match pool.idle_cores() {
                    Ok(idle) => idle,
                    Err(err) => {
                        warn!(
                            pool = %pool.id(),
                            error = %err,
                            "pool query failed; treating as zero capacity for this cycle"
                        );
                        Vec::new()
                    }
                };
                PoolSnapshot {
                    pool: pool.id().to_string(),
                    idle,
                }
            })
            .collect();

        Self { pools }
    }

    pub fn from_pools(pools: Vec<PoolSnapshot>) -> Self {
        Self { pools }
    }

    pub fn pools(&self) -> &[PoolSnapshot] {
        &self.pools
    }

    pub fn pools_mut(&mut self) -> &mut [PoolSnapshot] {
        &mut self.pools
    }

    pub fn idle_of(&self, pool: &str) -> Option<&[u32]> {
        self.pools
            .iter()
            .find(|p| p.pool == pool)
            .map(|p| p.idle.as_slice())
    }

    /// First pool id in enumeration order, whatever its capacity.
    pub fn first_pool(&self) -> Option<&str> {
        self.pools.first().map(|p| p.pool.as_str())
    }
}
