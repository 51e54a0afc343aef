// src/resource/pool.rs

//! Concrete, shareable resource pool.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::config::model::PoolConfig;
use crate::errors::PoolError;
use crate::resource::ResourcePool;

/// Core counts of one host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostCores {
    pub total: u32,
    pub idle: u32,
}

/// A pool of hosts whose idle cores are reserved and released by the
/// execution backend.
///
/// Cloning is cheap and every clone shares the same state, so the
/// schedulers and the backend can hold their own handle.
#[derive(Debug, Clone)]
pub struct SharedPool {
    id: String,
    hosts: Arc<Mutex<Vec<HostCores>>>,
    available: Arc<AtomicBool>,
}

impl SharedPool {
    pub fn new(id: impl Into<String>, cores_per_host: &[u32]) -> Self {
        let hosts = cores_per_host
            .iter()
            .map(|&total| HostCores { total, idle: total })
            .collect();
        Self {
            id: id.into(),
            hosts: Arc::new(Mutex::new(hosts)),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn from_config(cfg: &PoolConfig) -> Self {
        Self::new(cfg.name.clone(), &cfg.hosts)
    }

    /// Toggle the transient-unavailable condition. While unavailable,
    /// [`ResourcePool::idle_cores`] fails.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    pub fn hosts(&self) -> Vec<HostCores> {
        self.lock_hosts().clone()
    }

    /// Take `cores` from one host. The host may go no lower than zero; the
    /// amount actually taken is returned so it can be released exactly.
    pub fn reserve_on_host(&self, host: usize, cores: u32) -> Result<u32, PoolError> {
        let mut hosts = self.lock_hosts();
        let entry = hosts.get_mut(host).ok_or_else(|| PoolError::UnknownHost {
            pool: self.id.clone(),
            host,
        })?;

        let taken = cores.min(entry.idle);
        if taken < cores {
            warn!(
                pool = %self.id,
                host,
                requested = cores,
                taken,
                "host over-subscribed; reserving what is left"
            );
        }
        entry.idle -= taken;
        Ok(taken)
    }

    /// Take up to `cores` across hosts in host order. Returns the per-host
    /// amounts taken (same length as the host list).
    pub fn reserve_spread(&self, cores: u32) -> Vec<u32> {
        let mut hosts = self.lock_hosts();
        let mut left = cores;
        let taken: Vec<u32> = hosts
            .iter_mut()
            .map(|h| {
                let t = left.min(h.idle);
                h.idle -= t;
                left -= t;
                t
            })
            .collect();

        if left > 0 {
            warn!(
                pool = %self.id,
                requested = cores,
                missing = left,
                "pool over-subscribed; reserving what is left"
            );
        }
        taken
    }

    /// Give cores back to a host, never exceeding its total.
    pub fn release(&self, host: usize, cores: u32) {
        let mut hosts = self.lock_hosts();
        match hosts.get_mut(host) {
            Some(entry) => {
                entry.idle = entry.idle.saturating_add(cores).min(entry.total);
                debug!(pool = %self.id, host, cores, idle = entry.idle, "released cores");
            }
            None => warn!(pool = %self.id, host, "release for unknown host; ignoring"),
        }
    }

    /// Release the result of [`SharedPool::reserve_spread`].
    pub fn release_spread(&self, taken: &[u32]) {
        for (host, &cores) in taken.iter().enumerate() {
            if cores > 0 {
                self.release(host, cores);
            }
        }
    }

    // Host counters are plain integers, so a poisoned guard is still usable.
    fn lock_hosts(&self) -> MutexGuard<'_, Vec<HostCores>> {
        match self.hosts.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl ResourcePool for SharedPool {
    fn id(&self) -> &str {
        &self.id
    }

    fn host_count(&self) -> usize {
        self.lock_hosts().len()
    }

    fn idle_cores(&self) -> Result<Vec<u32>, PoolError> {
        if !self.is_available() {
            return Err(PoolError::Unavailable(self.id.clone()));
        }
        Ok(self.lock_hosts().iter().map(|h| h.idle).collect())
    }
}
