// src/sched/packing.rs

//! Core packing policies.
//!
//! Packing works on a [`CoreSnapshot`] taken at the start of a cycle and
//! only ever decrements that local copy. Nothing is reserved on the real
//! pools; a reservation-based allocator can be slotted in behind
//! [`CoreAllocator`] without touching admission logic.

use std::fmt::Debug;

use crate::resource::{CoreSnapshot, PoolId};

/// Host chosen for a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub pool: PoolId,
    pub host: usize,
}

/// Chooses a host for a task needing `cores` and charges the snapshot.
pub trait CoreAllocator: Send + Debug {
    fn allocate(&mut self, snapshot: &mut CoreSnapshot, cores: u32) -> Option<Placement>;
}

/// Pools in enumeration order, hosts in index order, first host with
/// enough idle cores wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstFitAllocator;

impl CoreAllocator for FirstFitAllocator {
    fn allocate(&mut self, snapshot: &mut CoreSnapshot, cores: u32) -> Option<Placement> {
        for pool in snapshot.pools_mut() {
            if let Some((host, idle)) = pool
                .idle
                .iter_mut()
                .enumerate()
                .find(|(_, idle)| **idle >= cores)
            {
                *idle -= cores;
                return Some(Placement {
                    pool: pool.pool.clone(),
                    host,
                });
            }
        }
        None
    }
}
