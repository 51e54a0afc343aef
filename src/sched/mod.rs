// src/sched/mod.rs

//! DAG-aware admission scheduling.
//!
//! - [`admission`] holds the per-cycle admission algorithm (priority
//!   inheritance, level gate, batch cap, singleton slot, packing).
//! - [`state`] holds the level/singleton counters and task membership sets.
//! - [`packing`] holds the pluggable core allocator.
//! - [`notification`] defines the completion/failure notifications that
//!   release admitted tasks.

pub mod admission;
pub mod notification;
pub mod packing;
pub mod state;

pub use admission::{AdmissionConfig, AdmissionScheduler, AdmissionStep, DEFAULT_BATCH_SIZE};
pub use notification::{FailureCause, JobNotification};
pub use packing::{CoreAllocator, FirstFitAllocator, Placement};
pub use state::{RunningLevel, SchedulerState};
