// src/central/mod.rs

//! Central dispatch mode.
//!
//! Admitted jobs are queued with a [`CentralDispatcher`] instead of being
//! packed onto hosts. Periodic [`NegotiationCycle`]s match queued jobs to
//! pools first-come-first-served, with at most one cycle in flight.
//!
//! - [`dispatcher`] is the pure queue + busy-flag state.
//! - [`negotiation`] is the matching pass run off the dispatcher's task.
//! - [`manager`] is the async loop wiring both to tokio.

pub mod dispatcher;
pub mod manager;
pub mod negotiation;

pub use dispatcher::CentralDispatcher;
pub use manager::{spawn_central_manager, CentralHandle, CentralMessage};
pub use negotiation::{Matched, NegotiationCycle, NegotiationOutcome};
