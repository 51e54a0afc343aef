// src/exec/mod.rs

//! Execution layer.
//!
//! - [`backend`] provides the `ExecutionBackend` trait the runtime and the
//!   negotiation cycles submit jobs through.
//! - [`simulated`] provides `SimulatedBackend`, which runs jobs on the
//!   tokio clock against shared pool capacity and reports outcomes back to
//!   the runtime via `RuntimeEvent`s.

pub mod backend;
pub mod simulated;

pub use backend::ExecutionBackend;
pub use simulated::{SimulatedBackend, TaskProfile};
