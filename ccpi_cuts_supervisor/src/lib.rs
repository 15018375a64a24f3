//! ccpi_cuts_supervisor
//!
//! Outside-world facing orchestration layer for `ccpi_cuts_core`.
//!
//! Responsibilities:
//! - adapt raw event data into `EventRecord`s (nominal and shifted universes)
//! - classify batches in parallel, one cursor and cut table per worker
//! - keep accumulated cut tables per sample (deterministic sharding by name)
//!
//! Non-goals:
//! - no IO
//! - no async
//! - no selection logic (lives in core)

pub mod adapter;
pub mod supervisor;

pub use adapter::{RawEvent, Shift, Shifted};

pub use supervisor::{CutSupervisor, EventDecision, RestoreStats, SupervisorSnapshot};
