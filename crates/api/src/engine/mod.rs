//! Visit session engine.
//!
//! Contains the orchestration layer that ties GPS validation, the lifecycle
//! transition rules, and the session store into the clock-in/clock-out
//! operations, plus the background reconciler that force-ends sessions left
//! running past the timeout.

pub mod reconciler;
pub mod visits;

pub use visits::{ClockInInput, VisitEngine};
