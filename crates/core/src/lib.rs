//! Careclock domain core.
//!
//! Pure domain logic for the visit-tracking engine: geo validation,
//! the session lifecycle state machine, and review-flagging heuristics.
//! This crate has zero internal deps so it can be used by the db and api
//! layers as well as any future worker or CLI tooling.

pub mod error;
pub mod flagging;
pub mod geo;
pub mod lifecycle;
pub mod roles;
pub mod types;
