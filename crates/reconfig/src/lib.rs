//! # Reconfig
//!
//! Live reconfiguration against the remote admin authority.
//!
//! Responsibilities:
//! - poll the authority at a fixed inter-tick delay (never overlapping)
//! - detect config drift through version tokens
//! - drive the stop -> merge -> start restart sequence on the service
//!   controller

pub mod poller;

pub use poller::{PollerHandle, ReconfigurationPoller, TickOutcome};
