//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Config model
//! - [`ConfigOverlay`] is partial: every recognized option is optional, and
//!   overlaying one on another is "set if present", never "reset if absent"
//! - [`AgentConfig`] is fully resolved against the built-in defaults table
//! - snapshot equality is version-token equality; contents are never diffed

mod admin;
mod config;
mod error;
mod service;

pub use admin::AdminConfigClient;
pub use config::*;
pub use error::*;
pub use service::{ServiceController, ServiceState};
