//! # Admin Client
//!
//! Clients for the remote configuration authority.
//!
//! [`HttpAdminClient`] speaks the minimal change-detection protocol; the
//! authority's config payload is an opaque key/value map turned into a
//! [`contracts::ConfigOverlay`]. [`MockAdminClient`] is a scripted
//! implementation for unit and integration tests.

mod http;
mod mock;

pub use http::{AdminEndpoint, HttpAdminClient};
pub use mock::MockAdminClient;
