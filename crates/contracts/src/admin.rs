//! Admin authority client abstraction
//!
//! Defines the trait consumed by the reconfiguration poller, supporting a real
//! HTTP implementation and mock testing.

use std::future::Future;

use crate::config::{ConfigSnapshot, VersionToken};
use crate::error::AgentError;

/// Client for the remote configuration authority.
///
/// The wire protocol is abstracted down to what change detection needs: a
/// snapshot fetch that can be conditional on a previously seen version token.
pub trait AdminConfigClient: Send + Sync {
    /// Fetch the configuration snapshot for this server.
    ///
    /// - `since = None` returns the current snapshot, or fails with
    ///   [`AgentError::NotRegistered`] when the authority has no record of
    ///   this process.
    /// - `since = Some(token)` returns `Ok(Some(_))` only if the authority's
    ///   current version differs from `token`, and `Ok(None)` when unchanged.
    ///   "No change" is never an error.
    ///
    /// May fail with [`AgentError::AdminUnavailable`] when the authority is
    /// unreachable.
    fn fetch(
        &self,
        since: Option<&VersionToken>,
    ) -> impl Future<Output = Result<Option<ConfigSnapshot>, AgentError>> + Send;
}
