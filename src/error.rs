use std::sync::Arc;
use thiserror::Error;

/// Error type for caller-supplied compute functions.
pub type ComputeError = Box<dyn std::error::Error + Send + Sync>;

/// Crate result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid identifier input.
    #[error("invalid id: {0}")]
    InvalidId(String),
    /// Role string does not name a known role.
    #[error("unknown role: {0}")]
    UnknownRole(String),
    /// Permission string does not name a known permission.
    #[error("unknown permission: {0}")]
    UnknownPermission(String),
    /// Invalid cache key input.
    #[error("invalid cache key: {0}")]
    InvalidCacheKey(String),
    /// A route policy declared an empty permission list.
    #[error("route policy requires at least one permission; use RoutePolicy::public() for open routes")]
    EmptyPolicy,
    /// A compute function passed to the cache failed.
    ///
    /// The error is shared because a single failed computation may be
    /// delivered to several concurrent waiters.
    #[error("compute failed: {0}")]
    Compute(Arc<ComputeError>),
}
