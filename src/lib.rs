//! Authorization and caching core for a multi-tenant property-management
//! platform.
//!
//! Two independent pieces compose the crate. A static role→permission
//! capability matrix answers membership queries with pure functions and no
//! I/O; unknown input always degrades to "no permission". A generic
//! [`ExpiringCache`] memoizes read-heavy aggregations per tenant, with
//! per-entry TTL, glob and tenant-scoped invalidation, and a single-flight
//! compute path.
//!
//! # Examples
//!
//! Checking the matrix and declaring a route policy:
//! ```
//! use syndic_guard::{Permission, Role, RoutePolicy, access};
//!
//! assert!(access::has_permission(Role::CouncilMember, Permission::FinanceApprove));
//! assert!(!access::has_permission(Role::Resident, Permission::FinanceApprove));
//!
//! let policy = RoutePolicy::require(Permission::BankReconcile);
//! assert!(policy.allows(Role::Manager));
//! ```
//!
//! Caching a per-tenant aggregation:
//! ```
//! use std::time::Duration;
//! use syndic_guard::{CacheKey, ExpiringCache, TenantId};
//!
//! let cache = ExpiringCache::new().with_default_ttl(Duration::from_secs(30));
//! let tenant = TenantId::try_from("tenant_1").unwrap();
//! let key = CacheKey::new("dashboard", tenant.clone(), ["stats"]).unwrap();
//! cache.set(key.clone(), 42_u64);
//! assert_eq!(cache.get(&key), Some(42));
//! assert_eq!(cache.invalidate_tenant(&tenant), 1);
//! ```
#![forbid(unsafe_code)]

pub mod access;
mod cache;
mod error;
mod key;
mod permission;
mod policy;
mod role;
mod types;

#[cfg(feature = "axum")]
pub mod axum;

pub use crate::access::{
    has_all_permissions, has_any_permission, has_permission, permissions_for_role,
};
pub use crate::cache::{
    CacheStats, DEFAULT_SWEEP_INTERVAL, DEFAULT_TTL, ExpiringCache, SweeperHandle,
};
pub use crate::error::{ComputeError, Error, Result};
pub use crate::key::CacheKey;
pub use crate::permission::Permission;
pub use crate::policy::RoutePolicy;
pub use crate::role::Role;
pub use crate::types::{PrincipalId, TenantId};
