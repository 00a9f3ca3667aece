use crate::access::{has_all_permissions, has_any_permission};
use crate::error::{Error, Result};
use crate::permission::Permission;
use crate::role::Role;

/// Declarative permission requirement attached to a route registration.
///
/// Routes declare what they require as a plain value instead of framework
/// metadata, so the requirement stays inspectable and enforcement can live
/// in any guard. A route with no required permissions must say so with
/// [`RoutePolicy::public`]; the constructors reject empty lists to keep a
/// forgotten declaration from authorizing everyone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePolicy {
    kind: PolicyKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PolicyKind {
    Public,
    AllOf(Vec<Permission>),
    AnyOf(Vec<Permission>),
}

impl RoutePolicy {
    /// Marks a route as open to every authenticated role.
    pub fn public() -> Self {
        Self {
            kind: PolicyKind::Public,
        }
    }

    /// Requires every listed permission.
    pub fn all_of(permissions: Vec<Permission>) -> Result<Self> {
        if permissions.is_empty() {
            return Err(Error::EmptyPolicy);
        }
        Ok(Self {
            kind: PolicyKind::AllOf(permissions),
        })
    }

    /// Requires at least one listed permission.
    pub fn any_of(permissions: Vec<Permission>) -> Result<Self> {
        if permissions.is_empty() {
            return Err(Error::EmptyPolicy);
        }
        Ok(Self {
            kind: PolicyKind::AnyOf(permissions),
        })
    }

    /// Requires a single permission.
    pub fn require(permission: Permission) -> Self {
        Self {
            kind: PolicyKind::AllOf(vec![permission]),
        }
    }

    /// Returns whether the role satisfies this policy.
    pub fn allows(&self, role: Role) -> bool {
        match &self.kind {
            PolicyKind::Public => true,
            PolicyKind::AllOf(permissions) => has_all_permissions(role, permissions),
            PolicyKind::AnyOf(permissions) => has_any_permission(role, permissions),
        }
    }

    /// Returns the declared permission list, empty for public routes.
    pub fn required_permissions(&self) -> &[Permission] {
        match &self.kind {
            PolicyKind::Public => &[],
            PolicyKind::AllOf(permissions) | PolicyKind::AnyOf(permissions) => permissions,
        }
    }

    /// Returns whether this is an explicit public route.
    pub fn is_public(&self) -> bool {
        matches!(self.kind, PolicyKind::Public)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_of_should_reject_empty_list() {
        let result = RoutePolicy::all_of(Vec::new());
        assert!(matches!(result, Err(Error::EmptyPolicy)));
        let result = RoutePolicy::any_of(Vec::new());
        assert!(matches!(result, Err(Error::EmptyPolicy)));
    }

    #[test]
    fn public_should_allow_every_role() {
        let policy = RoutePolicy::public();
        for role in Role::ALL {
            assert!(policy.allows(*role));
        }
        assert!(policy.required_permissions().is_empty());
        assert!(policy.is_public());
    }

    #[test]
    fn all_of_should_require_every_permission() {
        let policy =
            RoutePolicy::all_of(vec![Permission::FinanceRead, Permission::FinanceApprove])
                .unwrap();
        assert!(policy.allows(Role::CouncilMember));
        assert!(!policy.allows(Role::Manager));
        assert!(!policy.allows(Role::Resident));
    }

    #[test]
    fn any_of_should_require_one_permission() {
        let policy =
            RoutePolicy::any_of(vec![Permission::FinanceManage, Permission::FinanceApprove])
                .unwrap();
        assert!(policy.allows(Role::Manager));
        assert!(policy.allows(Role::CouncilMember));
        assert!(!policy.allows(Role::Resident));
    }

    #[test]
    fn require_should_wrap_single_permission() {
        let policy = RoutePolicy::require(Permission::BankReconcile);
        assert!(policy.allows(Role::Manager));
        assert!(!policy.allows(Role::UnitOwner));
        assert_eq!(policy.required_permissions(), &[Permission::BankReconcile]);
    }
}
