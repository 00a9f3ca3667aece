//! Static role→permission capability matrix and its query functions.
//!
//! The matrix is pure data: no I/O, no interior state, no failure modes.
//! Every query degrades to "no permission" rather than erroring, which is
//! the safe default for an access-control check.

use crate::permission::Permission;
use crate::role::Role;

const RESIDENT_PERMISSIONS: &[Permission] = &[
    Permission::PaymentRead,
    Permission::DocumentRead,
    Permission::AssemblyRead,
    Permission::CommunicationRead,
];

const UNIT_OWNER_PERMISSIONS: &[Permission] = &[
    Permission::LotRead,
    Permission::FinanceRead,
    Permission::PaymentRead,
    Permission::DocumentRead,
    Permission::AssemblyRead,
    Permission::AssemblyVote,
    Permission::CommunicationRead,
];

const COUNCIL_MEMBER_PERMISSIONS: &[Permission] = &[
    Permission::LotRead,
    Permission::FinanceRead,
    Permission::FinanceApprove,
    Permission::FinanceExport,
    Permission::PaymentRead,
    Permission::DocumentRead,
    Permission::DocumentUpload,
    Permission::AssemblyRead,
    Permission::AssemblyVote,
    Permission::CommunicationRead,
    Permission::CommunicationSend,
    Permission::ReportingView,
];

// The syndic runs operations but does not vote in assemblies and does not
// approve its own spending; those stay with the council.
const MANAGER_PERMISSIONS: &[Permission] = &[
    Permission::UserCreate,
    Permission::UserRead,
    Permission::UserUpdate,
    Permission::UserAssignRole,
    Permission::CondominiumRead,
    Permission::CondominiumUpdate,
    Permission::LotCreate,
    Permission::LotRead,
    Permission::LotUpdate,
    Permission::LotDelete,
    Permission::FinanceRead,
    Permission::FinanceManage,
    Permission::FinanceExport,
    Permission::PaymentRead,
    Permission::PaymentRecord,
    Permission::PaymentRefund,
    Permission::BankRead,
    Permission::BankReconcile,
    Permission::DocumentRead,
    Permission::DocumentUpload,
    Permission::DocumentDelete,
    Permission::AssemblyRead,
    Permission::AssemblyCreate,
    Permission::AssemblyClose,
    Permission::CommunicationRead,
    Permission::CommunicationSend,
    Permission::CommunicationBroadcast,
    Permission::ReportingView,
    Permission::ReportingGenerate,
    Permission::SettingsRead,
    Permission::SettingsUpdate,
];

// Everything except tenant management, which is platform-admin only.
const ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::UserCreate,
    Permission::UserRead,
    Permission::UserUpdate,
    Permission::UserDelete,
    Permission::UserAssignRole,
    Permission::CondominiumCreate,
    Permission::CondominiumRead,
    Permission::CondominiumUpdate,
    Permission::CondominiumDelete,
    Permission::LotCreate,
    Permission::LotRead,
    Permission::LotUpdate,
    Permission::LotDelete,
    Permission::FinanceRead,
    Permission::FinanceManage,
    Permission::FinanceApprove,
    Permission::FinanceExport,
    Permission::PaymentRead,
    Permission::PaymentRecord,
    Permission::PaymentRefund,
    Permission::BankRead,
    Permission::BankReconcile,
    Permission::DocumentRead,
    Permission::DocumentUpload,
    Permission::DocumentDelete,
    Permission::AssemblyRead,
    Permission::AssemblyCreate,
    Permission::AssemblyVote,
    Permission::AssemblyClose,
    Permission::CommunicationRead,
    Permission::CommunicationSend,
    Permission::CommunicationBroadcast,
    Permission::ReportingView,
    Permission::ReportingGenerate,
    Permission::SettingsRead,
    Permission::SettingsUpdate,
];

/// Returns the full permission list for a role, in declared order.
///
/// The `match` is exhaustive: a new [`Role`] variant cannot compile without
/// a matrix row, so the map stays total by construction.
pub fn permissions_for_role(role: Role) -> &'static [Permission] {
    match role {
        Role::Resident => RESIDENT_PERMISSIONS,
        Role::UnitOwner => UNIT_OWNER_PERMISSIONS,
        Role::CouncilMember => COUNCIL_MEMBER_PERMISSIONS,
        Role::Manager => MANAGER_PERMISSIONS,
        Role::Admin => ADMIN_PERMISSIONS,
        Role::PlatformAdmin => Permission::ALL,
    }
}

/// Returns whether a role holds a permission.
pub fn has_permission(role: Role, permission: Permission) -> bool {
    permissions_for_role(role).contains(&permission)
}

/// Returns whether a role holds every listed permission.
///
/// An empty list is vacuously true. Route declarations must not rely on
/// this: [`crate::RoutePolicy`] rejects empty permission lists and requires
/// an explicit public marker instead.
pub fn has_all_permissions(role: Role, permissions: &[Permission]) -> bool {
    permissions
        .iter()
        .all(|permission| has_permission(role, *permission))
}

/// Returns whether a role holds at least one listed permission.
///
/// An empty list is false.
pub fn has_any_permission(role: Role, permissions: &[Permission]) -> bool {
    permissions
        .iter()
        .any(|permission| has_permission(role, *permission))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn platform_admin_should_hold_every_permission() {
        assert_eq!(permissions_for_role(Role::PlatformAdmin), Permission::ALL);
    }

    #[test]
    fn role_union_should_equal_full_permission_set() {
        let union: HashSet<Permission> = Role::ALL
            .iter()
            .flat_map(|role| permissions_for_role(*role).iter().copied())
            .collect();
        assert_eq!(union.len(), Permission::ALL.len());
    }

    #[test]
    fn tenant_management_should_be_platform_admin_only() {
        for role in Role::ALL {
            let expected = *role == Role::PlatformAdmin;
            assert_eq!(has_permission(*role, Permission::TenantCreate), expected);
            assert_eq!(has_permission(*role, Permission::TenantDelete), expected);
        }
    }

    #[test]
    fn permission_sets_should_not_be_strictly_nested() {
        // The manager outranks the council member but lacks the vote.
        assert!(has_permission(Role::CouncilMember, Permission::AssemblyVote));
        assert!(!has_permission(Role::Manager, Permission::AssemblyVote));
        assert!(!has_permission(Role::Manager, Permission::FinanceApprove));
    }

    #[test]
    fn resident_should_not_approve_finance() {
        assert!(!has_permission(Role::Resident, Permission::FinanceApprove));
        assert!(has_permission(Role::Resident, Permission::DocumentRead));
    }

    #[test]
    fn every_role_should_have_an_entry() {
        for role in Role::ALL {
            assert!(!permissions_for_role(*role).is_empty());
        }
    }

    #[test]
    fn has_all_permissions_should_be_vacuously_true_on_empty_list() {
        for role in Role::ALL {
            assert!(has_all_permissions(*role, &[]));
            assert!(!has_any_permission(*role, &[]));
        }
    }

    #[test]
    fn has_all_permissions_should_require_every_listed_permission() {
        let required = [Permission::FinanceRead, Permission::FinanceApprove];
        assert!(has_all_permissions(Role::CouncilMember, &required));
        assert!(!has_all_permissions(Role::UnitOwner, &required));
        assert!(has_any_permission(Role::UnitOwner, &required));
    }
}
