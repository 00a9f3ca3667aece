use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Fine-grained capability, namespaced by domain (`domain:action`).
///
/// The vocabulary is fixed at compile time. [`Permission::ALL`] is the single
/// source of truth for parsing and for the full-set invariant on the
/// platform-admin role.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Permission {
    UserCreate,
    UserRead,
    UserUpdate,
    UserDelete,
    UserAssignRole,
    CondominiumCreate,
    CondominiumRead,
    CondominiumUpdate,
    CondominiumDelete,
    LotCreate,
    LotRead,
    LotUpdate,
    LotDelete,
    FinanceRead,
    FinanceManage,
    FinanceApprove,
    FinanceExport,
    PaymentRead,
    PaymentRecord,
    PaymentRefund,
    BankRead,
    BankReconcile,
    DocumentRead,
    DocumentUpload,
    DocumentDelete,
    AssemblyRead,
    AssemblyCreate,
    AssemblyVote,
    AssemblyClose,
    CommunicationRead,
    CommunicationSend,
    CommunicationBroadcast,
    ReportingView,
    ReportingGenerate,
    SettingsRead,
    SettingsUpdate,
    TenantCreate,
    TenantRead,
    TenantSuspend,
    TenantDelete,
}

impl Permission {
    /// Every defined permission, grouped by domain in declaration order.
    pub const ALL: &'static [Permission] = &[
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
        Permission::TenantCreate,
        Permission::TenantRead,
        Permission::TenantSuspend,
        Permission::TenantDelete,
    ];

    /// Returns the canonical `domain:action` string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::UserCreate => "user:create",
            Permission::UserRead => "user:read",
            Permission::UserUpdate => "user:update",
            Permission::UserDelete => "user:delete",
            Permission::UserAssignRole => "user:assign_role",
            Permission::CondominiumCreate => "condominium:create",
            Permission::CondominiumRead => "condominium:read",
            Permission::CondominiumUpdate => "condominium:update",
            Permission::CondominiumDelete => "condominium:delete",
            Permission::LotCreate => "lot:create",
            Permission::LotRead => "lot:read",
            Permission::LotUpdate => "lot:update",
            Permission::LotDelete => "lot:delete",
            Permission::FinanceRead => "finance:read",
            Permission::FinanceManage => "finance:manage",
            Permission::FinanceApprove => "finance:approve",
            Permission::FinanceExport => "finance:export",
            Permission::PaymentRead => "payment:read",
            Permission::PaymentRecord => "payment:record",
            Permission::PaymentRefund => "payment:refund",
            Permission::BankRead => "bank:read",
            Permission::BankReconcile => "bank:reconcile",
            Permission::DocumentRead => "document:read",
            Permission::DocumentUpload => "document:upload",
            Permission::DocumentDelete => "document:delete",
            Permission::AssemblyRead => "assembly:read",
            Permission::AssemblyCreate => "assembly:create",
            Permission::AssemblyVote => "assembly:vote",
            Permission::AssemblyClose => "assembly:close",
            Permission::CommunicationRead => "communication:read",
            Permission::CommunicationSend => "communication:send",
            Permission::CommunicationBroadcast => "communication:broadcast",
            Permission::ReportingView => "reporting:view",
            Permission::ReportingGenerate => "reporting:generate",
            Permission::SettingsRead => "settings:read",
            Permission::SettingsUpdate => "settings:update",
            Permission::TenantCreate => "tenant:create",
            Permission::TenantRead => "tenant:read",
            Permission::TenantSuspend => "tenant:suspend",
            Permission::TenantDelete => "tenant:delete",
        }
    }

    /// Returns the domain segment (the part before `:`).
    pub fn domain(&self) -> &'static str {
        match self.as_str().split_once(':') {
            Some((domain, _)) => domain,
            None => self.as_str(),
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = Error;

    /// Parses a `domain:action` string, trimming and lowercasing first.
    ///
    /// Unrecognized input is an error; callers enforcing access must treat
    /// it as denial.
    fn from_str(value: &str) -> Result<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        Permission::ALL
            .iter()
            .copied()
            .find(|permission| permission.as_str() == normalized)
            .ok_or(Error::UnknownPermission(normalized))
    }
}

impl TryFrom<&str> for Permission {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        value.parse()
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Permission {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Permission {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}
