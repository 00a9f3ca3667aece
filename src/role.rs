use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Privilege tier assigned to a user account by the identity system.
///
/// The six levels are ordered least to most privileged, but permission sets
/// are not strictly nested across them: a [`Role::Manager`] runs the
/// condominium day to day yet does not vote in general assemblies, which a
/// [`Role::CouncilMember`] does. Membership questions go through
/// [`crate::access`], never through tier comparison.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Role {
    /// Occupant of a lot without ownership.
    Resident,
    /// Owner of one or more lots.
    UnitOwner,
    /// Elected member of the owners' council.
    CouncilMember,
    /// Property manager (syndic) operating the condominium.
    Manager,
    /// Back-office administrator for a tenant.
    Admin,
    /// Platform operator with every permission, including tenant management.
    PlatformAdmin,
}

impl Role {
    /// Every role, least to most privileged.
    pub const ALL: &'static [Role] = &[
        Role::Resident,
        Role::UnitOwner,
        Role::CouncilMember,
        Role::Manager,
        Role::Admin,
        Role::PlatformAdmin,
    ];

    /// Returns the canonical string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Resident => "resident",
            Role::UnitOwner => "unit_owner",
            Role::CouncilMember => "council_member",
            Role::Manager => "manager",
            Role::Admin => "admin",
            Role::PlatformAdmin => "platform_admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    /// Parses a role string, trimming and lowercasing first.
    ///
    /// Unrecognized input is an error, never a default role.
    fn from_str(value: &str) -> Result<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        Role::ALL
            .iter()
            .copied()
            .find(|role| role.as_str() == normalized)
            .ok_or(Error::UnknownRole(normalized))
    }
}

impl TryFrom<&str> for Role {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        value.parse()
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Role {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Role {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_str_should_round_trip_every_role() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), *role);
        }
    }

    #[test]
    fn from_str_should_trim_and_lowercase() {
        let role: Role = " Platform_Admin ".parse().unwrap();
        assert_eq!(role, Role::PlatformAdmin);
    }

    #[test]
    fn from_str_should_reject_unknown_role() {
        let result = "superuser".parse::<Role>();
        assert!(matches!(result, Err(Error::UnknownRole(_))));
    }
}
