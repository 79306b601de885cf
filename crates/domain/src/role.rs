// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Roles and the rules protecting the built-in system roles.

use crate::error::DomainError;
use crate::permission::{PermissionCatalog, SystemRole};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

const MAX_ROLE_NAME_LENGTH: usize = 50;

/// A named set of permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Database identifier, `None` until persisted.
    pub role_id: Option<i64>,
    pub name: String,
    pub description: String,
    /// Built-in roles cannot be renamed, deleted or stripped of their core set.
    pub is_system: bool,
    pub permissions: BTreeSet<String>,
}

impl Role {
    /// Creates a new, not yet persisted, custom role.
    #[must_use]
    pub const fn new(name: String, description: String, permissions: BTreeSet<String>) -> Self {
        Self {
            role_id: None,
            name,
            description,
            is_system: false,
            permissions,
        }
    }

    /// Builds the persisted form of a system role from the catalog.
    #[must_use]
    pub fn system(role: SystemRole, catalog: &PermissionCatalog) -> Self {
        Self {
            role_id: None,
            name: role.name().to_string(),
            description: role.description().to_string(),
            is_system: true,
            permissions: role.core_permissions(catalog),
        }
    }

    /// The permissions this role may never lose.
    ///
    /// Empty for custom roles.
    #[must_use]
    pub fn required_permissions(&self, catalog: &PermissionCatalog) -> BTreeSet<String> {
        if !self.is_system {
            return BTreeSet::new();
        }
        SystemRole::from_name(&self.name)
            .map(|role| role.core_permissions(catalog))
            .unwrap_or_default()
    }
}

/// Permissions gained and lost by a role update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl PermissionDiff {
    /// Compares two permission sets.
    #[must_use]
    pub fn between(before: &BTreeSet<String>, after: &BTreeSet<String>) -> Self {
        Self {
            added: after.difference(before).cloned().collect(),
            removed: before.difference(after).cloned().collect(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Trims and validates a role name.
///
/// Names are lowercase ASCII letters, digits and underscores.
///
/// # Errors
///
/// Returns `DomainError::InvalidRoleName` if the name is empty, too long or
/// contains other characters.
pub fn validate_role_name(name: &str) -> Result<String, DomainError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::InvalidRoleName(String::from(
            "Role name cannot be empty",
        )));
    }
    if trimmed.len() > MAX_ROLE_NAME_LENGTH {
        return Err(DomainError::InvalidRoleName(format!(
            "Role name cannot exceed {MAX_ROLE_NAME_LENGTH} characters"
        )));
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(DomainError::InvalidRoleName(format!(
            "Role name '{trimmed}' may only contain lowercase letters, digits and underscores"
        )));
    }
    Ok(trimmed.to_string())
}

/// Checks that a proposed update keeps a system role intact.
///
/// # Arguments
///
/// * `role` - The role as currently stored
/// * `new_name` - The proposed name, if it is being changed
/// * `new_permissions` - The proposed permission set, if it is being replaced
/// * `catalog` - The permission catalog
///
/// # Errors
///
/// Returns `DomainError::ProtectedRole` if a system role would be renamed or
/// lose part of its required permission set.
pub fn validate_role_update(
    role: &Role,
    new_name: Option<&str>,
    new_permissions: Option<&BTreeSet<String>>,
    catalog: &PermissionCatalog,
) -> Result<(), DomainError> {
    if !role.is_system {
        return Ok(());
    }

    if let Some(name) = new_name
        && name != role.name
    {
        return Err(DomainError::ProtectedRole {
            role: role.name.clone(),
            reason: format!("cannot rename to '{name}'"),
        });
    }

    if let Some(permissions) = new_permissions {
        let required = role.required_permissions(catalog);
        let dropped: Vec<String> = required.difference(permissions).cloned().collect();
        if !dropped.is_empty() {
            return Err(DomainError::ProtectedRole {
                role: role.name.clone(),
                reason: format!("cannot remove core permissions: {}", dropped.join(", ")),
            });
        }
    }

    Ok(())
}

/// Checks that a role may be deleted.
///
/// # Errors
///
/// Returns `DomainError::ProtectedRole` for system roles and
/// `DomainError::RoleInUse` while any user still holds the role.
pub fn validate_role_deletion(role: &Role, user_count: i64) -> Result<(), DomainError> {
    if role.is_system {
        return Err(DomainError::ProtectedRole {
            role: role.name.clone(),
            reason: String::from("system roles cannot be deleted"),
        });
    }
    if user_count > 0 {
        return Err(DomainError::RoleInUse {
            role: role.name.clone(),
            user_count,
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn codes(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|c| (*c).to_string()).collect()
    }

    #[test]
    fn test_validate_role_name() {
        assert_eq!(validate_role_name("  dispatcher ").unwrap(), "dispatcher");
        assert!(validate_role_name("").is_err());
        assert!(validate_role_name("   ").is_err());
        assert!(validate_role_name("Dispatcher").is_err());
        assert!(validate_role_name("night shift").is_err());
        assert!(validate_role_name(&"a".repeat(51)).is_err());
        assert!(validate_role_name("night_shift_2").is_ok());
    }

    #[test]
    fn test_system_role_cannot_be_renamed() {
        let catalog = PermissionCatalog::standard();
        let agent = Role::system(SystemRole::Agent, &catalog);
        let err = validate_role_update(&agent, Some("support"), None, &catalog).unwrap_err();
        assert!(matches!(err, DomainError::ProtectedRole { .. }));
        assert!(validate_role_update(&agent, Some("agent"), None, &catalog).is_ok());
    }

    #[test]
    fn test_system_role_keeps_core_permissions() {
        let catalog = PermissionCatalog::standard();
        let agent = Role::system(SystemRole::Agent, &catalog);
        let stripped = codes(&["tickets.read", "tickets.upload"]);
        let err = validate_role_update(&agent, None, Some(&stripped), &catalog).unwrap_err();
        assert_eq!(
            err,
            DomainError::ProtectedRole {
                role: String::from("agent"),
                reason: String::from("cannot remove core permissions: tickets.write"),
            }
        );
    }

    #[test]
    fn test_system_role_may_gain_permissions() {
        let catalog = PermissionCatalog::standard();
        let agent = Role::system(SystemRole::Agent, &catalog);
        let mut widened = agent.permissions.clone();
        widened.insert(String::from("audit.read"));
        assert!(validate_role_update(&agent, None, Some(&widened), &catalog).is_ok());
    }

    #[test]
    fn test_custom_role_is_unrestricted() {
        let catalog = PermissionCatalog::standard();
        let custom = Role::new(
            String::from("dispatcher"),
            String::new(),
            codes(&["tickets.assign"]),
        );
        assert!(
            validate_role_update(&custom, Some("router"), Some(&BTreeSet::new()), &catalog)
                .is_ok()
        );
    }

    #[test]
    fn test_deletion_rules() {
        let catalog = PermissionCatalog::standard();
        let viewer = Role::system(SystemRole::Viewer, &catalog);
        assert!(matches!(
            validate_role_deletion(&viewer, 0),
            Err(DomainError::ProtectedRole { .. })
        ));

        let custom = Role::new(String::from("dispatcher"), String::new(), BTreeSet::new());
        assert_eq!(
            validate_role_deletion(&custom, 2),
            Err(DomainError::RoleInUse {
                role: String::from("dispatcher"),
                user_count: 2,
            })
        );
        assert!(validate_role_deletion(&custom, 0).is_ok());
    }

    #[test]
    fn test_permission_diff() {
        let before = codes(&["tickets.read", "tickets.write"]);
        let after = codes(&["tickets.read", "tickets.assign"]);
        let diff = PermissionDiff::between(&before, &after);
        assert_eq!(diff.added, vec!["tickets.assign"]);
        assert_eq!(diff.removed, vec!["tickets.write"]);
        assert!(PermissionDiff::between(&before, &before).is_empty());
    }
}
