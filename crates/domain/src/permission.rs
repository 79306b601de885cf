// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! The permission catalog and the built-in system roles.

use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub const USERS_READ: &str = "users.read";
pub const USERS_WRITE: &str = "users.write";
pub const ROLES_READ: &str = "roles.read";
pub const ROLES_WRITE: &str = "roles.write";
pub const PERMISSIONS_READ: &str = "permissions.read";
pub const AUDIT_READ: &str = "audit.read";
pub const TICKETS_READ: &str = "tickets.read";
pub const TICKETS_WRITE: &str = "tickets.write";
pub const TICKETS_ASSIGN: &str = "tickets.assign";
pub const TICKETS_COMPLETE: &str = "tickets.complete";
pub const TICKETS_UPLOAD: &str = "tickets.upload";
pub const CENTERS_WRITE: &str = "centers.write";
pub const SYSTEM_ADMIN: &str = "system.admin";

/// `(code, category, description)` for every permission shipped with the system.
const STANDARD_PERMISSIONS: &[(&str, &str, &str)] = &[
    (USERS_READ, "users", "View user accounts"),
    (USERS_WRITE, "users", "Manage user accounts and role membership"),
    (ROLES_READ, "roles", "View roles"),
    (ROLES_WRITE, "roles", "Create, edit and delete roles"),
    (PERMISSIONS_READ, "permissions", "View the permission catalog"),
    (AUDIT_READ, "audit", "View the audit trail"),
    (TICKETS_READ, "tickets", "View tickets"),
    (TICKETS_WRITE, "tickets", "Confirm and cancel tickets"),
    (TICKETS_ASSIGN, "tickets", "Assign tickets to technicians"),
    (TICKETS_COMPLETE, "tickets", "Complete tickets"),
    (TICKETS_UPLOAD, "tickets", "Upload ticket images"),
    (CENTERS_WRITE, "centers", "Manage service centers and technicians"),
    (SYSTEM_ADMIN, "system", "Full system administration"),
];

/// A single permission code with its category and description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Dotted code, e.g. `tickets.read`.
    pub code: String,
    /// Grouping used for display, e.g. `tickets`.
    pub category: String,
    /// Human readable description.
    pub description: String,
}

/// The immutable set of permissions known to the system.
///
/// Built once at start-up and passed by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionCatalog {
    permissions: Vec<Permission>,
}

impl PermissionCatalog {
    /// Builds the catalog shipped with the system.
    #[must_use]
    pub fn standard() -> Self {
        let permissions = STANDARD_PERMISSIONS
            .iter()
            .map(|(code, category, description)| Permission {
                code: (*code).to_string(),
                category: (*category).to_string(),
                description: (*description).to_string(),
            })
            .collect();
        Self { permissions }
    }

    /// Returns every permission in catalog order.
    #[must_use]
    pub fn permissions(&self) -> &[Permission] {
        &self.permissions
    }

    /// Returns true if `code` is a known permission.
    #[must_use]
    pub fn contains(&self, code: &str) -> bool {
        self.permissions.iter().any(|p| p.code == code)
    }

    /// Returns every permission code.
    #[must_use]
    pub fn codes(&self) -> BTreeSet<String> {
        self.permissions.iter().map(|p| p.code.clone()).collect()
    }

    /// Groups the catalog by category.
    #[must_use]
    pub fn by_category(&self) -> BTreeMap<String, Vec<Permission>> {
        let mut grouped: BTreeMap<String, Vec<Permission>> = BTreeMap::new();
        for permission in &self.permissions {
            grouped
                .entry(permission.category.clone())
                .or_default()
                .push(permission.clone());
        }
        grouped
    }

    /// Checks that every code exists and returns them as a deduplicated set.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::UnknownPermission` for the first code that is not
    /// in the catalog.
    pub fn validate_codes<S: AsRef<str>>(&self, codes: &[S]) -> Result<BTreeSet<String>, DomainError> {
        let mut validated = BTreeSet::new();
        for code in codes {
            let code = code.as_ref();
            if !self.contains(code) {
                return Err(DomainError::UnknownPermission {
                    code: code.to_string(),
                });
            }
            validated.insert(code.to_string());
        }
        Ok(validated)
    }
}

/// Roles created at initialization that cannot be renamed or deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemRole {
    Admin,
    OpsManager,
    Agent,
    Viewer,
}

impl SystemRole {
    pub const ALL: [Self; 4] = [Self::Admin, Self::OpsManager, Self::Agent, Self::Viewer];

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::OpsManager => "ops_manager",
            Self::Agent => "agent",
            Self::Viewer => "viewer",
        }
    }

    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Admin => "System administrator",
            Self::OpsManager => "Operations manager",
            Self::Agent => "Customer service agent",
            Self::Viewer => "Read-only access",
        }
    }

    /// Looks up a system role by its name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|role| role.name() == name)
    }

    /// The minimum permission set this role must always retain.
    ///
    /// `admin` requires every permission in the catalog.
    #[must_use]
    pub fn core_permissions(&self, catalog: &PermissionCatalog) -> BTreeSet<String> {
        let codes: &[&str] = match self {
            Self::Admin => return catalog.codes(),
            Self::OpsManager => &[
                USERS_READ,
                TICKETS_READ,
                TICKETS_ASSIGN,
                TICKETS_COMPLETE,
                CENTERS_WRITE,
            ],
            Self::Agent => &[TICKETS_READ, TICKETS_WRITE, TICKETS_UPLOAD],
            Self::Viewer => &[TICKETS_READ],
        };
        codes.iter().map(|c| (*c).to_string()).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_codes_are_unique() {
        let catalog = PermissionCatalog::standard();
        assert_eq!(catalog.codes().len(), catalog.permissions().len());
    }

    #[test]
    fn test_codes_are_prefixed_by_category() {
        let catalog = PermissionCatalog::standard();
        for permission in catalog.permissions() {
            assert!(
                permission
                    .code
                    .starts_with(&format!("{}.", permission.category)),
                "{} not in category {}",
                permission.code,
                permission.category
            );
        }
    }

    #[test]
    fn test_by_category_groups_ticket_permissions() {
        let grouped = PermissionCatalog::standard().by_category();
        let tickets = &grouped["tickets"];
        assert_eq!(tickets.len(), 5);
        assert_eq!(grouped["system"].len(), 1);
    }

    #[test]
    fn test_validate_codes_rejects_unknown() {
        let catalog = PermissionCatalog::standard();
        let err = catalog
            .validate_codes(&["tickets.read", "tickets.fly"])
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::UnknownPermission {
                code: String::from("tickets.fly")
            }
        );
    }

    #[test]
    fn test_validate_codes_deduplicates() {
        let catalog = PermissionCatalog::standard();
        let codes = catalog
            .validate_codes(&["tickets.read", "tickets.read", "audit.read"])
            .unwrap();
        assert_eq!(codes.len(), 2);
    }

    #[test]
    fn test_system_role_core_sets_are_in_catalog() {
        let catalog = PermissionCatalog::standard();
        let all = catalog.codes();
        for role in SystemRole::ALL {
            let core = role.core_permissions(&catalog);
            assert!(!core.is_empty());
            assert!(core.is_subset(&all), "{} has unknown codes", role.name());
        }
        assert_eq!(SystemRole::Admin.core_permissions(&catalog), all);
    }

    #[test]
    fn test_system_role_from_name() {
        assert_eq!(SystemRole::from_name("ops_manager"), Some(SystemRole::OpsManager));
        assert_eq!(SystemRole::from_name("Admin"), None);
        assert_eq!(SystemRole::from_name("dispatcher"), None);
    }
}
