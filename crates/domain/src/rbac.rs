// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::role::Role;
use std::collections::BTreeSet;

/// How a list of required permissions is matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionMode {
    /// Every listed permission must be held.
    All,
    /// At least one listed permission must be held.
    Any,
}

/// Computes the effective permission set of a user holding `roles`.
///
/// The result is the union of every role's permissions. It is empty for a
/// user with no roles and does not depend on role order.
#[must_use]
pub fn aggregate_permissions<'a, I>(roles: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a Role>,
{
    roles
        .into_iter()
        .flat_map(|role| role.permissions.iter().cloned())
        .collect()
}

/// Returns the required codes the effective set fails to satisfy.
///
/// An empty result means access is granted. In `Any` mode a single held code
/// satisfies the whole requirement; otherwise every required code is reported.
/// An empty requirement is always satisfied.
#[must_use]
pub fn missing_permissions(
    effective: &BTreeSet<String>,
    required: &[&str],
    mode: PermissionMode,
) -> Vec<String> {
    let missing: Vec<String> = required
        .iter()
        .filter(|code| !effective.contains(**code))
        .map(|code| (*code).to_string())
        .collect();

    match mode {
        PermissionMode::All => missing,
        PermissionMode::Any => {
            if missing.len() < required.len() {
                Vec::new()
            } else {
                missing
            }
        }
    }
}
