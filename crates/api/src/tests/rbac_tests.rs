// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use super::helpers::{
    NOW, TestEnv, create_admin, create_agent, create_test_cause, reload_user, setup,
    user_with_roles,
};
use crate::{
    ApiError, AssignRolesRequest, AuthenticatedUser, CreateRoleRequest, RoleWriteResponse,
    UpdateRoleRequest, assign_roles_to_user, create_role, delete_role, get_role,
    list_permissions, list_roles, update_role,
};

fn role_id(env: &mut TestEnv, name: &str) -> i64 {
    env.persistence
        .get_role_by_name(name)
        .unwrap()
        .and_then(|r| r.role_id)
        .unwrap()
}

fn create_dispatcher(env: &mut TestEnv, admin: &AuthenticatedUser) -> RoleWriteResponse {
    let catalog = env.catalog.clone();
    create_role(
        &mut env.persistence,
        &catalog,
        &CreateRoleRequest {
            name: String::from("dispatcher"),
            description: String::from("Assigns work"),
            permissions: vec![String::from("tickets.read"), String::from("tickets.assign")],
        },
        admin,
        create_test_cause(),
        NOW,
    )
    .unwrap()
}

fn rename(
    env: &mut TestEnv,
    admin: &AuthenticatedUser,
    role_id: i64,
    request: &UpdateRoleRequest,
) -> Result<RoleWriteResponse, ApiError> {
    let catalog = env.catalog.clone();
    update_role(
        &mut env.persistence,
        &catalog,
        role_id,
        request,
        admin,
        create_test_cause(),
        NOW,
    )
}

#[test]
fn test_permissions_are_grouped_by_category() {
    let mut env = setup();
    let admin = create_admin(&mut env);

    let response = list_permissions(&mut env.persistence, &admin).unwrap();

    let categories: Vec<&str> = response
        .categories
        .iter()
        .map(|c| c.category.as_str())
        .collect();
    let mut sorted = categories.clone();
    sorted.sort_unstable();
    assert_eq!(categories, sorted);

    let tickets = response
        .categories
        .iter()
        .find(|c| c.category == "tickets")
        .unwrap();
    assert_eq!(tickets.permissions.len(), 5);
}

#[test]
fn test_system_roles_are_listed() {
    let mut env = setup();
    let admin = create_admin(&mut env);

    let response = list_roles(&mut env.persistence, &admin).unwrap();

    let admin_role = response.roles.iter().find(|r| r.name == "admin").unwrap();
    assert!(admin_role.is_system);
    assert_eq!(admin_role.user_count, 1);
    assert_eq!(admin_role.permission_count, env.catalog.codes().len());
    for name in ["ops_manager", "agent", "viewer"] {
        assert!(response.roles.iter().any(|r| r.name == name && r.is_system));
    }
}

#[test]
fn test_create_role_and_read_it_back() {
    let mut env = setup();
    let admin = create_admin(&mut env);

    let created = create_dispatcher(&mut env, &admin);
    assert!(!created.role.is_system);
    assert_eq!(created.role.user_count, 0);

    let fetched = get_role(&mut env.persistence, created.role.role_id, &admin).unwrap();
    assert_eq!(fetched.name, "dispatcher");
    assert_eq!(
        fetched.permissions,
        vec![String::from("tickets.assign"), String::from("tickets.read")]
    );
}

#[test]
fn test_create_role_rejects_unknown_permission() {
    let mut env = setup();
    let admin = create_admin(&mut env);
    let catalog = env.catalog.clone();

    let err = create_role(
        &mut env.persistence,
        &catalog,
        &CreateRoleRequest {
            name: String::from("wizard"),
            description: String::new(),
            permissions: vec![String::from("tickets.teleport")],
        },
        &admin,
        create_test_cause(),
        NOW,
    )
    .unwrap_err();

    assert!(matches!(err, ApiError::InvalidInput { ref field, .. } if field == "permissions"));
}

#[test]
fn test_duplicate_role_name_is_a_conflict() {
    let mut env = setup();
    let admin = create_admin(&mut env);
    let catalog = env.catalog.clone();

    let err = create_role(
        &mut env.persistence,
        &catalog,
        &CreateRoleRequest {
            name: String::from("viewer"),
            description: String::new(),
            permissions: vec![],
        },
        &admin,
        create_test_cause(),
        NOW,
    )
    .unwrap_err();

    assert!(matches!(err, ApiError::Conflict { .. }));
}

#[test]
fn test_agent_cannot_manage_roles() {
    let mut env = setup();
    let agent = create_agent(&mut env);

    assert!(matches!(
        list_roles(&mut env.persistence, &agent),
        Err(ApiError::PermissionDenied { .. })
    ));
}

#[test]
fn test_system_role_cannot_be_renamed() {
    let mut env = setup();
    let admin = create_admin(&mut env);
    let viewer_id = role_id(&mut env, "viewer");

    let err = rename(
        &mut env,
        &admin,
        viewer_id,
        &UpdateRoleRequest {
            name: Some(String::from("readers")),
            description: None,
            permissions: None,
        },
    )
    .unwrap_err();

    assert!(matches!(err, ApiError::ProtectedRole { ref role, .. } if role == "viewer"));
}

#[test]
fn test_system_role_keeps_core_permissions() {
    let mut env = setup();
    let admin = create_admin(&mut env);
    let agent_id = role_id(&mut env, "agent");

    let err = rename(
        &mut env,
        &admin,
        agent_id,
        &UpdateRoleRequest {
            name: None,
            description: None,
            permissions: Some(vec![String::from("tickets.read")]),
        },
    )
    .unwrap_err();
    assert!(matches!(err, ApiError::ProtectedRole { .. }));

    let extended = rename(
        &mut env,
        &admin,
        agent_id,
        &UpdateRoleRequest {
            name: None,
            description: Some(String::from("Front desk")),
            permissions: Some(vec![
                String::from("tickets.read"),
                String::from("tickets.write"),
                String::from("tickets.upload"),
                String::from("tickets.complete"),
            ]),
        },
    )
    .unwrap();
    assert_eq!(extended.role.description, "Front desk");
    assert_eq!(extended.role.permission_count, 4);
}

#[test]
fn test_custom_role_can_be_renamed() {
    let mut env = setup();
    let admin = create_admin(&mut env);
    let created = create_dispatcher(&mut env, &admin);

    let updated = rename(
        &mut env,
        &admin,
        created.role.role_id,
        &UpdateRoleRequest {
            name: Some(String::from("scheduler")),
            description: None,
            permissions: None,
        },
    )
    .unwrap();

    assert_eq!(updated.role.name, "scheduler");
    assert_ne!(updated.event_id, created.event_id);
}

#[test]
fn test_role_in_use_cannot_be_deleted() {
    let mut env = setup();
    let admin = create_admin(&mut env);
    let created = create_dispatcher(&mut env, &admin);
    user_with_roles(&mut env, "dispatch@example.com", &["dispatcher"]);
    let catalog = env.catalog.clone();

    let err = delete_role(
        &mut env.persistence,
        &catalog,
        created.role.role_id,
        &admin,
        create_test_cause(),
        NOW,
    )
    .unwrap_err();

    assert_eq!(
        err,
        ApiError::RoleInUse {
            role: String::from("dispatcher"),
            user_count: 1
        }
    );
}

#[test]
fn test_unused_custom_role_can_be_deleted() {
    let mut env = setup();
    let admin = create_admin(&mut env);
    let created = create_dispatcher(&mut env, &admin);
    let catalog = env.catalog.clone();

    let deleted = delete_role(
        &mut env.persistence,
        &catalog,
        created.role.role_id,
        &admin,
        create_test_cause(),
        NOW,
    )
    .unwrap();

    assert_eq!(deleted.role_id, created.role.role_id);
    assert!(matches!(
        get_role(&mut env.persistence, created.role.role_id, &admin),
        Err(ApiError::ResourceNotFound { .. })
    ));
}

#[test]
fn test_system_role_cannot_be_deleted() {
    let mut env = setup();
    let admin = create_admin(&mut env);
    let viewer_id = role_id(&mut env, "viewer");
    let catalog = env.catalog.clone();

    let err = delete_role(
        &mut env.persistence,
        &catalog,
        viewer_id,
        &admin,
        create_test_cause(),
        NOW,
    )
    .unwrap_err();

    assert!(matches!(err, ApiError::ProtectedRole { .. }));
}

#[test]
fn test_role_assignment_replaces_set_and_changes_permissions() {
    let mut env = setup();
    let admin = create_admin(&mut env);
    let agent = create_agent(&mut env);
    assert!(!agent.has_permission("tickets.assign"));
    let ops_id = role_id(&mut env, "ops_manager");

    let response = assign_roles_to_user(
        &mut env.persistence,
        agent.user_id,
        &AssignRolesRequest {
            role_ids: vec![ops_id],
        },
        &admin,
        create_test_cause(),
        NOW,
    )
    .unwrap();
    assert_eq!(response.roles, vec![String::from("ops_manager")]);

    let refreshed = reload_user(&mut env, agent.user_id);
    assert!(refreshed.has_permission("tickets.assign"));
    assert!(!refreshed.has_permission("tickets.upload"));
}

#[test]
fn test_role_assignment_with_unknown_role_fails() {
    let mut env = setup();
    let admin = create_admin(&mut env);
    let agent = create_agent(&mut env);

    let err = assign_roles_to_user(
        &mut env.persistence,
        agent.user_id,
        &AssignRolesRequest {
            role_ids: vec![9_999],
        },
        &admin,
        create_test_cause(),
        NOW,
    )
    .unwrap_err();

    assert!(matches!(err, ApiError::ResourceNotFound { .. }));
    assert_eq!(reload_user(&mut env, agent.user_id).roles, vec!["agent"]);
}
