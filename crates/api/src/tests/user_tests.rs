// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use super::helpers::{
    NOW, STRONG_PASSWORD, TestEnv, create_admin, create_agent, create_test_cause, setup,
};
use crate::{
    ApiError, AuthenticatedUser, CreateUserRequest, LoginRequest, SetUserActiveRequest, UserInfo,
    create_user, list_users, login, set_user_active,
};

fn new_user(
    env: &mut TestEnv,
    admin: &AuthenticatedUser,
    email: &str,
    password: &str,
    role_ids: Vec<i64>,
) -> Result<UserInfo, ApiError> {
    let config = env.config.clone();
    create_user(
        &mut env.persistence,
        &config,
        &CreateUserRequest {
            email: email.to_string(),
            display_name: String::from("Grace Hopper"),
            password: password.to_string(),
            role_ids,
        },
        admin,
        create_test_cause(),
        NOW,
    )
}

#[test]
fn test_create_user_with_roles() {
    let mut env = setup();
    let admin = create_admin(&mut env);
    let viewer_id = env
        .persistence
        .get_role_by_name("viewer")
        .unwrap()
        .and_then(|r| r.role_id)
        .unwrap();

    let created = new_user(
        &mut env,
        &admin,
        "  Grace@Example.com ",
        STRONG_PASSWORD,
        vec![viewer_id],
    )
    .unwrap();

    assert_eq!(created.email, "grace@example.com");
    assert!(created.is_active);
    assert_eq!(created.roles, vec![String::from("viewer")]);
    assert_eq!(created.last_login_at, None);
}

#[test]
fn test_weak_password_is_rejected() {
    let mut env = setup();
    let admin = create_admin(&mut env);

    let err = new_user(&mut env, &admin, "grace@example.com", "password", vec![]).unwrap_err();

    assert!(matches!(err, ApiError::PasswordPolicyViolation { .. }));
    assert!(
        env.persistence
            .get_user_by_email("grace@example.com")
            .unwrap()
            .is_none()
    );
}

#[test]
fn test_duplicate_email_is_a_conflict() {
    let mut env = setup();
    let admin = create_admin(&mut env);
    new_user(&mut env, &admin, "grace@example.com", STRONG_PASSWORD, vec![]).unwrap();

    let err = new_user(&mut env, &admin, "GRACE@example.com", STRONG_PASSWORD, vec![]).unwrap_err();

    assert!(matches!(err, ApiError::Conflict { .. }));
}

#[test]
fn test_invalid_email_is_rejected() {
    let mut env = setup();
    let admin = create_admin(&mut env);

    let err = new_user(&mut env, &admin, "not-an-email", STRONG_PASSWORD, vec![]).unwrap_err();

    assert!(matches!(err, ApiError::InvalidInput { ref field, .. } if field == "email"));
}

#[test]
fn test_agent_cannot_create_users() {
    let mut env = setup();
    let agent = create_agent(&mut env);

    let err = new_user(&mut env, &agent, "grace@example.com", STRONG_PASSWORD, vec![]).unwrap_err();

    assert_eq!(
        err,
        ApiError::PermissionDenied {
            missing: vec![String::from("users.write")]
        }
    );
}

#[test]
fn test_list_users_includes_roles() {
    let mut env = setup();
    let admin = create_admin(&mut env);
    create_agent(&mut env);

    let response = list_users(&mut env.persistence, &admin).unwrap();

    assert_eq!(response.users.len(), 2);
    let agent = response
        .users
        .iter()
        .find(|u| u.email == "agent@example.com")
        .unwrap();
    assert_eq!(agent.roles, vec![String::from("agent")]);
}

#[test]
fn test_cannot_deactivate_self() {
    let mut env = setup();
    let admin = create_admin(&mut env);

    let err = set_user_active(
        &mut env.persistence,
        admin.user_id,
        SetUserActiveRequest { is_active: false },
        &admin,
    )
    .unwrap_err();

    assert!(matches!(err, ApiError::DomainRuleViolation { .. }));
}

#[test]
fn test_deactivated_user_cannot_log_in() {
    let mut env = setup();
    let admin = create_admin(&mut env);
    let agent = create_agent(&mut env);

    let info = set_user_active(
        &mut env.persistence,
        agent.user_id,
        SetUserActiveRequest { is_active: false },
        &admin,
    )
    .unwrap();
    assert!(!info.is_active);

    let config = env.config.clone();
    let err = login(
        &mut env.persistence,
        &config,
        &LoginRequest {
            email: String::from("agent@example.com"),
            password: String::from(STRONG_PASSWORD),
        },
        NOW,
    )
    .unwrap_err();

    assert!(matches!(err, ApiError::AuthenticationFailed { .. }));
}

#[test]
fn test_set_active_on_missing_user_is_not_found() {
    let mut env = setup();
    let admin = create_admin(&mut env);

    let err = set_user_active(
        &mut env.persistence,
        555,
        SetUserActiveRequest { is_active: true },
        &admin,
    )
    .unwrap_err();

    assert!(
        matches!(err, ApiError::ResourceNotFound { ref resource_type, .. } if resource_type == "User")
    );
}
