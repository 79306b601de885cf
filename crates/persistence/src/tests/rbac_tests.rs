// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use std::collections::BTreeSet;

use super::{NOW, create_test_actor, create_test_cause, setup};
use crate::{PersistenceError, TransitionError};
use repairdesk::{CoreError, RoleCommand, apply_role, apply_role_creation, apply_user_roles};
use repairdesk_domain::{DomainError, PermissionCatalog, Role};

fn create_role(
    persistence: &mut crate::Persistence,
    user_id: i64,
    name: &str,
    codes: &[&str],
) -> Result<(Role, i64), PersistenceError> {
    let codes: Vec<String> = codes.iter().map(|c| (*c).to_string()).collect();
    let transition = apply_role_creation(
        name,
        "Custom role",
        &codes,
        &PermissionCatalog::standard(),
        create_test_actor(user_id),
        create_test_cause(),
        NOW,
    )
    .unwrap();
    persistence.persist_role_creation(&transition, NOW)
}

#[test]
fn test_create_role_stores_permissions_and_event() {
    let (mut persistence, user_id) = setup();
    let (role, event_id) =
        create_role(&mut persistence, user_id, "dispatcher", &["tickets.read", "tickets.assign"])
            .unwrap();

    let role_id = role.role_id.unwrap();
    let state = persistence.get_role_state(role_id).unwrap();
    assert_eq!(state.role.permissions.len(), 2);
    assert_eq!(state.user_count, 0);
    assert!(!state.role.is_system);

    let event = persistence.get_audit_event(event_id).unwrap();
    assert_eq!(event.action.name, "ROLE_CREATE");
    assert_eq!(event.subject.id, Some(role_id));
}

#[test]
fn test_duplicate_role_name_conflicts() {
    let (mut persistence, user_id) = setup();
    create_role(&mut persistence, user_id, "dispatcher", &["tickets.read"]).unwrap();
    let result = create_role(&mut persistence, user_id, "dispatcher", &["tickets.read"]);
    assert!(matches!(result, Err(PersistenceError::Conflict(_))));

    let system = create_role(&mut persistence, user_id, "viewer", &["tickets.read"]);
    assert!(matches!(system, Err(PersistenceError::Conflict(_))));
}

#[test]
fn test_update_role_replaces_permissions() {
    let catalog = PermissionCatalog::standard();
    let (mut persistence, user_id) = setup();
    let (role, _) =
        create_role(&mut persistence, user_id, "dispatcher", &["tickets.read"]).unwrap();
    let role_id = role.role_id.unwrap();

    let (updated, event_id) = persistence
        .run_role_transition(role_id, |state| {
            apply_role(
                state,
                RoleCommand::Update {
                    name: Some(String::from("dispatch_lead")),
                    description: None,
                    permissions: Some(vec![
                        String::from("tickets.read"),
                        String::from("tickets.assign"),
                    ]),
                },
                &catalog,
                create_test_actor(user_id),
                create_test_cause(),
                NOW,
            )
        })
        .unwrap();
    assert_eq!(updated.unwrap().name, "dispatch_lead");

    let stored = persistence.get_role_state(role_id).unwrap().role;
    let expected: BTreeSet<String> = ["tickets.assign", "tickets.read"]
        .iter()
        .map(|c| (*c).to_string())
        .collect();
    assert_eq!(stored.permissions, expected);
    assert_eq!(stored.name, "dispatch_lead");

    let event = persistence.get_audit_event(event_id).unwrap();
    let details: serde_json::Value =
        serde_json::from_str(event.action.details.as_deref().unwrap()).unwrap();
    assert_eq!(details["permissions_added"], serde_json::json!(["tickets.assign"]));
    assert_eq!(details["renamed_from"], "dispatcher");
}

#[test]
fn test_system_role_protection_is_enforced_in_transaction() {
    let catalog = PermissionCatalog::standard();
    let (mut persistence, user_id) = setup();
    let viewer = persistence.get_role_by_name("viewer").unwrap().unwrap();
    let viewer_id = viewer.role_id.unwrap();

    let result = persistence.run_role_transition(viewer_id, |state| {
        apply_role(
            state,
            RoleCommand::Update {
                name: None,
                description: None,
                permissions: Some(vec![]),
            },
            &catalog,
            create_test_actor(user_id),
            create_test_cause(),
            NOW,
        )
    });
    assert!(matches!(
        result,
        Err(TransitionError::Rejected(CoreError::DomainViolation(
            DomainError::ProtectedRole { .. }
        )))
    ));
    assert_eq!(
        persistence.get_role_state(viewer_id).unwrap().role.permissions,
        viewer.permissions
    );
}

#[test]
fn test_delete_role_in_use_then_free() {
    let catalog = PermissionCatalog::standard();
    let (mut persistence, user_id) = setup();
    let (role, _) =
        create_role(&mut persistence, user_id, "dispatcher", &["tickets.read"]).unwrap();
    let role_id = role.role_id.unwrap();

    persistence
        .replace_user_roles(user_id, &[role_id], |before, after| {
            apply_user_roles(
                user_id,
                before,
                after,
                create_test_actor(user_id),
                create_test_cause(),
                NOW,
            )
        })
        .unwrap();

    let delete = |persistence: &mut crate::Persistence| {
        persistence.run_role_transition(role_id, |state| {
            apply_role(
                state,
                RoleCommand::Delete,
                &catalog,
                create_test_actor(user_id),
                create_test_cause(),
                NOW,
            )
        })
    };

    let in_use = delete(&mut persistence);
    assert!(matches!(
        in_use,
        Err(TransitionError::Rejected(CoreError::DomainViolation(
            DomainError::RoleInUse { user_count: 1, .. }
        )))
    ));

    persistence
        .replace_user_roles(user_id, &[], |before, after| {
            apply_user_roles(
                user_id,
                before,
                after,
                create_test_actor(user_id),
                create_test_cause(),
                NOW,
            )
        })
        .unwrap();

    let (deleted, event_id) = delete(&mut persistence).unwrap();
    assert_eq!(deleted, None);
    assert!(matches!(
        persistence.get_role_state(role_id),
        Err(PersistenceError::NotFound(_))
    ));
    assert_eq!(
        persistence.get_audit_event(event_id).unwrap().action.name,
        "ROLE_DELETE"
    );
}

#[test]
fn test_replace_user_roles_records_diff() {
    let (mut persistence, user_id) = setup();
    let agent = persistence.get_role_by_name("agent").unwrap().unwrap();
    let viewer = persistence.get_role_by_name("viewer").unwrap().unwrap();

    let event_id = persistence
        .replace_user_roles(
            user_id,
            &[agent.role_id.unwrap(), viewer.role_id.unwrap(), agent.role_id.unwrap()],
            |before, after| {
                apply_user_roles(
                    user_id,
                    before,
                    after,
                    create_test_actor(user_id),
                    create_test_cause(),
                    NOW,
                )
            },
        )
        .unwrap();

    let names: Vec<String> = persistence
        .user_roles(user_id)
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&String::from("agent")));

    let event = persistence.get_audit_event(event_id).unwrap();
    assert_eq!(event.action.name, "USER_ROLES_ASSIGN");

    let summaries = persistence.list_roles().unwrap();
    let agent_summary = summaries
        .iter()
        .find(|s| s.role.name == "agent")
        .unwrap();
    assert_eq!(agent_summary.user_count, 1);
}

#[test]
fn test_replace_user_roles_rejects_unknown_ids() {
    let (mut persistence, user_id) = setup();
    let result = persistence.replace_user_roles(user_id, &[9999], |before, after| {
        apply_user_roles(
            user_id,
            before,
            after,
            create_test_actor(user_id),
            create_test_cause(),
            NOW,
        )
    });
    assert!(matches!(result, Err(PersistenceError::NotFound(_))));
    assert!(persistence.user_roles(user_id).unwrap().is_empty());
}
