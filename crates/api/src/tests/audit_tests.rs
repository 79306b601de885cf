// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use super::helpers::{assigned_ticket, book, confirm, create_admin, create_agent, setup};
use crate::{ApiError, ListAuditEventsRequest, get_audit_event, list_audit_events};

#[test]
fn test_ticket_shorthand_filters_timeline() {
    let mut env = setup();
    let admin = create_admin(&mut env);
    let (ticket_id, _, _) = assigned_ticket(&mut env, &admin);
    book(&mut env, "Someone Else", None);

    let response = list_audit_events(
        &mut env.persistence,
        &ListAuditEventsRequest {
            ticket_id: Some(ticket_id),
            ..ListAuditEventsRequest::default()
        },
        &admin,
    )
    .unwrap();

    let actions: Vec<&str> = response.items.iter().map(|e| e.action.as_str()).collect();
    assert_eq!(actions, vec!["ASSIGN", "CONFIRM", "BOOK"]);
    assert!(
        response
            .items
            .iter()
            .all(|e| e.subject_type == "ticket" && e.subject_id == Some(ticket_id))
    );
    assert_eq!(response.page.total, 3);
}

#[test]
fn test_filter_by_actor_and_action() {
    let mut env = setup();
    let admin = create_admin(&mut env);
    let agent = create_agent(&mut env);
    let first = book(&mut env, "Ada", None);
    let second = book(&mut env, "Grace", None);
    confirm(&mut env, &admin, first, 0);
    confirm(&mut env, &agent, second, 0);

    let response = list_audit_events(
        &mut env.persistence,
        &ListAuditEventsRequest {
            actor_user_id: Some(agent.user_id),
            action: Some(String::from("confirm")),
            ..ListAuditEventsRequest::default()
        },
        &admin,
    )
    .unwrap();

    assert_eq!(response.items.len(), 1);
    assert_eq!(response.items[0].subject_id, Some(second));
}

#[test]
fn test_filter_by_subject_type() {
    let mut env = setup();
    let admin = create_admin(&mut env);
    assigned_ticket(&mut env, &admin);

    let response = list_audit_events(
        &mut env.persistence,
        &ListAuditEventsRequest {
            subject_type: Some(String::from("Technician")),
            ..ListAuditEventsRequest::default()
        },
        &admin,
    )
    .unwrap();

    assert_eq!(response.items.len(), 1);
    assert_eq!(response.items[0].action, "TECHNICIAN_CREATE");
}

#[test]
fn test_unknown_subject_type_is_rejected() {
    let mut env = setup();
    let admin = create_admin(&mut env);

    let err = list_audit_events(
        &mut env.persistence,
        &ListAuditEventsRequest {
            subject_type: Some(String::from("invoice")),
            ..ListAuditEventsRequest::default()
        },
        &admin,
    )
    .unwrap_err();

    assert!(matches!(err, ApiError::InvalidInput { ref field, .. } if field == "subject_type"));
}

#[test]
fn test_malformed_time_bound_is_rejected() {
    let mut env = setup();
    let admin = create_admin(&mut env);

    let err = list_audit_events(
        &mut env.persistence,
        &ListAuditEventsRequest {
            from: Some(String::from("yesterday")),
            ..ListAuditEventsRequest::default()
        },
        &admin,
    )
    .unwrap_err();

    assert!(matches!(err, ApiError::InvalidInput { ref field, .. } if field == "from"));
}

#[test]
fn test_time_window_excludes_later_events() {
    let mut env = setup();
    let admin = create_admin(&mut env);
    book(&mut env, "Ada", None);

    let response = list_audit_events(
        &mut env.persistence,
        &ListAuditEventsRequest {
            to: Some(String::from("2026-03-01T23:59:59Z")),
            ..ListAuditEventsRequest::default()
        },
        &admin,
    )
    .unwrap();

    assert!(response.items.iter().all(|e| e.action != "BOOK"));
}

#[test]
fn test_agent_cannot_read_audit() {
    let mut env = setup();
    let agent = create_agent(&mut env);

    let err = list_audit_events(
        &mut env.persistence,
        &ListAuditEventsRequest::default(),
        &agent,
    )
    .unwrap_err();

    assert_eq!(
        err,
        ApiError::PermissionDenied {
            missing: vec![String::from("audit.read")]
        }
    );
}

#[test]
fn test_get_single_event() {
    let mut env = setup();
    let admin = create_admin(&mut env);
    let ticket_id = book(&mut env, "Ada", None);
    let write = confirm(&mut env, &admin, ticket_id, 0);

    let event = get_audit_event(&mut env.persistence, write.event_id, &admin).unwrap();
    assert_eq!(event.action, "CONFIRM");
    assert_eq!(event.actor_user_id, Some(admin.user_id));
    assert!(event.before.contains("BOOKED"));
    assert!(event.after.contains("CONFIRMED"));

    let missing = get_audit_event(&mut env.persistence, 10_000, &admin).unwrap_err();
    assert!(
        matches!(missing, ApiError::ResourceNotFound { ref resource_type, .. } if resource_type == "Audit event")
    );
}
