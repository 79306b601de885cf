// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::command::{RoleCommand, TechnicianUpdate, TicketCommand};
use crate::error::CoreError;
use crate::state::{
    RoleState, RoleTransition, TechnicianTransition, TicketState, TransitionResult, role_snapshot,
    technician_snapshot, ticket_snapshot,
};
use repairdesk_audit::{
    Action, Actor, AuditEvent, AuditSubject, Cause, StateSnapshot, SubjectKind,
};
use repairdesk_domain::{
    DomainError, PermissionCatalog, PermissionDiff, Role, Technician, Ticket, TicketStatus,
    TransitionRejection, ValidatedBooking, validate_role_deletion, validate_role_name,
    validate_role_update, validate_technician_name,
};
use serde_json::{Map, Value, json};
use std::collections::BTreeSet;

/// Creates a `BOOKED` ticket from a validated public booking.
///
/// The audit subject has no id yet; persistence attaches it once the ticket
/// row exists.
///
/// # Arguments
///
/// * `booking` - The validated booking
/// * `actor` - Normally [`Actor::public`]
/// * `cause` - The cause or reason for this action
/// * `now` - The current timestamp
#[must_use]
pub fn apply_booking(
    booking: ValidatedBooking,
    actor: Actor,
    cause: Cause,
    now: &str,
) -> TransitionResult {
    let ticket: Ticket = Ticket::book(booking, now);

    let details = json!({
        "old_status": Value::Null,
        "new_status": ticket.status.as_str(),
        "technician_id": Value::Null,
        "source": "public_booking",
    });

    let audit_event: AuditEvent = AuditEvent::new(
        AuditSubject::new(SubjectKind::Ticket, None),
        actor,
        cause,
        Action::new(String::from("BOOK"), Some(details.to_string())),
        StateSnapshot::empty(),
        ticket_snapshot(&ticket),
        now.to_string(),
    );

    TransitionResult {
        new_ticket: ticket,
        audit_event,
        new_image: None,
    }
}

/// Applies a command to a ticket, producing the new ticket and audit event.
///
/// Checks run in a fixed order: the version precondition first, then the
/// status adjacency table, then command-specific rules. A successful status
/// change bumps the version by one; an upload on an `IN_PROGRESS` ticket
/// leaves the ticket untouched and only appends the image.
///
/// # Arguments
///
/// * `state` - The ticket as read inside the write transaction
/// * `command` - The command to apply
/// * `actor` - The actor performing this action
/// * `cause` - The cause or reason for this action
/// * `now` - The current timestamp
///
/// # Returns
///
/// * `Ok(TransitionResult)` containing the new ticket and audit event
/// * `Err(CoreError)` if the command is invalid
///
/// # Errors
///
/// Returns an error if:
/// - The expected version does not match the stored version
/// - The target status is not reachable from the current status
/// - The technician is not active
/// - The ticket is completed without a receipt
#[allow(clippy::too_many_lines)]
pub fn apply(
    state: &TicketState,
    command: TicketCommand,
    actor: Actor,
    cause: Cause,
    now: &str,
) -> Result<TransitionResult, CoreError> {
    let ticket: &Ticket = &state.ticket;
    let ticket_id: i64 = ticket.ticket_id.unwrap_or_default();

    if let Some(expected) = command.expected_version()
        && expected != ticket.version
    {
        return Err(CoreError::VersionConflict {
            ticket_id,
            expected,
            actual: ticket.version,
        });
    }

    let action_name: &'static str = command.action_name();
    let mut next: Ticket = ticket.clone();
    let mut extra: Map<String, Value> = Map::new();
    let mut new_image = None;

    match command {
        TicketCommand::Confirm { .. } => {
            ticket.status.validate_transition(TicketStatus::Confirmed)?;
            next.status = TicketStatus::Confirmed;
        }
        TicketCommand::Assign {
            technician,
            method,
            note,
            ..
        } => {
            ticket.status.validate_transition(TicketStatus::Assigned)?;
            let Some(technician_id) = technician.technician_id.filter(|_| technician.is_active)
            else {
                return Err(CoreError::DomainViolation(
                    DomainError::TechnicianInactive {
                        technician_id: technician.technician_id.unwrap_or_default(),
                    },
                ));
            };
            next.status = TicketStatus::Assigned;
            next.technician_id = Some(technician_id);
            extra.insert(
                String::from("technician_name"),
                Value::from(technician.name),
            );
            extra.insert(
                String::from("assignment_method"),
                Value::from(method.as_str()),
            );
            if let Some(note) = note {
                extra.insert(String::from("note"), Value::from(note));
            }
        }
        TicketCommand::UploadReceipt { mut image } => {
            match ticket.status {
                TicketStatus::Assigned => next.status = TicketStatus::InProgress,
                TicketStatus::InProgress => {}
                other => {
                    return Err(CoreError::DomainViolation(
                        DomainError::InvalidStatusTransition {
                            from: other,
                            to: TicketStatus::InProgress,
                            rejection: TransitionRejection::NotPermitted,
                        },
                    ));
                }
            }
            image.ticket_id = ticket_id;
            extra.insert(
                String::from("image_type"),
                Value::from(image.image_type.as_str()),
            );
            extra.insert(
                String::from("file_name"),
                Value::from(image.file_name.clone()),
            );
            extra.insert(
                String::from("checksum_sha256"),
                Value::from(image.checksum_sha256.clone()),
            );
            new_image = Some(image);
        }
        TicketCommand::Complete { .. } => {
            ticket.status.validate_transition(TicketStatus::Completed)?;
            if state.receipt_count == 0 {
                return Err(CoreError::DomainViolation(
                    DomainError::InvalidStatusTransition {
                        from: ticket.status,
                        to: TicketStatus::Completed,
                        rejection: TransitionRejection::ReceiptMissing,
                    },
                ));
            }
            next.status = TicketStatus::Completed;
            next.completed_at = Some(now.to_string());
            extra.insert(
                String::from("receipt_count"),
                Value::from(state.receipt_count),
            );
        }
        TicketCommand::Cancel { reason, .. } => {
            ticket.status.validate_transition(TicketStatus::Canceled)?;
            next.status = TicketStatus::Canceled;
            next.technician_id = None;
            if let Some(previous) = ticket.technician_id {
                extra.insert(
                    String::from("previous_technician_id"),
                    Value::from(previous),
                );
            }
            if let Some(reason) = reason {
                extra.insert(String::from("reason"), Value::from(reason));
            }
        }
    }

    if next.status != ticket.status {
        next.version += 1;
        next.updated_at = now.to_string();
    }

    let mut details: Map<String, Value> = Map::new();
    details.insert(
        String::from("old_status"),
        Value::from(ticket.status.as_str()),
    );
    details.insert(
        String::from("new_status"),
        Value::from(next.status.as_str()),
    );
    details.insert(
        String::from("technician_id"),
        next.technician_id.map_or(Value::Null, Value::from),
    );
    details.extend(extra);

    let audit_event: AuditEvent = AuditEvent::new(
        AuditSubject::ticket(ticket_id),
        actor,
        cause,
        Action::new(
            action_name.to_string(),
            Some(Value::Object(details).to_string()),
        ),
        state.to_snapshot(),
        ticket_snapshot(&next),
        now.to_string(),
    );

    Ok(TransitionResult {
        new_ticket: next,
        audit_event,
        new_image,
    })
}

/// Creates a new custom role.
///
/// # Errors
///
/// Returns an error if the name is invalid or any permission code is unknown.
pub fn apply_role_creation(
    name: &str,
    description: &str,
    permissions: &[String],
    catalog: &PermissionCatalog,
    actor: Actor,
    cause: Cause,
    now: &str,
) -> Result<RoleTransition, CoreError> {
    let name: String = validate_role_name(name)?;
    let permissions: BTreeSet<String> = catalog.validate_codes(permissions)?;
    let role: Role = Role::new(name, description.trim().to_string(), permissions);

    let details = json!({
        "name": role.name,
        "permissions": role.permissions,
    });

    let audit_event: AuditEvent = AuditEvent::new(
        AuditSubject::new(SubjectKind::Role, None),
        actor,
        cause,
        Action::new(String::from("ROLE_CREATE"), Some(details.to_string())),
        StateSnapshot::empty(),
        role_snapshot(&role),
        now.to_string(),
    );

    Ok(RoleTransition {
        new_role: Some(role),
        audit_event,
    })
}

/// Applies an update or deletion to an existing role.
///
/// # Arguments
///
/// * `state` - The role and its current user count
/// * `command` - The change to apply
/// * `catalog` - The permission catalog
/// * `actor` - The actor performing this action
/// * `cause` - The cause or reason for this action
/// * `now` - The current timestamp
///
/// # Errors
///
/// Returns an error if:
/// - A system role would be renamed, stripped of core permissions or deleted
/// - A role still held by users would be deleted
/// - The new name or any permission code is invalid
pub fn apply_role(
    state: &RoleState,
    command: RoleCommand,
    catalog: &PermissionCatalog,
    actor: Actor,
    cause: Cause,
    now: &str,
) -> Result<RoleTransition, CoreError> {
    let role: &Role = &state.role;
    let subject: AuditSubject = AuditSubject::role(role.role_id.unwrap_or_default());

    match command {
        RoleCommand::Update {
            name,
            description,
            permissions,
        } => {
            let new_name: Option<String> = name.as_deref().map(validate_role_name).transpose()?;
            let new_permissions: Option<BTreeSet<String>> = permissions
                .as_deref()
                .map(|codes| catalog.validate_codes(codes))
                .transpose()?;

            validate_role_update(
                role,
                new_name.as_deref(),
                new_permissions.as_ref(),
                catalog,
            )?;

            let mut updated: Role = role.clone();
            if let Some(name) = new_name {
                updated.name = name;
            }
            if let Some(description) = description {
                updated.description = description.trim().to_string();
            }
            if let Some(permissions) = new_permissions {
                updated.permissions = permissions;
            }

            let diff: PermissionDiff =
                PermissionDiff::between(&role.permissions, &updated.permissions);
            let mut details = json!({
                "role_id": role.role_id,
                "name": updated.name,
                "permissions_added": diff.added,
                "permissions_removed": diff.removed,
            });
            if updated.name != role.name {
                details["renamed_from"] = Value::from(role.name.clone());
            }

            let audit_event: AuditEvent = AuditEvent::new(
                subject,
                actor,
                cause,
                Action::new(String::from("ROLE_UPDATE"), Some(details.to_string())),
                role_snapshot(role),
                role_snapshot(&updated),
                now.to_string(),
            );

            Ok(RoleTransition {
                new_role: Some(updated),
                audit_event,
            })
        }
        RoleCommand::Delete => {
            validate_role_deletion(role, state.user_count)?;

            let details = json!({
                "role_id": role.role_id,
                "name": role.name,
            });

            let audit_event: AuditEvent = AuditEvent::new(
                subject,
                actor,
                cause,
                Action::new(String::from("ROLE_DELETE"), Some(details.to_string())),
                role_snapshot(role),
                StateSnapshot::empty(),
                now.to_string(),
            );

            Ok(RoleTransition {
                new_role: None,
                audit_event,
            })
        }
    }
}

/// Records the replacement of a user's role set.
///
/// Role membership has no state machine of its own; the caller resolves and
/// validates the role ids before calling this.
#[must_use]
pub fn apply_user_roles(
    user_id: i64,
    before: &BTreeSet<String>,
    after: &BTreeSet<String>,
    actor: Actor,
    cause: Cause,
    now: &str,
) -> AuditEvent {
    let added: Vec<&String> = after.difference(before).collect();
    let removed: Vec<&String> = before.difference(after).collect();
    let details = json!({
        "user_id": user_id,
        "roles_added": added,
        "roles_removed": removed,
    });

    AuditEvent::new(
        AuditSubject::new(SubjectKind::User, Some(user_id)),
        actor,
        cause,
        Action::new(String::from("USER_ROLES_ASSIGN"), Some(details.to_string())),
        StateSnapshot::new(json!({ "roles": before }).to_string()),
        StateSnapshot::new(json!({ "roles": after }).to_string()),
        now.to_string(),
    )
}

/// Registers a new active technician.
///
/// # Errors
///
/// Returns an error if the name is invalid.
pub fn apply_technician_creation(
    name: &str,
    center_id: Option<String>,
    actor: Actor,
    cause: Cause,
    now: &str,
) -> Result<TechnicianTransition, CoreError> {
    let technician: Technician = Technician::new(name, center_id)?;

    let audit_event: AuditEvent = AuditEvent::new(
        AuditSubject::new(SubjectKind::Technician, None),
        actor,
        cause,
        Action::new(String::from("TECHNICIAN_CREATE"), None),
        StateSnapshot::empty(),
        technician_snapshot(&technician),
        now.to_string(),
    );

    Ok(TechnicianTransition {
        new_technician: technician,
        audit_event,
    })
}

/// Applies field changes to an existing technician.
///
/// Deactivating a technician does not touch tickets already assigned to them;
/// it only removes them from future selection.
///
/// # Errors
///
/// Returns an error if the new name is invalid.
pub fn apply_technician_update(
    current: &Technician,
    update: TechnicianUpdate,
    actor: Actor,
    cause: Cause,
    now: &str,
) -> Result<TechnicianTransition, CoreError> {
    let mut updated: Technician = current.clone();
    if let Some(name) = update.name {
        updated.name = validate_technician_name(&name)?;
    }
    if update.clear_center {
        updated.center_id = None;
    } else if let Some(center_id) = update.center_id {
        let trimmed = center_id.trim();
        updated.center_id = (!trimmed.is_empty()).then(|| trimmed.to_string());
    }
    if let Some(is_active) = update.is_active {
        updated.is_active = is_active;
    }

    let audit_event: AuditEvent = AuditEvent::new(
        AuditSubject::new(SubjectKind::Technician, current.technician_id),
        actor,
        cause,
        Action::new(String::from("TECHNICIAN_UPDATE"), None),
        technician_snapshot(current),
        technician_snapshot(&updated),
        now.to_string(),
    );

    Ok(TechnicianTransition {
        new_technician: updated,
        audit_event,
    })
}
