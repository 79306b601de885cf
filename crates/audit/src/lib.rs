// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all
)]

use serde::{Deserialize, Serialize};

/// Represents the entity performing an action.
///
/// Authenticated staff carry their user id; public bookings and start-up
/// seeding do not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// The unique identifier for this actor.
    pub id: String,
    /// The type of actor (`user`, `public` or `system`).
    pub actor_type: String,
    /// The user account behind the actor, when there is one.
    pub user_id: Option<i64>,
}

impl Actor {
    /// Creates a new Actor.
    ///
    /// # Arguments
    ///
    /// * `id` - The unique identifier for this actor
    /// * `actor_type` - The type of actor
    /// * `user_id` - The user account, if any
    #[must_use]
    pub const fn new(id: String, actor_type: String, user_id: Option<i64>) -> Self {
        Self {
            id,
            actor_type,
            user_id,
        }
    }

    /// An authenticated staff user.
    #[must_use]
    pub fn user(user_id: i64, email: &str) -> Self {
        Self::new(email.to_string(), String::from("user"), Some(user_id))
    }

    /// An anonymous customer using the public booking form.
    #[must_use]
    pub fn public() -> Self {
        Self::new(String::from("public"), String::from("public"), None)
    }

    /// The service itself, e.g. during start-up seeding.
    #[must_use]
    pub fn system() -> Self {
        Self::new(String::from("system"), String::from("system"), None)
    }
}

/// Represents the reason or trigger for an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cause {
    /// A unique identifier for this cause (e.g., request ID).
    pub id: String,
    /// A description of the cause.
    pub description: String,
}

impl Cause {
    /// Creates a new Cause.
    ///
    /// # Arguments
    ///
    /// * `id` - The unique identifier for this cause
    /// * `description` - A description of what triggered this action
    #[must_use]
    pub const fn new(id: String, description: String) -> Self {
        Self { id, description }
    }
}

/// Represents the specific action performed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// The name of the action (e.g., "`CONFIRM`", "`ROLE_UPDATE`").
    pub name: String,
    /// Structured details about the action, as a JSON document.
    pub details: Option<String>,
}

impl Action {
    /// Creates a new Action.
    ///
    /// # Arguments
    ///
    /// * `name` - The name of the action
    /// * `details` - Optional JSON details
    #[must_use]
    pub const fn new(name: String, details: Option<String>) -> Self {
        Self { name, details }
    }
}

/// A snapshot of the affected entity at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// A JSON rendering of the entity.
    pub data: String,
}

impl StateSnapshot {
    /// Creates a new `StateSnapshot`.
    #[must_use]
    pub const fn new(data: String) -> Self {
        Self { data }
    }

    /// The snapshot of an entity that did not exist yet or no longer exists.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(String::from("{}"))
    }
}

/// The kind of entity an audit event is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    Ticket,
    Role,
    User,
    Technician,
}

impl SubjectKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ticket => "ticket",
            Self::Role => "role",
            Self::User => "user",
            Self::Technician => "technician",
        }
    }

    /// Parses the stored subject kind.
    #[must_use]
    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "ticket" => Some(Self::Ticket),
            "role" => Some(Self::Role),
            "user" => Some(Self::User),
            "technician" => Some(Self::Technician),
            _ => None,
        }
    }
}

/// The entity an audit event is about.
///
/// The id is `None` only while the entity itself is being created in the
/// same transaction; persistence fills it in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditSubject {
    pub kind: SubjectKind,
    pub id: Option<i64>,
}

impl AuditSubject {
    #[must_use]
    pub const fn new(kind: SubjectKind, id: Option<i64>) -> Self {
        Self { kind, id }
    }

    #[must_use]
    pub const fn ticket(ticket_id: i64) -> Self {
        Self::new(SubjectKind::Ticket, Some(ticket_id))
    }

    #[must_use]
    pub const fn role(role_id: i64) -> Self {
        Self::new(SubjectKind::Role, Some(role_id))
    }
}

/// An immutable audit event representing a state transition.
///
/// Every successful state change must produce exactly one audit event.
/// Audit events are append-only and capture:
/// - What entity changed (subject)
/// - Who performed the action (actor)
/// - Why it was performed (cause)
/// - What action was performed (action)
/// - The state before and after the transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// The database identifier, `None` until persisted.
    pub event_id: Option<i64>,
    /// The entity this event is about.
    pub subject: AuditSubject,
    /// The actor who initiated this state change.
    pub actor: Actor,
    /// The cause or reason for this state change.
    pub cause: Cause,
    /// The action that was performed.
    pub action: Action,
    /// The state before the transition.
    pub before: StateSnapshot,
    /// The state after the transition.
    pub after: StateSnapshot,
    /// When the event was recorded (UTC, second precision).
    pub created_at: String,
}

impl AuditEvent {
    /// Creates a new `AuditEvent`.
    ///
    /// Once created, an audit event is immutable.
    ///
    /// # Arguments
    ///
    /// * `subject` - The entity this event is about
    /// * `actor` - The actor who initiated the change
    /// * `cause` - The reason for the change
    /// * `action` - The action that was performed
    /// * `before` - The state before the transition
    /// * `after` - The state after the transition
    /// * `created_at` - When the change happened
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        subject: AuditSubject,
        actor: Actor,
        cause: Cause,
        action: Action,
        before: StateSnapshot,
        after: StateSnapshot,
        created_at: String,
    ) -> Self {
        Self {
            event_id: None,
            subject,
            actor,
            cause,
            action,
            before,
            after,
            created_at,
        }
    }

    /// Returns a copy of this event attached to `subject_id`.
    #[must_use]
    pub fn with_subject_id(mut self, subject_id: i64) -> Self {
        self.subject.id = Some(subject_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_event() -> AuditEvent {
        AuditEvent::new(
            AuditSubject::ticket(7),
            Actor::user(3, "agent@example.com"),
            Cause::new(String::from("req-456"), String::from("Agent request")),
            Action::new(String::from("CONFIRM"), None),
            StateSnapshot::new(String::from("{\"status\":\"BOOKED\"}")),
            StateSnapshot::new(String::from("{\"status\":\"CONFIRMED\"}")),
            String::from("2026-03-01T10:00:00Z"),
        )
    }

    #[test]
    fn test_actor_constructors() {
        let actor: Actor = Actor::user(3, "agent@example.com");
        assert_eq!(actor.id, "agent@example.com");
        assert_eq!(actor.actor_type, "user");
        assert_eq!(actor.user_id, Some(3));

        assert_eq!(Actor::public().user_id, None);
        assert_eq!(Actor::system().actor_type, "system");
    }

    #[test]
    fn test_new_event_is_unpersisted() {
        let event: AuditEvent = create_test_event();
        assert_eq!(event.event_id, None);
        assert_eq!(event.subject, AuditSubject::ticket(7));
        assert_eq!(event.action.name, "CONFIRM");
    }

    #[test]
    fn test_with_subject_id_fills_pending_subject() {
        let mut event: AuditEvent = create_test_event();
        event.subject = AuditSubject::new(SubjectKind::Ticket, None);
        let event = event.with_subject_id(11);
        assert_eq!(event.subject.id, Some(11));
    }

    #[test]
    fn test_subject_kind_round_trip() {
        for kind in [
            SubjectKind::Ticket,
            SubjectKind::Role,
            SubjectKind::User,
            SubjectKind::Technician,
        ] {
            assert_eq!(SubjectKind::parse_str(kind.as_str()), Some(kind));
        }
        assert_eq!(SubjectKind::parse_str("area"), None);
    }

    #[test]
    fn test_audit_event_equality() {
        assert_eq!(create_test_event(), create_test_event());
        let mut other = create_test_event();
        other.actor = Actor::public();
        assert_ne!(create_test_event(), other);
    }
}
