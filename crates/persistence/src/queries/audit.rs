// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Audit event queries.

use diesel::prelude::*;
use diesel::sqlite::Sqlite;
use diesel::SqliteConnection;
use repairdesk_audit::{
    Action, Actor, AuditEvent, AuditSubject, Cause, StateSnapshot, SubjectKind,
};

use crate::data_models::{
    ActionData, ActorData, AuditEventFilter, CauseData, Page, PageRequest, StateSnapshotData,
};
use crate::diesel_schema::audit_events;
use crate::error::PersistenceError;

/// Diesel Queryable struct for audit event rows.
#[derive(Queryable, Selectable)]
#[diesel(table_name = audit_events)]
struct AuditEventRow {
    event_id: i64,
    subject_type: String,
    subject_id: Option<i64>,
    #[allow(dead_code)]
    action: String,
    #[allow(dead_code)]
    actor_user_id: Option<i64>,
    actor_json: String,
    cause_json: String,
    action_json: String,
    before_snapshot_json: String,
    after_snapshot_json: String,
    created_at: String,
}

impl AuditEventRow {
    fn into_event(self) -> Result<AuditEvent, PersistenceError> {
        let kind: SubjectKind = SubjectKind::parse_str(&self.subject_type).ok_or_else(|| {
            PersistenceError::ReconstructionError(format!(
                "Unknown audit subject type: {}",
                self.subject_type
            ))
        })?;

        let actor_data: ActorData = serde_json::from_str(&self.actor_json)?;
        let cause_data: CauseData = serde_json::from_str(&self.cause_json)?;
        let action_data: ActionData = serde_json::from_str(&self.action_json)?;
        let before_data: StateSnapshotData = serde_json::from_str(&self.before_snapshot_json)?;
        let after_data: StateSnapshotData = serde_json::from_str(&self.after_snapshot_json)?;

        let mut event: AuditEvent = AuditEvent::new(
            AuditSubject::new(kind, self.subject_id),
            Actor::new(actor_data.id, actor_data.actor_type, actor_data.user_id),
            Cause::new(cause_data.id, cause_data.description),
            Action::new(action_data.name, action_data.details),
            StateSnapshot::new(before_data.data),
            StateSnapshot::new(after_data.data),
            self.created_at,
        );
        event.event_id = Some(self.event_id);
        Ok(event)
    }
}

/// Retrieves an audit event by ID.
///
/// # Errors
///
/// Returns `PersistenceError::EventNotFound` if no such event exists, or an
/// error if the stored event cannot be deserialized.
pub fn get_audit_event(
    conn: &mut SqliteConnection,
    event_id: i64,
) -> Result<AuditEvent, PersistenceError> {
    let result = audit_events::table
        .filter(audit_events::event_id.eq(event_id))
        .select(AuditEventRow::as_select())
        .first::<AuditEventRow>(conn);

    match result {
        Ok(row) => row.into_event(),
        Err(diesel::result::Error::NotFound) => Err(PersistenceError::EventNotFound(event_id)),
        Err(e) => Err(PersistenceError::from(e)),
    }
}

fn filtered(filter: &AuditEventFilter) -> audit_events::BoxedQuery<'_, Sqlite> {
    let mut query = audit_events::table.into_boxed();
    if let Some(kind) = filter.subject_kind {
        query = query.filter(audit_events::subject_type.eq(kind.as_str()));
    }
    if let Some(subject_id) = filter.subject_id {
        query = query.filter(audit_events::subject_id.eq(subject_id));
    }
    if let Some(actor_user_id) = filter.actor_user_id {
        query = query.filter(audit_events::actor_user_id.eq(actor_user_id));
    }
    if let Some(action) = filter.action.as_deref() {
        query = query.filter(audit_events::action.eq(action));
    }
    if let Some(from) = filter.from.as_deref() {
        query = query.filter(audit_events::created_at.ge(from));
    }
    if let Some(to) = filter.to.as_deref() {
        query = query.filter(audit_events::created_at.le(to));
    }
    query
}

/// Lists audit events matching `filter`, newest first.
///
/// # Errors
///
/// Returns an error if the query fails or a stored event cannot be deserialized.
pub fn list_audit_events(
    conn: &mut SqliteConnection,
    filter: &AuditEventFilter,
    page: PageRequest,
) -> Result<Page<AuditEvent>, PersistenceError> {
    let total: i64 = filtered(filter).count().get_result(conn)?;

    let rows: Vec<AuditEventRow> = filtered(filter)
        .select(AuditEventRow::as_select())
        .order((audit_events::created_at.desc(), audit_events::event_id.desc()))
        .limit(page.limit())
        .offset(page.offset())
        .load(conn)?;

    let items: Vec<AuditEvent> = rows
        .into_iter()
        .map(AuditEventRow::into_event)
        .collect::<Result<_, _>>()?;

    Ok(Page {
        items,
        page: page.page,
        page_size: page.page_size,
        total,
    })
}

/// Returns the full timeline of a subject in the order events were written.
///
/// # Errors
///
/// Returns an error if the query fails or a stored event cannot be deserialized.
pub fn subject_timeline(
    conn: &mut SqliteConnection,
    kind: SubjectKind,
    subject_id: i64,
) -> Result<Vec<AuditEvent>, PersistenceError> {
    let rows: Vec<AuditEventRow> = audit_events::table
        .filter(audit_events::subject_type.eq(kind.as_str()))
        .filter(audit_events::subject_id.eq(subject_id))
        .order(audit_events::event_id.asc())
        .select(AuditEventRow::as_select())
        .load(conn)?;

    rows.into_iter().map(AuditEventRow::into_event).collect()
}
