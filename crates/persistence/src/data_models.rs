// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use repairdesk_audit::SubjectKind;
use repairdesk_domain::{Role, TicketStatus};
use serde::{Deserialize, Serialize};
use time::Date;

/// Default number of rows per page.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Upper bound on rows per page.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Serializable representation of an Actor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorData {
    pub id: String,
    pub actor_type: String,
    #[serde(default)]
    pub user_id: Option<i64>,
}

/// Serializable representation of a Cause.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CauseData {
    pub id: String,
    pub description: String,
}

/// Serializable representation of an Action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionData {
    pub name: String,
    pub details: Option<String>,
}

/// Serializable representation of a `StateSnapshot`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshotData {
    pub data: String,
}

/// A staff account as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserData {
    pub user_id: i64,
    pub email: String,
    pub display_name: String,
    pub password_hash: String,
    pub is_active: bool,
    pub created_at: String,
    pub last_login_at: Option<String>,
}

/// A login session as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionData {
    pub session_id: i64,
    pub session_token: String,
    pub user_id: i64,
    pub created_at: String,
    pub last_activity_at: String,
    pub expires_at: String,
}

/// A role together with how many users hold it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSummary {
    pub role: Role,
    pub user_count: i64,
}

/// Which page of a listing to return. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Builds a page request, clamping out-of-range values.
    #[must_use]
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    #[must_use]
    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.page_size)
    }
}

/// One page of a listing plus the total row count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total: i64,
}

impl<T> Page<T> {
    /// Number of pages needed for `total` rows. Zero when there are no rows.
    #[must_use]
    pub fn total_pages(&self) -> i64 {
        let size = i64::from(self.page_size.max(1));
        (self.total + size - 1) / size
    }
}

/// Ticket listing filters. Unset fields do not constrain the result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketFilter {
    pub status: Option<TicketStatus>,
    pub technician_id: Option<i64>,
    pub center_id: Option<String>,
    /// Inclusive lower bound on the appointment date.
    pub date_from: Option<Date>,
    /// Inclusive upper bound on the appointment date.
    pub date_to: Option<Date>,
    /// Substring matched against customer name, address and issue.
    pub search: Option<String>,
}

/// Audit event listing filters. Unset fields do not constrain the result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditEventFilter {
    pub subject_kind: Option<SubjectKind>,
    pub subject_id: Option<i64>,
    pub actor_user_id: Option<i64>,
    pub action: Option<String>,
    /// Inclusive lower bound on `created_at`.
    pub from: Option<String>,
    /// Inclusive upper bound on `created_at`.
    pub to: Option<String>,
}

impl AuditEventFilter {
    /// Events about a single ticket.
    #[must_use]
    pub fn for_ticket(ticket_id: i64) -> Self {
        Self {
            subject_kind: Some(SubjectKind::Ticket),
            subject_id: Some(ticket_id),
            ..Self::default()
        }
    }
}
