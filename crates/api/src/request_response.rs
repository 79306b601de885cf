// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Request and response types for the API boundary.
//!
//! These are the shapes the server exchanges as JSON. Domain values are
//! flattened to strings and plain numbers here.

use repairdesk_audit::AuditEvent;
use repairdesk_domain::{Permission, Technician, Ticket, TicketImage, format_date};
use repairdesk_persistence::{Page, UserData};
use serde::{Deserialize, Serialize};

// ========================================================================
// Authentication
// ========================================================================

/// Request to open a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    /// The login email.
    pub email: String,
    /// The plain text password.
    pub password: String,
}

/// Response to a successful login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    /// The bearer token.
    pub session_token: String,
    /// When the token stops being accepted.
    pub expires_at: String,
    /// The logged-in user.
    pub user: WhoAmIResponse,
}

/// The caller's identity and effective permissions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhoAmIResponse {
    /// The user ID.
    pub user_id: i64,
    /// The email.
    pub email: String,
    /// The display name.
    pub display_name: String,
    /// Held role names.
    pub roles: Vec<String>,
    /// Effective permission codes, sorted.
    pub permissions: Vec<String>,
}

// ========================================================================
// Tickets
// ========================================================================

/// Public booking form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitBookingRequest {
    /// Customer name.
    pub customer_name: String,
    /// Raw phone number. Only its hash is stored.
    pub customer_phone: String,
    /// Service address.
    pub address: String,
    /// Appointment date, `YYYY-MM-DD`.
    pub appointment_date: String,
    /// Appointment time, `HH:MM`.
    pub appointment_time_slot: String,
    /// What is wrong.
    pub issue_description: String,
    /// Service center, if the customer picked one.
    #[serde(default)]
    pub center_id: Option<String>,
}

/// Response to a public booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitBookingResponse {
    /// The new ticket ID.
    pub ticket_id: i64,
    /// The customer-facing reference, e.g. `TK00000042`.
    pub booking_reference: String,
    /// The ticket status, always `BOOKED`.
    pub status: String,
    /// The `BOOK` event ID.
    pub event_id: i64,
}

/// A change guarded only by the caller's version.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VersionedRequest {
    /// The version the caller last saw.
    pub expected_version: i64,
}

/// Request to assign a confirmed ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignTicketRequest {
    /// The version the caller last saw.
    pub expected_version: i64,
    /// The technician to assign. Picked by load when absent.
    #[serde(default)]
    pub technician_id: Option<i64>,
    /// Optional operator note.
    #[serde(default)]
    pub note: Option<String>,
}

/// Request to cancel a ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelTicketRequest {
    /// The version the caller last saw.
    pub expected_version: i64,
    /// Optional reason.
    #[serde(default)]
    pub reason: Option<String>,
}

/// An uploaded image before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadImageRequest {
    /// `RECEIPT`, `BEFORE`, `AFTER` or `PARTS`.
    pub image_type: String,
    /// The client file name.
    pub file_name: String,
    /// The declared MIME type.
    pub mime_type: String,
    /// The file contents.
    pub contents: Vec<u8>,
}

/// Ticket list filters. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListTicketsRequest {
    /// Status name, e.g. `CONFIRMED`.
    pub status: Option<String>,
    /// Assigned technician.
    pub technician_id: Option<i64>,
    /// Service center.
    pub center_id: Option<String>,
    /// Earliest appointment date, inclusive.
    pub date_from: Option<String>,
    /// Latest appointment date, inclusive.
    pub date_to: Option<String>,
    /// Substring of customer name, address or issue.
    pub search: Option<String>,
    /// 1-based page number.
    pub page: Option<u32>,
    /// Items per page.
    pub page_size: Option<u32>,
}

/// A ticket as returned to staff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketInfo {
    /// The ticket ID.
    pub ticket_id: i64,
    /// The customer-facing reference.
    pub booking_reference: String,
    /// Customer name.
    pub customer_name: String,
    /// Service address.
    pub address: String,
    /// `YYYY-MM-DD`.
    pub appointment_date: String,
    /// `HH:MM`.
    pub appointment_time_slot: String,
    /// Issue description.
    pub issue_description: String,
    /// Status name.
    pub status: String,
    /// Assigned technician.
    pub technician_id: Option<i64>,
    /// Service center.
    pub center_id: Option<String>,
    /// Version for optimistic concurrency.
    pub version: i64,
    /// Creation time.
    pub created_at: String,
    /// Last status change.
    pub updated_at: String,
    /// Completion time.
    pub completed_at: Option<String>,
}

impl From<&Ticket> for TicketInfo {
    fn from(ticket: &Ticket) -> Self {
        Self {
            ticket_id: ticket.ticket_id.unwrap_or_default(),
            booking_reference: ticket.booking_reference().unwrap_or_default(),
            customer_name: ticket.customer_name.clone(),
            address: ticket.address.clone(),
            appointment_date: format_date(ticket.appointment_date),
            appointment_time_slot: ticket.appointment_time_slot.clone(),
            issue_description: ticket.issue_description.clone(),
            status: ticket.status.as_str().to_string(),
            technician_id: ticket.technician_id,
            center_id: ticket.center_id.clone(),
            version: ticket.version,
            created_at: ticket.created_at.clone(),
            updated_at: ticket.updated_at.clone(),
            completed_at: ticket.completed_at.clone(),
        }
    }
}

/// Response to a ticket change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketWriteResponse {
    /// The ticket after the change.
    pub ticket: TicketInfo,
    /// The audit event ID.
    pub event_id: i64,
    /// The stored image, for uploads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<TicketImageInfo>,
}

/// A stored ticket image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketImageInfo {
    /// The image ID.
    pub image_id: i64,
    /// The owning ticket.
    pub ticket_id: i64,
    /// Image type name.
    pub image_type: String,
    /// Client file name.
    pub file_name: String,
    /// Path relative to the upload root.
    pub file_path: String,
    /// MIME type.
    pub mime_type: String,
    /// Size in bytes.
    pub size_bytes: i64,
    /// SHA-256 hex of the contents.
    pub checksum_sha256: String,
    /// Uploader.
    pub uploaded_by_user_id: Option<i64>,
    /// Upload time.
    pub uploaded_at: String,
}

impl From<&TicketImage> for TicketImageInfo {
    fn from(image: &TicketImage) -> Self {
        Self {
            image_id: image.image_id.unwrap_or_default(),
            ticket_id: image.ticket_id,
            image_type: image.image_type.as_str().to_string(),
            file_name: image.file_name.clone(),
            file_path: image.file_path.clone(),
            mime_type: image.mime_type.clone(),
            size_bytes: image.size_bytes,
            checksum_sha256: image.checksum_sha256.clone(),
            uploaded_by_user_id: image.uploaded_by_user_id,
            uploaded_at: image.uploaded_at.clone(),
        }
    }
}

/// A stored image together with its bytes.
#[derive(Debug, Clone)]
pub struct TicketImageDownload {
    /// The image metadata.
    pub image: TicketImageInfo,
    /// The file contents.
    pub contents: Vec<u8>,
}

/// A page of tickets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListTicketsResponse {
    /// The tickets on this page, newest first.
    pub items: Vec<TicketInfo>,
    /// Pagination details.
    #[serde(flatten)]
    pub page: PageInfo,
}

/// A ticket with its history and images.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketDetailResponse {
    /// The ticket.
    pub ticket: TicketInfo,
    /// Its audit events, oldest first.
    pub events: Vec<AuditEventInfo>,
    /// Its images, in upload order.
    pub images: Vec<TicketImageInfo>,
}

/// Images attached to a ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListTicketImagesResponse {
    /// The ticket ID.
    pub ticket_id: i64,
    /// The images, in upload order.
    pub images: Vec<TicketImageInfo>,
}

/// Which technician auto-assignment would pick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectTechnicianResponse {
    /// The center searched.
    pub center_id: Option<String>,
    /// The chosen technician, if any is available.
    pub technician_id: Option<i64>,
}

// ========================================================================
// Pagination
// ========================================================================

/// Pagination details shared by list responses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PageInfo {
    /// 1-based page number.
    pub page: u32,
    /// Items per page.
    pub page_size: u32,
    /// Items across all pages.
    pub total: i64,
    /// Number of pages.
    pub total_pages: i64,
}

impl PageInfo {
    /// Extracts the pagination details of a page.
    #[must_use]
    pub fn of<T>(page: &Page<T>) -> Self {
        Self {
            page: page.page,
            page_size: page.page_size,
            total: page.total,
            total_pages: page.total_pages(),
        }
    }
}

// ========================================================================
// Audit
// ========================================================================

/// Audit query filters. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListAuditEventsRequest {
    /// Events about this ticket.
    pub ticket_id: Option<i64>,
    /// Subject kind: `ticket`, `role`, `user` or `technician`.
    pub subject_type: Option<String>,
    /// Subject ID, used with `subject_type`.
    pub subject_id: Option<i64>,
    /// Events by this user.
    pub actor_user_id: Option<i64>,
    /// Action name, e.g. `ASSIGN`.
    pub action: Option<String>,
    /// Earliest time, inclusive.
    pub from: Option<String>,
    /// Latest time, inclusive.
    pub to: Option<String>,
    /// 1-based page number.
    pub page: Option<u32>,
    /// Items per page.
    pub page_size: Option<u32>,
}

/// A single audit event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEventInfo {
    /// The event ID.
    pub event_id: i64,
    /// Subject kind.
    pub subject_type: String,
    /// Subject ID.
    pub subject_id: Option<i64>,
    /// Action name.
    pub action: String,
    /// Action details as a JSON string.
    pub details: Option<String>,
    /// Actor identifier.
    pub actor_id: String,
    /// Actor type.
    pub actor_type: String,
    /// Acting user, if any.
    pub actor_user_id: Option<i64>,
    /// Cause identifier.
    pub cause_id: String,
    /// Cause description.
    pub cause_description: String,
    /// State before, as a JSON string.
    pub before: String,
    /// State after, as a JSON string.
    pub after: String,
    /// When the event was recorded.
    pub created_at: String,
}

impl From<&AuditEvent> for AuditEventInfo {
    fn from(event: &AuditEvent) -> Self {
        Self {
            event_id: event.event_id.unwrap_or_default(),
            subject_type: event.subject.kind.as_str().to_string(),
            subject_id: event.subject.id,
            action: event.action.name.clone(),
            details: event.action.details.clone(),
            actor_id: event.actor.id.clone(),
            actor_type: event.actor.actor_type.clone(),
            actor_user_id: event.actor.user_id,
            cause_id: event.cause.id.clone(),
            cause_description: event.cause.description.clone(),
            before: event.before.data.clone(),
            after: event.after.data.clone(),
            created_at: event.created_at.clone(),
        }
    }
}

/// A page of audit events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListAuditEventsResponse {
    /// The events on this page, newest first.
    pub items: Vec<AuditEventInfo>,
    /// Pagination details.
    #[serde(flatten)]
    pub page: PageInfo,
}

// ========================================================================
// Technicians
// ========================================================================

/// Request to add a technician.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTechnicianRequest {
    /// Display name.
    pub name: String,
    /// Service center.
    #[serde(default)]
    pub center_id: Option<String>,
}

/// Request to change a technician. Absent fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTechnicianRequest {
    /// New name.
    #[serde(default)]
    pub name: Option<String>,
    /// New center.
    #[serde(default)]
    pub center_id: Option<String>,
    /// Detach from any center.
    #[serde(default)]
    pub clear_center: bool,
    /// Activate or deactivate.
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Technician list filters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListTechniciansRequest {
    /// Only this center.
    pub center_id: Option<String>,
    /// Include deactivated technicians.
    #[serde(default)]
    pub include_inactive: bool,
}

/// A technician.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnicianInfo {
    /// The technician ID.
    pub technician_id: i64,
    /// Display name.
    pub name: String,
    /// Service center.
    pub center_id: Option<String>,
    /// Whether the technician can take work.
    pub is_active: bool,
}

impl From<&Technician> for TechnicianInfo {
    fn from(technician: &Technician) -> Self {
        Self {
            technician_id: technician.technician_id.unwrap_or_default(),
            name: technician.name.clone(),
            center_id: technician.center_id.clone(),
            is_active: technician.is_active,
        }
    }
}

/// Response to a technician change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnicianWriteResponse {
    /// The technician after the change.
    pub technician: TechnicianInfo,
    /// The audit event ID.
    pub event_id: i64,
}

/// Technicians matching a list request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListTechniciansResponse {
    /// The technicians, by ID.
    pub technicians: Vec<TechnicianInfo>,
}

// ========================================================================
// Permissions and roles
// ========================================================================

/// A permission code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionInfo {
    /// Dotted code.
    pub code: String,
    /// Category.
    pub category: String,
    /// Description.
    pub description: String,
}

impl From<&Permission> for PermissionInfo {
    fn from(permission: &Permission) -> Self {
        Self {
            code: permission.code.clone(),
            category: permission.category.clone(),
            description: permission.description.clone(),
        }
    }
}

/// Permissions sharing a category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionCategoryInfo {
    /// Category name.
    pub category: String,
    /// Permissions in this category, by code.
    pub permissions: Vec<PermissionInfo>,
}

/// The permission catalog grouped by category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListPermissionsResponse {
    /// Categories, by name.
    pub categories: Vec<PermissionCategoryInfo>,
}

/// A role with its permissions and membership count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleInfo {
    /// The role ID.
    pub role_id: i64,
    /// Unique name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Built-in roles are protected.
    pub is_system: bool,
    /// Granted permission codes, sorted.
    pub permissions: Vec<String>,
    /// Number of granted permissions.
    pub permission_count: usize,
    /// Number of users holding the role.
    pub user_count: i64,
}

/// All roles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListRolesResponse {
    /// Roles, by name.
    pub roles: Vec<RoleInfo>,
}

/// Request to create a custom role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRoleRequest {
    /// Unique name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Permission codes to grant.
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Request to change a role. Absent fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateRoleRequest {
    /// New name.
    #[serde(default)]
    pub name: Option<String>,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
    /// Replacement permission set.
    #[serde(default)]
    pub permissions: Option<Vec<String>>,
}

/// Response to a role creation or update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleWriteResponse {
    /// The role after the change.
    pub role: RoleInfo,
    /// The audit event ID.
    pub event_id: i64,
}

/// Response to a role deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteRoleResponse {
    /// The deleted role's ID.
    pub role_id: i64,
    /// The audit event ID.
    pub event_id: i64,
}

// ========================================================================
// Users
// ========================================================================

/// Request to create a staff account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    /// Login email.
    pub email: String,
    /// Display name.
    pub display_name: String,
    /// Initial password.
    pub password: String,
    /// Roles to grant.
    #[serde(default)]
    pub role_ids: Vec<i64>,
}

/// Request to replace a user's roles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignRolesRequest {
    /// The complete new role set.
    pub role_ids: Vec<i64>,
}

/// Response to a role replacement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignRolesResponse {
    /// The user.
    pub user_id: i64,
    /// Role names now held.
    pub roles: Vec<String>,
    /// The audit event ID.
    pub event_id: i64,
}

/// Request to activate or deactivate an account.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SetUserActiveRequest {
    /// The new state.
    pub is_active: bool,
}

/// A staff account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    /// The user ID.
    pub user_id: i64,
    /// Email.
    pub email: String,
    /// Display name.
    pub display_name: String,
    /// Whether the account can log in.
    pub is_active: bool,
    /// Held role names.
    pub roles: Vec<String>,
    /// Creation time.
    pub created_at: String,
    /// Last login time.
    pub last_login_at: Option<String>,
}

impl UserInfo {
    /// Combines a stored account with its role names.
    #[must_use]
    pub fn new(user: &UserData, roles: Vec<String>) -> Self {
        Self {
            user_id: user.user_id,
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            is_active: user.is_active,
            roles,
            created_at: user.created_at.clone(),
            last_login_at: user.last_login_at.clone(),
        }
    }
}

/// All staff accounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListUsersResponse {
    /// Users, by ID.
    pub users: Vec<UserInfo>,
}
