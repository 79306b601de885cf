// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! API boundary layer for the repair desk back office.
//!
//! Turns request DTOs into domain input, checks sessions and permissions,
//! drives the core state machine and hands results to persistence. Errors
//! from every layer are translated into [`ApiError`] so the server only has
//! one type to map onto HTTP.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all,
    clippy::suspicious,
    clippy::complexity,
    clippy::perf,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(clippy::multiple_crate_versions)]

mod auth;
mod config;
mod error;
mod handlers;
mod password_policy;
mod request_response;
mod storage;

#[cfg(test)]
mod tests;

pub use auth::{AuthenticatedUser, AuthenticationService, AuthorizationService, LoginOutcome};
pub use config::{DEFAULT_SESSION_TTL_HOURS, ServiceConfig};
pub use error::{
    ApiError, AuthError, translate_core_error, translate_domain_error,
    translate_persistence_error, translate_transition_error,
};
pub use handlers::{
    assign_roles_to_user, assign_ticket, cancel_ticket, complete_ticket, confirm_ticket,
    create_role, create_technician, create_user, delete_role, download_ticket_image,
    get_audit_event, get_role, get_ticket_detail, list_audit_events, list_permissions,
    list_roles, list_technicians, list_ticket_images, list_tickets, list_users, login, logout,
    select_technician, set_user_active, submit_booking, suggest_technician, update_role,
    update_technician, upload_ticket_image, whoami,
};
pub use password_policy::{PasswordPolicy, PasswordPolicyError};
pub use request_response::{
    AssignRolesRequest, AssignRolesResponse, AssignTicketRequest, AuditEventInfo,
    CancelTicketRequest, CreateRoleRequest, CreateTechnicianRequest, CreateUserRequest,
    DeleteRoleResponse, ListAuditEventsRequest, ListAuditEventsResponse, ListPermissionsResponse,
    ListRolesResponse, ListTechniciansRequest, ListTechniciansResponse, ListTicketImagesResponse,
    ListTicketsRequest, ListTicketsResponse, ListUsersResponse, LoginRequest, LoginResponse,
    PageInfo, PermissionCategoryInfo, PermissionInfo, RoleInfo, RoleWriteResponse,
    SelectTechnicianResponse, SetUserActiveRequest, SubmitBookingRequest, SubmitBookingResponse,
    TechnicianInfo, TechnicianWriteResponse, TicketDetailResponse, TicketImageDownload,
    TicketImageInfo, TicketInfo, TicketWriteResponse, UpdateRoleRequest, UpdateTechnicianRequest,
    UploadImageRequest, UserInfo, VersionedRequest, WhoAmIResponse,
};
pub use storage::{ReceiptStore, StorageError, StoredFile};
