// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! API handler functions for state-changing and read-only operations.
//!
//! Every protected handler checks permissions first, then delegates the
//! decision to the core and the write to persistence. Errors from every
//! layer leave here as `ApiError`.

use std::collections::BTreeMap;
use std::str::FromStr;

use num_traits::ToPrimitive;
use repairdesk::{
    RoleCommand, TechnicianUpdate, TicketCommand, apply, apply_booking, apply_role,
    apply_role_creation, apply_technician_creation, apply_technician_update, apply_user_roles,
};
use repairdesk_audit::{Actor, AuditEvent, Cause, SubjectKind};
use repairdesk_domain::permission::{
    AUDIT_READ, CENTERS_WRITE, PERMISSIONS_READ, ROLES_READ, ROLES_WRITE, TICKETS_ASSIGN,
    TICKETS_COMPLETE, TICKETS_READ, TICKETS_UPLOAD, TICKETS_WRITE, USERS_READ, USERS_WRITE,
};
use repairdesk_domain::{
    AssignmentMethod, AssignmentPolicy, BookingRequest, ImageType, Permission, PermissionCatalog,
    Role, Technician, TechnicianLoad, Ticket, TicketImage, TicketStatus, TransitionRejection,
    format_timestamp, parse_date, parse_timestamp, select_least_loaded, sha256_hex,
    validate_booking, validate_email,
};
use repairdesk_persistence::{
    AuditEventFilter, DEFAULT_PAGE_SIZE, Page, PageRequest, RoleSummary, SqlitePersistence,
    TicketFilter, TicketWrite, UserData,
};
use time::{Date, OffsetDateTime};
use tracing::{debug, info, warn};

use crate::auth::{AuthenticatedUser, AuthenticationService, AuthorizationService};
use crate::config::ServiceConfig;
use crate::error::{ApiError, translate_domain_error, translate_transition_error};
use crate::request_response::{
    AssignRolesRequest, AssignRolesResponse, AssignTicketRequest, AuditEventInfo,
    CancelTicketRequest, CreateRoleRequest, CreateTechnicianRequest, CreateUserRequest,
    DeleteRoleResponse, ListAuditEventsRequest, ListAuditEventsResponse, ListPermissionsResponse,
    ListRolesResponse, ListTechniciansRequest, ListTechniciansResponse, ListTicketImagesResponse,
    ListTicketsRequest, ListTicketsResponse, ListUsersResponse, LoginRequest, LoginResponse,
    PageInfo, PermissionCategoryInfo, PermissionInfo, RoleInfo, RoleWriteResponse,
    SelectTechnicianResponse, SetUserActiveRequest, SubmitBookingRequest, SubmitBookingResponse,
    TechnicianInfo, TechnicianWriteResponse, TicketDetailResponse, TicketImageDownload, TicketImageInfo,
    TicketInfo, TicketWriteResponse, UpdateRoleRequest, UpdateTechnicianRequest, UploadImageRequest,
    UserInfo, VersionedRequest, WhoAmIResponse,
};
use crate::storage::{ReceiptStore, StoredFile};

// ========================================================================
// Helpers
// ========================================================================

/// Renames the resource type of a not-found error.
fn not_found_as(resource_type: &str, err: ApiError) -> ApiError {
    match err {
        ApiError::ResourceNotFound { message, .. } => ApiError::ResourceNotFound {
            resource_type: resource_type.to_string(),
            message,
        },
        other => other,
    }
}

fn ticket_not_found(ticket_id: i64) -> ApiError {
    ApiError::ResourceNotFound {
        resource_type: String::from("Ticket"),
        message: format!("Ticket {ticket_id} does not exist"),
    }
}

fn page_request(page: Option<u32>, page_size: Option<u32>) -> PageRequest {
    PageRequest::new(page.unwrap_or(1), page_size.unwrap_or(DEFAULT_PAGE_SIZE))
}

fn parse_date_field(field: &str, value: Option<&str>) -> Result<Option<Date>, ApiError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| {
            parse_date(v).map_err(|e| ApiError::InvalidInput {
                field: field.to_string(),
                message: e.to_string(),
            })
        })
        .transpose()
}

fn parse_timestamp_field(field: &str, value: Option<&str>) -> Result<Option<String>, ApiError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| {
            parse_timestamp(v)
                .map(format_timestamp)
                .map_err(|e| ApiError::InvalidInput {
                    field: field.to_string(),
                    message: e.to_string(),
                })
        })
        .transpose()
}

fn role_info(role: &Role, user_count: i64) -> RoleInfo {
    RoleInfo {
        role_id: role.role_id.unwrap_or_default(),
        name: role.name.clone(),
        description: role.description.clone(),
        is_system: role.is_system,
        permissions: role.permissions.iter().cloned().collect(),
        permission_count: role.permissions.len(),
        user_count,
    }
}

fn role_names(persistence: &mut SqlitePersistence, user_id: i64) -> Result<Vec<String>, ApiError> {
    Ok(persistence
        .user_roles(user_id)?
        .into_iter()
        .map(|r| r.name)
        .collect())
}

fn ticket_write_response(write: &TicketWrite, image: Option<TicketImageInfo>) -> TicketWriteResponse {
    TicketWriteResponse {
        ticket: TicketInfo::from(&write.ticket),
        event_id: write.event_id,
        image,
    }
}

/// Applies a ticket command inside one guarded transaction.
fn run_ticket_command(
    persistence: &mut SqlitePersistence,
    ticket_id: i64,
    command: TicketCommand,
    actor: Actor,
    cause: Cause,
    now: OffsetDateTime,
) -> Result<TicketWrite, ApiError> {
    let now_str: String = format_timestamp(now);
    persistence
        .run_ticket_transition(ticket_id, |state| {
            apply(state, command, actor, cause, &now_str)
        })
        .map_err(|e| not_found_as("Ticket", translate_transition_error(e)))
}

// ========================================================================
// Authentication
// ========================================================================

/// Authenticates a user and opens a session.
///
/// # Arguments
///
/// * `persistence` - The persistence layer
/// * `config` - Supplies the session lifetime
/// * `request` - The login request
/// * `now` - The current time
///
/// # Errors
///
/// Returns `ApiError::AuthenticationFailed` if the credentials are rejected.
pub fn login(
    persistence: &mut SqlitePersistence,
    config: &ServiceConfig,
    request: &LoginRequest,
    now: OffsetDateTime,
) -> Result<LoginResponse, ApiError> {
    let outcome = AuthenticationService::login(
        persistence,
        &request.email,
        &request.password,
        config.session_ttl,
        now,
    )?;

    Ok(LoginResponse {
        session_token: outcome.session_token,
        expires_at: outcome.expires_at,
        user: whoami(&outcome.user),
    })
}

/// Logs out by deleting the session.
///
/// # Errors
///
/// Returns an error if the session cannot be deleted.
pub fn logout(persistence: &mut SqlitePersistence, session_token: &str) -> Result<(), ApiError> {
    AuthenticationService::logout(persistence, session_token)?;
    Ok(())
}

/// Returns the caller's identity and effective permissions.
#[must_use]
pub fn whoami(user: &AuthenticatedUser) -> WhoAmIResponse {
    WhoAmIResponse {
        user_id: user.user_id,
        email: user.email.clone(),
        display_name: user.display_name.clone(),
        roles: user.roles.clone(),
        permissions: user.permissions.iter().cloned().collect(),
    }
}

// ========================================================================
// Public booking
// ========================================================================

/// Books a repair visit from the public form.
///
/// No authentication is required. The ticket starts `BOOKED` at version 0
/// and the `BOOK` event carries no user.
///
/// # Errors
///
/// Returns `ApiError::InvalidInput` naming the first invalid field, or an
/// internal error if the ticket cannot be stored.
pub fn submit_booking(
    persistence: &mut SqlitePersistence,
    request: &SubmitBookingRequest,
    cause: Cause,
    now: OffsetDateTime,
) -> Result<SubmitBookingResponse, ApiError> {
    let booking = validate_booking(&BookingRequest {
        customer_name: request.customer_name.clone(),
        customer_phone: request.customer_phone.clone(),
        address: request.address.clone(),
        appointment_date: request.appointment_date.clone(),
        appointment_time_slot: request.appointment_time_slot.clone(),
        issue_description: request.issue_description.clone(),
        center_id: request.center_id.clone(),
    })
    .map_err(translate_domain_error)?;

    let result = apply_booking(booking, Actor::public(), cause, &format_timestamp(now));
    let write: TicketWrite = persistence.insert_booking(&result)?;

    let ticket_id: i64 = write.ticket.ticket_id.ok_or_else(|| ApiError::Internal {
        message: String::from("Stored ticket has no ID"),
    })?;

    Ok(SubmitBookingResponse {
        ticket_id,
        booking_reference: write.ticket.booking_reference().unwrap_or_default(),
        status: write.ticket.status.as_str().to_string(),
        event_id: write.event_id,
    })
}

// ========================================================================
// Ticket lifecycle
// ========================================================================

/// Confirms a booked ticket.
///
/// Requires `tickets.write`.
///
/// # Errors
///
/// Returns `PermissionDenied`, `VersionConflict`, `InvalidTransition` or
/// `ResourceNotFound`.
pub fn confirm_ticket(
    persistence: &mut SqlitePersistence,
    ticket_id: i64,
    request: VersionedRequest,
    user: &AuthenticatedUser,
    cause: Cause,
    now: OffsetDateTime,
) -> Result<TicketWriteResponse, ApiError> {
    AuthorizationService::require(user, TICKETS_WRITE)?;

    let write = run_ticket_command(
        persistence,
        ticket_id,
        TicketCommand::Confirm {
            expected_version: request.expected_version,
        },
        user.to_audit_actor(),
        cause,
        now,
    )?;
    Ok(ticket_write_response(&write, None))
}

/// Picks the technician auto-assignment would choose.
///
/// Candidates are active technicians in `center_id`; a technician from
/// another center is never returned. A ticket without a center matches
/// technicians of any center. The one with the fewest open tickets whose
/// appointment falls in the trailing window wins; ties go to the lowest ID.
///
/// # Errors
///
/// Returns an error if the load query fails.
pub fn select_technician(
    persistence: &mut SqlitePersistence,
    policy: &AssignmentPolicy,
    center_id: Option<&str>,
    today: Date,
) -> Result<Option<i64>, ApiError> {
    let loads: Vec<TechnicianLoad> = persistence.technician_loads(center_id, policy.window(today))?;
    let selected: Option<i64> = select_least_loaded(&loads);
    debug!(
        center_id = center_id.unwrap_or("*"),
        candidates = loads.len(),
        selected = ?selected,
        "Selected technician by load"
    );
    Ok(selected)
}

/// Reports which technician auto-assignment would pick for a center.
///
/// Requires `tickets.assign`.
///
/// # Errors
///
/// Returns `PermissionDenied` or an internal error.
pub fn suggest_technician(
    persistence: &mut SqlitePersistence,
    config: &ServiceConfig,
    center_id: Option<String>,
    user: &AuthenticatedUser,
    now: OffsetDateTime,
) -> Result<SelectTechnicianResponse, ApiError> {
    AuthorizationService::require(user, TICKETS_ASSIGN)?;
    let technician_id =
        select_technician(persistence, &config.assignment, center_id.as_deref(), now.date())?;
    Ok(SelectTechnicianResponse {
        center_id,
        technician_id,
    })
}

/// Assigns a confirmed ticket to a technician.
///
/// With an explicit `technician_id` the technician must exist and be active.
/// Without one, the least-loaded technician of the ticket's center is
/// chosen. Requires `tickets.assign`.
///
/// # Errors
///
/// Returns `PermissionDenied`, `VersionConflict`, `InvalidTransition`,
/// `NoTechnicianAvailable`, `DomainRuleViolation` for an inactive
/// technician, or `ResourceNotFound`.
pub fn assign_ticket(
    persistence: &mut SqlitePersistence,
    config: &ServiceConfig,
    ticket_id: i64,
    request: &AssignTicketRequest,
    user: &AuthenticatedUser,
    cause: Cause,
    now: OffsetDateTime,
) -> Result<TicketWriteResponse, ApiError> {
    AuthorizationService::require(user, TICKETS_ASSIGN)?;

    let ticket: Ticket = persistence
        .get_ticket(ticket_id)?
        .ok_or_else(|| ticket_not_found(ticket_id))?;

    // Fail on the cheap preconditions before searching for a technician.
    if ticket.version != request.expected_version {
        return Err(ApiError::VersionConflict {
            ticket_id,
            expected: request.expected_version,
            actual: ticket.version,
        });
    }
    ticket
        .status
        .validate_transition(TicketStatus::Assigned)
        .map_err(translate_domain_error)?;

    let (technician, method): (Technician, AssignmentMethod) = match request.technician_id {
        Some(technician_id) => {
            let technician = persistence.get_technician(technician_id)?.ok_or_else(|| {
                ApiError::ResourceNotFound {
                    resource_type: String::from("Technician"),
                    message: format!("Technician {technician_id} does not exist"),
                }
            })?;
            (technician, AssignmentMethod::Manual)
        }
        None => {
            let center_id: Option<&str> = ticket.center_id.as_deref();
            let technician_id = select_technician(persistence, &config.assignment, center_id, now.date())?
                .ok_or_else(|| {
                    warn!(ticket_id, center_id = ?center_id, "No technician available");
                    ApiError::NoTechnicianAvailable {
                        center_id: ticket.center_id.clone(),
                    }
                })?;
            let technician = persistence.get_technician(technician_id)?.ok_or_else(|| {
                ApiError::Internal {
                    message: format!("Selected technician {technician_id} vanished"),
                }
            })?;
            (technician, AssignmentMethod::Auto)
        }
    };

    let note: Option<String> = request
        .note
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string);

    let write = run_ticket_command(
        persistence,
        ticket_id,
        TicketCommand::Assign {
            technician,
            method,
            note,
            expected_version: request.expected_version,
        },
        user.to_audit_actor(),
        cause,
        now,
    )?;
    Ok(ticket_write_response(&write, None))
}

/// Stores an image and attaches it to a ticket.
///
/// The ticket must be `ASSIGNED` or `IN_PROGRESS`; the first upload on an
/// assigned ticket moves it to `IN_PROGRESS`. The file is written before
/// the database row and removed again if the row is rejected. Not version
/// checked. Requires `tickets.upload`.
///
/// # Errors
///
/// Returns `PermissionDenied`, `InvalidInput` for a rejected file,
/// `InvalidTransition`, `Conflict` for a duplicate checksum on the same
/// ticket, `ResourceNotFound`, or an internal error if storage fails.
pub fn upload_ticket_image(
    persistence: &mut SqlitePersistence,
    config: &ServiceConfig,
    ticket_id: i64,
    request: &UploadImageRequest,
    user: &AuthenticatedUser,
    cause: Cause,
    now: OffsetDateTime,
) -> Result<TicketWriteResponse, ApiError> {
    AuthorizationService::require(user, TICKETS_UPLOAD)?;

    let image_type: ImageType = ImageType::from_str(&request.image_type.trim().to_ascii_uppercase())
        .map_err(translate_domain_error)?;
    let file_name: String = request
        .file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_string();
    let size: u64 = request.contents.len().to_u64().unwrap_or(u64::MAX);
    let extension: String = config
        .upload
        .validate(&file_name, &request.mime_type, size)
        .map_err(translate_domain_error)?;

    let ticket: Ticket = persistence
        .get_ticket(ticket_id)?
        .ok_or_else(|| ticket_not_found(ticket_id))?;
    if !matches!(
        ticket.status,
        TicketStatus::Assigned | TicketStatus::InProgress
    ) {
        return Err(ApiError::InvalidTransition {
            from: ticket.status,
            to: TicketStatus::InProgress,
            rejection: TransitionRejection::NotPermitted,
        });
    }

    let checksum: String = sha256_hex(&request.contents);
    if persistence.image_checksum_exists(ticket_id, &checksum)? {
        return Err(ApiError::Conflict {
            message: format!("This image is already attached to ticket {ticket_id}"),
        });
    }

    let store = ReceiptStore::new(config.upload_dir.clone());
    let stored: StoredFile = store.store(ticket_id, &extension, &request.contents)?;
    let now_str: String = format_timestamp(now);

    let image = TicketImage {
        image_id: None,
        ticket_id,
        image_type,
        file_name,
        file_path: stored.relative_path.clone(),
        mime_type: request.mime_type.trim().to_ascii_lowercase(),
        size_bytes: stored.size_bytes.to_i64().unwrap_or(i64::MAX),
        checksum_sha256: stored.checksum_sha256.clone(),
        uploaded_by_user_id: Some(user.user_id),
        uploaded_at: now_str,
    };

    let outcome = run_ticket_command(
        persistence,
        ticket_id,
        TicketCommand::UploadReceipt {
            image: image.clone(),
        },
        user.to_audit_actor(),
        cause,
        now,
    );

    match outcome {
        Ok(write) => {
            let stored_image = TicketImage {
                image_id: write.image_id,
                ..image
            };
            info!(
                ticket_id,
                image_id = ?write.image_id,
                image_type = image_type.as_str(),
                "Attached ticket image"
            );
            Ok(ticket_write_response(
                &write,
                Some(TicketImageInfo::from(&stored_image)),
            ))
        }
        Err(err) => {
            if let Err(cleanup) = store.remove(&stored.relative_path) {
                warn!(error = %cleanup, path = %stored.relative_path, "Failed to remove orphaned upload");
            }
            Err(err)
        }
    }
}

/// Completes a ticket that has at least one receipt.
///
/// Requires `tickets.complete`.
///
/// # Errors
///
/// Returns `PermissionDenied`, `VersionConflict`, `InvalidTransition`
/// (including the missing-receipt case) or `ResourceNotFound`.
pub fn complete_ticket(
    persistence: &mut SqlitePersistence,
    ticket_id: i64,
    request: VersionedRequest,
    user: &AuthenticatedUser,
    cause: Cause,
    now: OffsetDateTime,
) -> Result<TicketWriteResponse, ApiError> {
    AuthorizationService::require(user, TICKETS_COMPLETE)?;

    let write = run_ticket_command(
        persistence,
        ticket_id,
        TicketCommand::Complete {
            expected_version: request.expected_version,
        },
        user.to_audit_actor(),
        cause,
        now,
    )?;
    Ok(ticket_write_response(&write, None))
}

/// Cancels a ticket before work starts and releases its technician.
///
/// Requires `tickets.write`.
///
/// # Errors
///
/// Returns `PermissionDenied`, `VersionConflict`, `InvalidTransition` or
/// `ResourceNotFound`.
pub fn cancel_ticket(
    persistence: &mut SqlitePersistence,
    ticket_id: i64,
    request: &CancelTicketRequest,
    user: &AuthenticatedUser,
    cause: Cause,
    now: OffsetDateTime,
) -> Result<TicketWriteResponse, ApiError> {
    AuthorizationService::require(user, TICKETS_WRITE)?;

    let reason: Option<String> = request
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string);

    let write = run_ticket_command(
        persistence,
        ticket_id,
        TicketCommand::Cancel {
            reason,
            expected_version: request.expected_version,
        },
        user.to_audit_actor(),
        cause,
        now,
    )?;
    Ok(ticket_write_response(&write, None))
}

// ========================================================================
// Ticket queries
// ========================================================================

/// Lists tickets, newest first. Requires `tickets.read`.
///
/// # Errors
///
/// Returns `PermissionDenied` or `InvalidInput` for an unknown status or a
/// malformed date.
pub fn list_tickets(
    persistence: &mut SqlitePersistence,
    request: &ListTicketsRequest,
    user: &AuthenticatedUser,
) -> Result<ListTicketsResponse, ApiError> {
    AuthorizationService::require(user, TICKETS_READ)?;

    let status: Option<TicketStatus> = request
        .status
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| TicketStatus::from_str(&s.to_ascii_uppercase()))
        .transpose()
        .map_err(translate_domain_error)?;

    let filter = TicketFilter {
        status,
        technician_id: request.technician_id,
        center_id: request
            .center_id
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string),
        date_from: parse_date_field("date_from", request.date_from.as_deref())?,
        date_to: parse_date_field("date_to", request.date_to.as_deref())?,
        search: request
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
    };

    let page: Page<Ticket> =
        persistence.list_tickets(&filter, page_request(request.page, request.page_size))?;

    Ok(ListTicketsResponse {
        items: page.items.iter().map(TicketInfo::from).collect(),
        page: PageInfo::of(&page),
    })
}

/// Returns a ticket with its events and images. Requires `tickets.read`.
///
/// # Errors
///
/// Returns `PermissionDenied` or `ResourceNotFound`.
pub fn get_ticket_detail(
    persistence: &mut SqlitePersistence,
    ticket_id: i64,
    user: &AuthenticatedUser,
) -> Result<TicketDetailResponse, ApiError> {
    AuthorizationService::require(user, TICKETS_READ)?;

    let ticket: Ticket = persistence
        .get_ticket(ticket_id)?
        .ok_or_else(|| ticket_not_found(ticket_id))?;
    let events: Vec<AuditEvent> = persistence.ticket_events(ticket_id)?;
    let images: Vec<TicketImage> = persistence.list_ticket_images(ticket_id)?;

    Ok(TicketDetailResponse {
        ticket: TicketInfo::from(&ticket),
        events: events.iter().map(AuditEventInfo::from).collect(),
        images: images.iter().map(TicketImageInfo::from).collect(),
    })
}

/// Lists the images attached to a ticket. Requires `tickets.read`.
///
/// # Errors
///
/// Returns `PermissionDenied` or `ResourceNotFound`.
pub fn list_ticket_images(
    persistence: &mut SqlitePersistence,
    ticket_id: i64,
    user: &AuthenticatedUser,
) -> Result<ListTicketImagesResponse, ApiError> {
    AuthorizationService::require(user, TICKETS_READ)?;

    if persistence.get_ticket(ticket_id)?.is_none() {
        return Err(ticket_not_found(ticket_id));
    }
    let images: Vec<TicketImage> = persistence.list_ticket_images(ticket_id)?;

    Ok(ListTicketImagesResponse {
        ticket_id,
        images: images.iter().map(TicketImageInfo::from).collect(),
    })
}

/// Reads back a stored ticket image. Requires `tickets.read`.
///
/// # Errors
///
/// Returns `PermissionDenied`, `ResourceNotFound` when the image row or its
/// file is missing, or an internal error for other storage failures.
pub fn download_ticket_image(
    persistence: &mut SqlitePersistence,
    config: &ServiceConfig,
    image_id: i64,
    user: &AuthenticatedUser,
) -> Result<TicketImageDownload, ApiError> {
    AuthorizationService::require(user, TICKETS_READ)?;

    let image: TicketImage =
        persistence
            .get_ticket_image(image_id)?
            .ok_or_else(|| ApiError::ResourceNotFound {
                resource_type: String::from("Ticket image"),
                message: format!("Ticket image {image_id} does not exist"),
            })?;

    let contents: Vec<u8> = ReceiptStore::new(config.upload_dir.clone()).read(&image.file_path)?;
    debug!(
        image_id,
        ticket_id = image.ticket_id,
        size = contents.len(),
        "Read ticket image"
    );

    Ok(TicketImageDownload {
        image: TicketImageInfo::from(&image),
        contents,
    })
}

// ========================================================================
// Technicians
// ========================================================================

/// Adds a technician. Requires `centers.write`.
///
/// # Errors
///
/// Returns `PermissionDenied` or `InvalidInput` for a bad name.
pub fn create_technician(
    persistence: &mut SqlitePersistence,
    request: &CreateTechnicianRequest,
    user: &AuthenticatedUser,
    cause: Cause,
    now: OffsetDateTime,
) -> Result<TechnicianWriteResponse, ApiError> {
    AuthorizationService::require(user, CENTERS_WRITE)?;

    let transition = apply_technician_creation(
        &request.name,
        request.center_id.clone(),
        user.to_audit_actor(),
        cause,
        &format_timestamp(now),
    )?;
    let (technician, event_id) = persistence.persist_technician_creation(&transition)?;

    Ok(TechnicianWriteResponse {
        technician: TechnicianInfo::from(&technician),
        event_id,
    })
}

/// Renames, moves, activates or deactivates a technician.
///
/// Requires `centers.write`. Tickets already assigned keep their technician.
///
/// # Errors
///
/// Returns `PermissionDenied`, `InvalidInput` or `ResourceNotFound`.
pub fn update_technician(
    persistence: &mut SqlitePersistence,
    technician_id: i64,
    request: &UpdateTechnicianRequest,
    user: &AuthenticatedUser,
    cause: Cause,
    now: OffsetDateTime,
) -> Result<TechnicianWriteResponse, ApiError> {
    AuthorizationService::require(user, CENTERS_WRITE)?;

    let update = TechnicianUpdate {
        name: request.name.clone(),
        center_id: request.center_id.clone(),
        clear_center: request.clear_center,
        is_active: request.is_active,
    };
    let actor: Actor = user.to_audit_actor();
    let now_str: String = format_timestamp(now);

    let (technician, event_id) = persistence
        .run_technician_update(technician_id, |current| {
            apply_technician_update(current, update, actor, cause, &now_str)
        })
        .map_err(|e| not_found_as("Technician", translate_transition_error(e)))?;

    Ok(TechnicianWriteResponse {
        technician: TechnicianInfo::from(&technician),
        event_id,
    })
}

/// Lists technicians by ID. Requires `tickets.read`.
///
/// # Errors
///
/// Returns `PermissionDenied` or an internal error.
pub fn list_technicians(
    persistence: &mut SqlitePersistence,
    request: &ListTechniciansRequest,
    user: &AuthenticatedUser,
) -> Result<ListTechniciansResponse, ApiError> {
    AuthorizationService::require(user, TICKETS_READ)?;

    let center_id: Option<&str> = request
        .center_id
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());
    let technicians: Vec<Technician> =
        persistence.list_technicians(center_id, request.include_inactive)?;

    Ok(ListTechniciansResponse {
        technicians: technicians.iter().map(TechnicianInfo::from).collect(),
    })
}

// ========================================================================
// Permissions and roles
// ========================================================================

/// Lists the permission catalog grouped by category. Requires `permissions.read`.
///
/// # Errors
///
/// Returns `PermissionDenied` or an internal error.
pub fn list_permissions(
    persistence: &mut SqlitePersistence,
    user: &AuthenticatedUser,
) -> Result<ListPermissionsResponse, ApiError> {
    AuthorizationService::require(user, PERMISSIONS_READ)?;

    let permissions: Vec<Permission> = persistence.list_permissions()?;
    let mut grouped: BTreeMap<String, Vec<PermissionInfo>> = BTreeMap::new();
    for permission in &permissions {
        grouped
            .entry(permission.category.clone())
            .or_default()
            .push(PermissionInfo::from(permission));
    }

    Ok(ListPermissionsResponse {
        categories: grouped
            .into_iter()
            .map(|(category, permissions)| PermissionCategoryInfo {
                category,
                permissions,
            })
            .collect(),
    })
}

/// Lists every role with its permissions and user count. Requires `roles.read`.
///
/// # Errors
///
/// Returns `PermissionDenied` or an internal error.
pub fn list_roles(
    persistence: &mut SqlitePersistence,
    user: &AuthenticatedUser,
) -> Result<ListRolesResponse, ApiError> {
    AuthorizationService::require(user, ROLES_READ)?;

    let roles: Vec<RoleSummary> = persistence.list_roles()?;
    Ok(ListRolesResponse {
        roles: roles
            .iter()
            .map(|summary| role_info(&summary.role, summary.user_count))
            .collect(),
    })
}

/// Returns one role. Requires `roles.read`.
///
/// # Errors
///
/// Returns `PermissionDenied` or `ResourceNotFound`.
pub fn get_role(
    persistence: &mut SqlitePersistence,
    role_id: i64,
    user: &AuthenticatedUser,
) -> Result<RoleInfo, ApiError> {
    AuthorizationService::require(user, ROLES_READ)?;

    let state = persistence
        .get_role_state(role_id)
        .map_err(|e| not_found_as("Role", e.into()))?;
    Ok(role_info(&state.role, state.user_count))
}

/// Creates a custom role. Requires `roles.write`.
///
/// # Errors
///
/// Returns `PermissionDenied`, `InvalidInput` for a bad name or unknown
/// permission code, or `Conflict` if the name is taken.
pub fn create_role(
    persistence: &mut SqlitePersistence,
    catalog: &PermissionCatalog,
    request: &CreateRoleRequest,
    user: &AuthenticatedUser,
    cause: Cause,
    now: OffsetDateTime,
) -> Result<RoleWriteResponse, ApiError> {
    AuthorizationService::require(user, ROLES_WRITE)?;

    let now_str: String = format_timestamp(now);
    let transition = apply_role_creation(
        &request.name,
        request.description.trim(),
        &request.permissions,
        catalog,
        user.to_audit_actor(),
        cause,
        &now_str,
    )?;
    let (role, event_id) = persistence.persist_role_creation(&transition, &now_str)?;

    Ok(RoleWriteResponse {
        role: role_info(&role, 0),
        event_id,
    })
}

/// Renames, re-describes or replaces the permissions of a role.
///
/// System roles keep their name and their core permissions. Requires
/// `roles.write`.
///
/// # Errors
///
/// Returns `PermissionDenied`, `ProtectedRole`, `InvalidInput`, `Conflict`
/// if the new name is taken, or `ResourceNotFound`.
pub fn update_role(
    persistence: &mut SqlitePersistence,
    catalog: &PermissionCatalog,
    role_id: i64,
    request: &UpdateRoleRequest,
    user: &AuthenticatedUser,
    cause: Cause,
    now: OffsetDateTime,
) -> Result<RoleWriteResponse, ApiError> {
    AuthorizationService::require(user, ROLES_WRITE)?;

    let command = RoleCommand::Update {
        name: request.name.clone(),
        description: request.description.clone(),
        permissions: request.permissions.clone(),
    };
    let actor: Actor = user.to_audit_actor();
    let now_str: String = format_timestamp(now);

    let (role, event_id) = persistence
        .run_role_transition(role_id, |state| {
            apply_role(state, command, catalog, actor, cause, &now_str)
        })
        .map_err(|e| not_found_as("Role", translate_transition_error(e)))?;
    let role: Role = role.ok_or_else(|| ApiError::Internal {
        message: format!("Role {role_id} missing after update"),
    })?;
    let state = persistence.get_role_state(role_id)?;

    Ok(RoleWriteResponse {
        role: role_info(&role, state.user_count),
        event_id,
    })
}

/// Deletes a custom role nobody holds. Requires `roles.write`.
///
/// # Errors
///
/// Returns `PermissionDenied`, `ProtectedRole`, `RoleInUse` or
/// `ResourceNotFound`.
pub fn delete_role(
    persistence: &mut SqlitePersistence,
    catalog: &PermissionCatalog,
    role_id: i64,
    user: &AuthenticatedUser,
    cause: Cause,
    now: OffsetDateTime,
) -> Result<DeleteRoleResponse, ApiError> {
    AuthorizationService::require(user, ROLES_WRITE)?;

    let actor: Actor = user.to_audit_actor();
    let now_str: String = format_timestamp(now);

    let (_, event_id) = persistence
        .run_role_transition(role_id, |state| {
            apply_role(state, RoleCommand::Delete, catalog, actor, cause, &now_str)
        })
        .map_err(|e| not_found_as("Role", translate_transition_error(e)))?;

    Ok(DeleteRoleResponse { role_id, event_id })
}

// ========================================================================
// Users
// ========================================================================

/// Replaces the complete role set of a user. Requires `users.write`.
///
/// # Errors
///
/// Returns `PermissionDenied` or `ResourceNotFound` if the user or any role
/// does not exist.
pub fn assign_roles_to_user(
    persistence: &mut SqlitePersistence,
    user_id: i64,
    request: &AssignRolesRequest,
    user: &AuthenticatedUser,
    cause: Cause,
    now: OffsetDateTime,
) -> Result<AssignRolesResponse, ApiError> {
    AuthorizationService::require(user, USERS_WRITE)?;

    let actor: Actor = user.to_audit_actor();
    let now_str: String = format_timestamp(now);

    let event_id: i64 = persistence
        .replace_user_roles(user_id, &request.role_ids, |before, after| {
            apply_user_roles(user_id, before, after, actor, cause, &now_str)
        })
        .map_err(|e| not_found_as("User or role", e.into()))?;

    Ok(AssignRolesResponse {
        user_id,
        roles: role_names(persistence, user_id)?,
        event_id,
    })
}

/// Creates a staff account, optionally with roles. Requires `users.write`.
///
/// # Errors
///
/// Returns `PermissionDenied`, `InvalidInput`, `PasswordPolicyViolation`,
/// `Conflict` if the email is taken, or `ResourceNotFound` for an unknown role.
pub fn create_user(
    persistence: &mut SqlitePersistence,
    config: &ServiceConfig,
    request: &CreateUserRequest,
    user: &AuthenticatedUser,
    cause: Cause,
    now: OffsetDateTime,
) -> Result<UserInfo, ApiError> {
    AuthorizationService::require(user, USERS_WRITE)?;

    let email: String = validate_email(&request.email).map_err(translate_domain_error)?;
    let display_name: &str = request.display_name.trim();
    if display_name.is_empty() {
        return Err(ApiError::InvalidInput {
            field: String::from("display_name"),
            message: String::from("Display name cannot be empty"),
        });
    }
    config
        .password
        .validate(&request.password, &email, display_name)?;

    let now_str: String = format_timestamp(now);
    let user_id: i64 = persistence.create_user(&email, display_name, &request.password, &now_str)?;
    info!(user_id, created_by = user.user_id, "Created user");

    if !request.role_ids.is_empty() {
        let actor: Actor = user.to_audit_actor();
        persistence
            .replace_user_roles(user_id, &request.role_ids, |before, after| {
                apply_user_roles(user_id, before, after, actor, cause, &now_str)
            })
            .map_err(|e| not_found_as("Role", e.into()))?;
    }

    let stored: UserData = persistence
        .get_user_by_id(user_id)?
        .ok_or_else(|| ApiError::Internal {
            message: format!("User {user_id} missing after creation"),
        })?;
    let roles: Vec<String> = role_names(persistence, user_id)?;
    Ok(UserInfo::new(&stored, roles))
}

/// Lists staff accounts with their roles. Requires `users.read`.
///
/// # Errors
///
/// Returns `PermissionDenied` or an internal error.
pub fn list_users(
    persistence: &mut SqlitePersistence,
    user: &AuthenticatedUser,
) -> Result<ListUsersResponse, ApiError> {
    AuthorizationService::require(user, USERS_READ)?;

    let users: Vec<UserData> = persistence.list_users()?;
    let mut infos: Vec<UserInfo> = Vec::with_capacity(users.len());
    for stored in &users {
        let roles: Vec<String> = role_names(persistence, stored.user_id)?;
        infos.push(UserInfo::new(stored, roles));
    }
    Ok(ListUsersResponse { users: infos })
}

/// Activates or deactivates an account. Deactivation ends its sessions.
///
/// Requires `users.write`. Callers cannot deactivate themselves.
///
/// # Errors
///
/// Returns `PermissionDenied`, `DomainRuleViolation` for self-deactivation,
/// or `ResourceNotFound`.
pub fn set_user_active(
    persistence: &mut SqlitePersistence,
    user_id: i64,
    request: SetUserActiveRequest,
    user: &AuthenticatedUser,
) -> Result<UserInfo, ApiError> {
    AuthorizationService::require(user, USERS_WRITE)?;

    if user_id == user.user_id && !request.is_active {
        return Err(ApiError::DomainRuleViolation {
            rule: String::from("no_self_deactivation"),
            message: String::from("Users cannot deactivate their own account"),
        });
    }

    persistence
        .set_user_active(user_id, request.is_active)
        .map_err(|e| not_found_as("User", e.into()))?;
    info!(user_id, is_active = request.is_active, changed_by = user.user_id, "Changed user state");

    let stored: UserData = persistence
        .get_user_by_id(user_id)?
        .ok_or_else(|| ApiError::ResourceNotFound {
            resource_type: String::from("User"),
            message: format!("User {user_id} does not exist"),
        })?;
    let roles: Vec<String> = role_names(persistence, user_id)?;
    Ok(UserInfo::new(&stored, roles))
}

// ========================================================================
// Audit
// ========================================================================

/// Lists audit events, newest first. Requires `audit.read`.
///
/// `ticket_id` is shorthand for `subject_type=ticket&subject_id=<id>` and
/// wins over both.
///
/// # Errors
///
/// Returns `PermissionDenied` or `InvalidInput` for an unknown subject type
/// or a malformed timestamp.
pub fn list_audit_events(
    persistence: &mut SqlitePersistence,
    request: &ListAuditEventsRequest,
    user: &AuthenticatedUser,
) -> Result<ListAuditEventsResponse, ApiError> {
    AuthorizationService::require(user, AUDIT_READ)?;

    let (subject_kind, subject_id): (Option<SubjectKind>, Option<i64>) =
        if let Some(ticket_id) = request.ticket_id {
            (Some(SubjectKind::Ticket), Some(ticket_id))
        } else {
            let kind: Option<SubjectKind> = request
                .subject_type
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    SubjectKind::parse_str(&s.to_ascii_lowercase()).ok_or_else(|| {
                        ApiError::InvalidInput {
                            field: String::from("subject_type"),
                            message: format!("Unknown subject type '{s}'"),
                        }
                    })
                })
                .transpose()?;
            (kind, request.subject_id)
        };

    let filter = AuditEventFilter {
        subject_kind,
        subject_id,
        actor_user_id: request.actor_user_id,
        action: request
            .action
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_ascii_uppercase),
        from: parse_timestamp_field("from", request.from.as_deref())?,
        to: parse_timestamp_field("to", request.to.as_deref())?,
    };

    let page: Page<AuditEvent> =
        persistence.list_audit_events(&filter, page_request(request.page, request.page_size))?;

    Ok(ListAuditEventsResponse {
        items: page.items.iter().map(AuditEventInfo::from).collect(),
        page: PageInfo::of(&page),
    })
}

/// Returns one audit event. Requires `audit.read`.
///
/// # Errors
///
/// Returns `PermissionDenied` or `ResourceNotFound`.
pub fn get_audit_event(
    persistence: &mut SqlitePersistence,
    event_id: i64,
    user: &AuthenticatedUser,
) -> Result<AuditEventInfo, ApiError> {
    AuthorizationService::require(user, AUDIT_READ)?;

    let event: AuditEvent = persistence.get_audit_event(event_id)?;
    Ok(AuditEventInfo::from(&event))
}
