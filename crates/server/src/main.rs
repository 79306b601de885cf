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
    clippy::all,
    clippy::suspicious,
    clippy::complexity,
    clippy::perf,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(clippy::multiple_crate_versions)]

mod session;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State as AxumState},
    http::{
        HeaderMap, StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use clap::Parser;
use num_traits::ToPrimitive;
use repairdesk_api::{
    ApiError, AssignRolesRequest, AssignRolesResponse, AssignTicketRequest, AuditEventInfo,
    CancelTicketRequest, CreateRoleRequest, CreateTechnicianRequest, CreateUserRequest,
    DEFAULT_SESSION_TTL_HOURS, DeleteRoleResponse, ListAuditEventsRequest,
    ListAuditEventsResponse, ListPermissionsResponse, ListRolesResponse, ListTechniciansRequest,
    ListTechniciansResponse, ListTicketImagesResponse, ListTicketsRequest, ListTicketsResponse,
    ListUsersResponse, LoginRequest, LoginResponse, RoleInfo, RoleWriteResponse,
    SelectTechnicianResponse, ServiceConfig, SetUserActiveRequest, SubmitBookingRequest,
    SubmitBookingResponse, TechnicianWriteResponse, TicketDetailResponse, TicketImageDownload,
    TicketWriteResponse,
    UpdateRoleRequest, UpdateTechnicianRequest, UploadImageRequest, UserInfo, VersionedRequest,
    WhoAmIResponse,
};
use repairdesk_domain::{DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_WINDOW_DAYS, PermissionCatalog};
use repairdesk_persistence::SqlitePersistence;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use session::{RequestCause, SessionUser};

/// Default upload limit in mebibytes.
const DEFAULT_MAX_UPLOAD_MB: u64 = DEFAULT_MAX_UPLOAD_BYTES / (1024 * 1024);

/// Repair desk server - HTTP back office for field repair tickets
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the `SQLite` database file. If not provided, uses in-memory database.
    #[arg(short, long)]
    database: Option<String>,

    /// Port to bind the server to
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// Address to bind the server to
    #[arg(long, default_value = "127.0.0.1")]
    bind: IpAddr,

    /// Directory for uploaded ticket images
    #[arg(long, default_value = "uploads")]
    upload_dir: PathBuf,

    /// Maximum size of one uploaded image, in MiB
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_MB)]
    max_upload_mb: u64,

    /// Trailing window, in days, used to count technician load
    #[arg(long, default_value_t = DEFAULT_WINDOW_DAYS)]
    assignment_window_days: u32,

    /// How long a login session stays valid, in hours
    #[arg(long, default_value_t = DEFAULT_SESSION_TTL_HOURS)]
    session_ttl_hours: u32,

    /// Email of the bootstrap administrator, created if absent
    #[arg(long, requires = "admin_password")]
    admin_email: Option<String>,

    /// Password of the bootstrap administrator
    #[arg(long, requires = "admin_email")]
    admin_password: Option<String>,
}

/// Application state shared across handlers.
///
/// The persistence layer is wrapped in a Mutex; the configuration and the
/// permission catalog are read-only after start-up.
#[derive(Clone)]
struct AppState {
    /// The persistence layer.
    persistence: Arc<Mutex<SqlitePersistence>>,
    /// Runtime policy.
    config: Arc<ServiceConfig>,
    /// The permission catalog seeded at start-up.
    catalog: Arc<PermissionCatalog>,
}

/// Query string of an image upload. The body is the raw file.
#[derive(Debug, Deserialize)]
struct UploadQuery {
    /// `RECEIPT`, `BEFORE`, `AFTER` or `PARTS`.
    image_type: String,
    /// The original file name.
    file_name: String,
}

/// Query string of a technician suggestion.
#[derive(Debug, Deserialize)]
struct SuggestionQuery {
    /// The center to pick from. All centers when absent.
    center_id: Option<String>,
}

/// Error response type.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ErrorResponse {
    /// Error indicator.
    error: bool,
    /// Error message.
    message: String,
}

/// HTTP error wrapper that implements `IntoResponse`.
struct HttpError {
    /// The HTTP status code.
    status: StatusCode,
    /// The error message.
    message: String,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body: Json<ErrorResponse> = Json(ErrorResponse {
            error: true,
            message: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<ApiError> for HttpError {
    fn from(err: ApiError) -> Self {
        let status: StatusCode = match &err {
            ApiError::AuthenticationFailed { .. } => StatusCode::UNAUTHORIZED,
            ApiError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            ApiError::VersionConflict { .. }
            | ApiError::RoleInUse { .. }
            | ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::InvalidTransition { .. }
            | ApiError::ProtectedRole { .. }
            | ApiError::NoTechnicianAvailable { .. }
            | ApiError::DomainRuleViolation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InvalidInput { .. } | ApiError::PasswordPolicyViolation { .. } => {
                StatusCode::BAD_REQUEST
            }
            ApiError::ResourceNotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Internal { .. } => {
                error!(error = %err, "Internal error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

fn now() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

// ========================================================================
// Authentication
// ========================================================================

/// Handler for POST `/auth/login`.
async fn handle_login(
    AxumState(app_state): AxumState<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, HttpError> {
    info!("Handling login request");

    let mut persistence = app_state.persistence.lock().await;
    let response = repairdesk_api::login(&mut persistence, &app_state.config, &req, now())?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for POST `/auth/logout`.
async fn handle_logout(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(user, token): SessionUser,
) -> Result<StatusCode, HttpError> {
    info!(user_id = user.user_id, "Handling logout request");

    let mut persistence = app_state.persistence.lock().await;
    repairdesk_api::logout(&mut persistence, &token)?;

    Ok(StatusCode::NO_CONTENT)
}

/// Handler for GET `/auth/whoami`.
async fn handle_whoami(SessionUser(user, _): SessionUser) -> Json<WhoAmIResponse> {
    Json(repairdesk_api::whoami(&user))
}

// ========================================================================
// Bookings & Tickets
// ========================================================================

/// Handler for POST `/bookings`. No session required.
async fn handle_submit_booking(
    AxumState(app_state): AxumState<AppState>,
    RequestCause(cause): RequestCause,
    Json(req): Json<SubmitBookingRequest>,
) -> Result<Json<SubmitBookingResponse>, HttpError> {
    info!("Handling submit_booking request");

    let mut persistence = app_state.persistence.lock().await;
    let response = repairdesk_api::submit_booking(&mut persistence, &req, cause, now())?;
    drop(persistence);

    info!(
        ticket_id = response.ticket_id,
        reference = %response.booking_reference,
        "Booking accepted"
    );
    Ok(Json(response))
}

/// Handler for GET `/tickets`.
async fn handle_list_tickets(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(user, _): SessionUser,
    Query(query): Query<ListTicketsRequest>,
) -> Result<Json<ListTicketsResponse>, HttpError> {
    debug!(user_id = user.user_id, "Handling list_tickets request");

    let mut persistence = app_state.persistence.lock().await;
    let response = repairdesk_api::list_tickets(&mut persistence, &query, &user)?;

    Ok(Json(response))
}

/// Handler for GET `/tickets/{ticket_id}`.
async fn handle_get_ticket(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(user, _): SessionUser,
    Path(ticket_id): Path<i64>,
) -> Result<Json<TicketDetailResponse>, HttpError> {
    debug!(user_id = user.user_id, ticket_id, "Handling get_ticket request");

    let mut persistence = app_state.persistence.lock().await;
    let response = repairdesk_api::get_ticket_detail(&mut persistence, ticket_id, &user)?;

    Ok(Json(response))
}

/// Handler for POST `/tickets/{ticket_id}/confirm`.
async fn handle_confirm_ticket(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(user, _): SessionUser,
    RequestCause(cause): RequestCause,
    Path(ticket_id): Path<i64>,
    Json(req): Json<VersionedRequest>,
) -> Result<Json<TicketWriteResponse>, HttpError> {
    info!(user_id = user.user_id, ticket_id, "Handling confirm_ticket request");

    let mut persistence = app_state.persistence.lock().await;
    let response =
        repairdesk_api::confirm_ticket(&mut persistence, ticket_id, req, &user, cause, now())?;

    Ok(Json(response))
}

/// Handler for POST `/tickets/{ticket_id}/assign`.
async fn handle_assign_ticket(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(user, _): SessionUser,
    RequestCause(cause): RequestCause,
    Path(ticket_id): Path<i64>,
    Json(req): Json<AssignTicketRequest>,
) -> Result<Json<TicketWriteResponse>, HttpError> {
    info!(
        user_id = user.user_id,
        ticket_id,
        technician_id = ?req.technician_id,
        "Handling assign_ticket request"
    );

    let mut persistence = app_state.persistence.lock().await;
    let response = repairdesk_api::assign_ticket(
        &mut persistence,
        &app_state.config,
        ticket_id,
        &req,
        &user,
        cause,
        now(),
    )?;

    Ok(Json(response))
}

/// Handler for POST `/tickets/{ticket_id}/images`.
///
/// The body is the raw file; `Content-Type` is its MIME type.
async fn handle_upload_image(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(user, _): SessionUser,
    RequestCause(cause): RequestCause,
    Path(ticket_id): Path<i64>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<TicketWriteResponse>, HttpError> {
    info!(
        user_id = user.user_id,
        ticket_id,
        image_type = %query.image_type,
        size = body.len(),
        "Handling upload_image request"
    );

    let mime_type: String = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or_default().trim().to_string())
        .unwrap_or_default();

    let req = UploadImageRequest {
        image_type: query.image_type,
        file_name: query.file_name,
        mime_type,
        contents: body.to_vec(),
    };

    let mut persistence = app_state.persistence.lock().await;
    let response = repairdesk_api::upload_ticket_image(
        &mut persistence,
        &app_state.config,
        ticket_id,
        &req,
        &user,
        cause,
        now(),
    )?;

    Ok(Json(response))
}

/// Handler for GET `/tickets/{ticket_id}/images`.
async fn handle_list_ticket_images(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(user, _): SessionUser,
    Path(ticket_id): Path<i64>,
) -> Result<Json<ListTicketImagesResponse>, HttpError> {
    debug!(user_id = user.user_id, ticket_id, "Handling list_ticket_images request");

    let mut persistence = app_state.persistence.lock().await;
    let response = repairdesk_api::list_ticket_images(&mut persistence, ticket_id, &user)?;

    Ok(Json(response))
}

/// Handler for GET `/files/ticket-images/{image_id}`.
///
/// Streams the stored bytes back with the image's MIME type.
async fn handle_download_ticket_image(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(user, _): SessionUser,
    Path(image_id): Path<i64>,
) -> Result<Response, HttpError> {
    debug!(user_id = user.user_id, image_id, "Handling download_ticket_image request");

    let mut persistence = app_state.persistence.lock().await;
    let download: TicketImageDownload = repairdesk_api::download_ticket_image(
        &mut persistence,
        &app_state.config,
        image_id,
        &user,
    )?;
    drop(persistence);

    let disposition: String = format!(
        "inline; filename=\"{}\"",
        download.image.file_name.replace(['"', '\\', '\r', '\n'], "_")
    );
    Ok((
        [
            (CONTENT_TYPE, download.image.mime_type),
            (CONTENT_DISPOSITION, disposition),
        ],
        download.contents,
    )
        .into_response())
}

/// Handler for POST `/tickets/{ticket_id}/complete`.
async fn handle_complete_ticket(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(user, _): SessionUser,
    RequestCause(cause): RequestCause,
    Path(ticket_id): Path<i64>,
    Json(req): Json<VersionedRequest>,
) -> Result<Json<TicketWriteResponse>, HttpError> {
    info!(user_id = user.user_id, ticket_id, "Handling complete_ticket request");

    let mut persistence = app_state.persistence.lock().await;
    let response =
        repairdesk_api::complete_ticket(&mut persistence, ticket_id, req, &user, cause, now())?;

    Ok(Json(response))
}

/// Handler for POST `/tickets/{ticket_id}/cancel`.
async fn handle_cancel_ticket(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(user, _): SessionUser,
    RequestCause(cause): RequestCause,
    Path(ticket_id): Path<i64>,
    Json(req): Json<CancelTicketRequest>,
) -> Result<Json<TicketWriteResponse>, HttpError> {
    info!(user_id = user.user_id, ticket_id, "Handling cancel_ticket request");

    let mut persistence = app_state.persistence.lock().await;
    let response =
        repairdesk_api::cancel_ticket(&mut persistence, ticket_id, &req, &user, cause, now())?;

    Ok(Json(response))
}

// ========================================================================
// Technicians
// ========================================================================

/// Handler for GET `/technicians`.
async fn handle_list_technicians(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(user, _): SessionUser,
    Query(query): Query<ListTechniciansRequest>,
) -> Result<Json<ListTechniciansResponse>, HttpError> {
    debug!(user_id = user.user_id, "Handling list_technicians request");

    let mut persistence = app_state.persistence.lock().await;
    let response = repairdesk_api::list_technicians(&mut persistence, &query, &user)?;

    Ok(Json(response))
}

/// Handler for POST `/technicians`.
async fn handle_create_technician(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(user, _): SessionUser,
    RequestCause(cause): RequestCause,
    Json(req): Json<CreateTechnicianRequest>,
) -> Result<Json<TechnicianWriteResponse>, HttpError> {
    info!(user_id = user.user_id, "Handling create_technician request");

    let mut persistence = app_state.persistence.lock().await;
    let response =
        repairdesk_api::create_technician(&mut persistence, &req, &user, cause, now())?;

    Ok(Json(response))
}

/// Handler for PUT `/technicians/{technician_id}`.
async fn handle_update_technician(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(user, _): SessionUser,
    RequestCause(cause): RequestCause,
    Path(technician_id): Path<i64>,
    Json(req): Json<UpdateTechnicianRequest>,
) -> Result<Json<TechnicianWriteResponse>, HttpError> {
    info!(user_id = user.user_id, technician_id, "Handling update_technician request");

    let mut persistence = app_state.persistence.lock().await;
    let response = repairdesk_api::update_technician(
        &mut persistence,
        technician_id,
        &req,
        &user,
        cause,
        now(),
    )?;

    Ok(Json(response))
}

/// Handler for GET `/technicians/suggestion`.
async fn handle_suggest_technician(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(user, _): SessionUser,
    Query(query): Query<SuggestionQuery>,
) -> Result<Json<SelectTechnicianResponse>, HttpError> {
    debug!(user_id = user.user_id, center_id = ?query.center_id, "Handling suggest_technician request");

    let mut persistence = app_state.persistence.lock().await;
    let response = repairdesk_api::suggest_technician(
        &mut persistence,
        &app_state.config,
        query.center_id,
        &user,
        now(),
    )?;

    Ok(Json(response))
}

// ========================================================================
// Permissions, Roles & Users
// ========================================================================

/// Handler for GET `/permissions`.
async fn handle_list_permissions(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(user, _): SessionUser,
) -> Result<Json<ListPermissionsResponse>, HttpError> {
    let mut persistence = app_state.persistence.lock().await;
    let response = repairdesk_api::list_permissions(&mut persistence, &user)?;

    Ok(Json(response))
}

/// Handler for GET `/roles`.
async fn handle_list_roles(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(user, _): SessionUser,
) -> Result<Json<ListRolesResponse>, HttpError> {
    let mut persistence = app_state.persistence.lock().await;
    let response = repairdesk_api::list_roles(&mut persistence, &user)?;

    Ok(Json(response))
}

/// Handler for GET `/roles/{role_id}`.
async fn handle_get_role(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(user, _): SessionUser,
    Path(role_id): Path<i64>,
) -> Result<Json<RoleInfo>, HttpError> {
    let mut persistence = app_state.persistence.lock().await;
    let response = repairdesk_api::get_role(&mut persistence, role_id, &user)?;

    Ok(Json(response))
}

/// Handler for POST `/roles`.
async fn handle_create_role(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(user, _): SessionUser,
    RequestCause(cause): RequestCause,
    Json(req): Json<CreateRoleRequest>,
) -> Result<Json<RoleWriteResponse>, HttpError> {
    info!(user_id = user.user_id, name = %req.name, "Handling create_role request");

    let mut persistence = app_state.persistence.lock().await;
    let response = repairdesk_api::create_role(
        &mut persistence,
        &app_state.catalog,
        &req,
        &user,
        cause,
        now(),
    )?;

    Ok(Json(response))
}

/// Handler for PUT `/roles/{role_id}`.
async fn handle_update_role(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(user, _): SessionUser,
    RequestCause(cause): RequestCause,
    Path(role_id): Path<i64>,
    Json(req): Json<UpdateRoleRequest>,
) -> Result<Json<RoleWriteResponse>, HttpError> {
    info!(user_id = user.user_id, role_id, "Handling update_role request");

    let mut persistence = app_state.persistence.lock().await;
    let response = repairdesk_api::update_role(
        &mut persistence,
        &app_state.catalog,
        role_id,
        &req,
        &user,
        cause,
        now(),
    )?;

    Ok(Json(response))
}

/// Handler for DELETE `/roles/{role_id}`.
async fn handle_delete_role(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(user, _): SessionUser,
    RequestCause(cause): RequestCause,
    Path(role_id): Path<i64>,
) -> Result<Json<DeleteRoleResponse>, HttpError> {
    info!(user_id = user.user_id, role_id, "Handling delete_role request");

    let mut persistence = app_state.persistence.lock().await;
    let response = repairdesk_api::delete_role(
        &mut persistence,
        &app_state.catalog,
        role_id,
        &user,
        cause,
        now(),
    )?;

    Ok(Json(response))
}

/// Handler for GET `/users`.
async fn handle_list_users(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(user, _): SessionUser,
) -> Result<Json<ListUsersResponse>, HttpError> {
    let mut persistence = app_state.persistence.lock().await;
    let response = repairdesk_api::list_users(&mut persistence, &user)?;

    Ok(Json(response))
}

/// Handler for POST `/users`.
async fn handle_create_user(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(user, _): SessionUser,
    RequestCause(cause): RequestCause,
    Json(req): Json<CreateUserRequest>,
) -> Result<Json<UserInfo>, HttpError> {
    info!(user_id = user.user_id, "Handling create_user request");

    let mut persistence = app_state.persistence.lock().await;
    let response = repairdesk_api::create_user(
        &mut persistence,
        &app_state.config,
        &req,
        &user,
        cause,
        now(),
    )?;

    Ok(Json(response))
}

/// Handler for PUT `/users/{user_id}/roles`.
async fn handle_assign_roles(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(user, _): SessionUser,
    RequestCause(cause): RequestCause,
    Path(user_id): Path<i64>,
    Json(req): Json<AssignRolesRequest>,
) -> Result<Json<AssignRolesResponse>, HttpError> {
    info!(
        user_id = user.user_id,
        target_user_id = user_id,
        "Handling assign_roles request"
    );

    let mut persistence = app_state.persistence.lock().await;
    let response = repairdesk_api::assign_roles_to_user(
        &mut persistence,
        user_id,
        &req,
        &user,
        cause,
        now(),
    )?;

    Ok(Json(response))
}

/// Handler for PUT `/users/{user_id}/active`.
async fn handle_set_user_active(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(user, _): SessionUser,
    Path(user_id): Path<i64>,
    Json(req): Json<SetUserActiveRequest>,
) -> Result<Json<UserInfo>, HttpError> {
    info!(
        user_id = user.user_id,
        target_user_id = user_id,
        is_active = req.is_active,
        "Handling set_user_active request"
    );

    let mut persistence = app_state.persistence.lock().await;
    let response = repairdesk_api::set_user_active(&mut persistence, user_id, req, &user)?;

    Ok(Json(response))
}

// ========================================================================
// Audit
// ========================================================================

/// Handler for GET `/audit/events`.
async fn handle_list_audit_events(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(user, _): SessionUser,
    Query(query): Query<ListAuditEventsRequest>,
) -> Result<Json<ListAuditEventsResponse>, HttpError> {
    debug!(user_id = user.user_id, "Handling list_audit_events request");

    let mut persistence = app_state.persistence.lock().await;
    let response = repairdesk_api::list_audit_events(&mut persistence, &query, &user)?;

    Ok(Json(response))
}

/// Handler for GET `/audit/events/{event_id}`.
async fn handle_get_audit_event(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(user, _): SessionUser,
    Path(event_id): Path<i64>,
) -> Result<Json<AuditEventInfo>, HttpError> {
    debug!(user_id = user.user_id, event_id, "Handling get_audit_event request");

    let mut persistence = app_state.persistence.lock().await;
    let response = repairdesk_api::get_audit_event(&mut persistence, event_id, &user)?;

    Ok(Json(response))
}

/// Builds the application router with all endpoints.
fn build_router(app_state: AppState) -> Router {
    // Room for the image plus request framing; the exact cap is enforced
    // by the upload policy.
    let upload_limit: usize = app_state
        .config
        .upload
        .max_bytes
        .saturating_add(64 * 1024)
        .to_usize()
        .unwrap_or(usize::MAX);

    Router::new()
        .route("/auth/login", post(handle_login))
        .route("/auth/logout", post(handle_logout))
        .route("/auth/whoami", get(handle_whoami))
        .route("/bookings", post(handle_submit_booking))
        .route("/tickets", get(handle_list_tickets))
        .route("/tickets/{ticket_id}", get(handle_get_ticket))
        .route("/tickets/{ticket_id}/confirm", post(handle_confirm_ticket))
        .route("/tickets/{ticket_id}/assign", post(handle_assign_ticket))
        .route(
            "/tickets/{ticket_id}/images",
            post(handle_upload_image)
                .layer(DefaultBodyLimit::max(upload_limit))
                .get(handle_list_ticket_images),
        )
        .route(
            "/files/ticket-images/{image_id}",
            get(handle_download_ticket_image),
        )
        .route("/tickets/{ticket_id}/complete", post(handle_complete_ticket))
        .route("/tickets/{ticket_id}/cancel", post(handle_cancel_ticket))
        .route(
            "/technicians",
            get(handle_list_technicians).post(handle_create_technician),
        )
        .route("/technicians/suggestion", get(handle_suggest_technician))
        .route("/technicians/{technician_id}", put(handle_update_technician))
        .route("/permissions", get(handle_list_permissions))
        .route("/roles", get(handle_list_roles).post(handle_create_role))
        .route(
            "/roles/{role_id}",
            get(handle_get_role)
                .put(handle_update_role)
                .delete(handle_delete_role),
        )
        .route("/users", get(handle_list_users).post(handle_create_user))
        .route("/users/{user_id}/roles", put(handle_assign_roles))
        .route("/users/{user_id}/active", put(handle_set_user_active))
        .route("/audit/events", get(handle_list_audit_events))
        .route("/audit/events/{event_id}", get(handle_get_audit_event))
        .with_state(app_state)
}

/// Seeds the catalog and the optional bootstrap administrator.
fn initialize(
    persistence: &mut SqlitePersistence,
    catalog: &PermissionCatalog,
    admin: Option<(&str, &str)>,
    now: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let report = persistence.seed_catalog(catalog, now)?;
    info!(
        permissions_added = report.permissions_added,
        roles_created = report.roles_created,
        "Seeded permission catalog"
    );

    if let Some((email, password)) = admin {
        if persistence.ensure_admin_user(email, password, now)?.is_none() {
            debug!(email, "Bootstrap administrator already exists");
        }
    }

    let removed: usize = persistence.delete_expired_sessions(now)?;
    if removed > 0 {
        info!(removed, "Removed expired sessions");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command-line arguments
    let args: Args = Args::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Initializing repair desk server");

    // Initialize persistence (in-memory or file-based based on CLI argument)
    let mut persistence: SqlitePersistence = if let Some(db_path) = &args.database {
        info!("Using file-based database at: {}", db_path);
        SqlitePersistence::new_with_file(db_path)?
    } else {
        info!("Using in-memory database");
        SqlitePersistence::new_in_memory()?
    };

    let catalog: PermissionCatalog = PermissionCatalog::standard();
    let admin: Option<(&str, &str)> = args
        .admin_email
        .as_deref()
        .zip(args.admin_password.as_deref());
    initialize(
        &mut persistence,
        &catalog,
        admin,
        &repairdesk_domain::format_timestamp(now()),
    )?;

    let config: ServiceConfig = ServiceConfig::new(args.upload_dir)
        .with_assignment_window_days(args.assignment_window_days)
        .with_max_upload_mb(args.max_upload_mb)
        .with_session_ttl_hours(args.session_ttl_hours);
    info!(
        upload_dir = %config.upload_dir.display(),
        max_upload_bytes = config.upload.max_bytes,
        window_days = config.assignment.window_days,
        "Loaded service configuration"
    );

    let app_state: AppState = AppState {
        persistence: Arc::new(Mutex::new(persistence)),
        config: Arc::new(config),
        catalog: Arc::new(catalog),
    };

    // Build router
    let app: Router = build_router(app_state);

    // Bind to address
    let addr: SocketAddr = SocketAddr::new(args.bind, args.port);
    info!("Server listening on {}", addr);

    // Run server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests;
