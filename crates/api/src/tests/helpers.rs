// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Test helper functions and fixtures.

use repairdesk_audit::Cause;
use repairdesk_domain::{PermissionCatalog, Role};
use repairdesk_persistence::{Persistence, SqlitePersistence, UserData};
use tempfile::TempDir;
use time::OffsetDateTime;
use time::macros::datetime;

use crate::{
    AssignTicketRequest, AuthenticatedUser, CreateTechnicianRequest, ServiceConfig,
    SubmitBookingRequest, TicketWriteResponse, UploadImageRequest, VersionedRequest,
    assign_ticket, confirm_ticket, create_technician, submit_booking, upload_ticket_image,
};

pub const NOW: OffsetDateTime = datetime!(2026-03-02 09:00:00 UTC);
pub const STRONG_PASSWORD: &str = "Correct-Horse-42";

/// A seeded database, a private upload directory and the standard catalog.
pub struct TestEnv {
    pub persistence: SqlitePersistence,
    pub config: ServiceConfig,
    pub catalog: PermissionCatalog,
    _upload_dir: TempDir,
}

pub fn setup() -> TestEnv {
    let catalog = PermissionCatalog::standard();
    let mut persistence = Persistence::new_in_memory().unwrap();
    persistence.seed_catalog(&catalog, "2026-03-01T00:00:00Z").unwrap();
    let upload_dir = tempfile::tempdir().expect("tempdir");
    let config = ServiceConfig::new(upload_dir.path());
    TestEnv {
        persistence,
        config,
        catalog,
        _upload_dir: upload_dir,
    }
}

pub fn create_test_cause() -> Cause {
    Cause::new(String::from("api-req-1"), String::from("API request"))
}

/// Creates a user holding the named roles and returns their session context.
pub fn user_with_roles(env: &mut TestEnv, email: &str, role_names: &[&str]) -> AuthenticatedUser {
    let user_id = env
        .persistence
        .create_user(email, email, STRONG_PASSWORD, "2026-03-01T00:00:00Z")
        .unwrap();
    let role_ids: Vec<i64> = role_names
        .iter()
        .map(|name| {
            env.persistence
                .get_role_by_name(name)
                .unwrap()
                .and_then(|r| r.role_id)
                .unwrap()
        })
        .collect();
    if !role_ids.is_empty() {
        env.persistence
            .replace_user_roles(user_id, &role_ids, |before, after| {
                repairdesk::apply_user_roles(
                    user_id,
                    before,
                    after,
                    repairdesk_audit::Actor::system(),
                    create_test_cause(),
                    "2026-03-01T00:00:00Z",
                )
            })
            .unwrap();
    }
    reload_user(env, user_id)
}

/// Re-reads a user's roles the way session validation does.
pub fn reload_user(env: &mut TestEnv, user_id: i64) -> AuthenticatedUser {
    let user: UserData = env.persistence.get_user_by_id(user_id).unwrap().unwrap();
    let roles: Vec<Role> = env.persistence.user_roles(user_id).unwrap();
    AuthenticatedUser::from_roles(&user, &roles)
}

pub fn create_admin(env: &mut TestEnv) -> AuthenticatedUser {
    user_with_roles(env, "admin@example.com", &["admin"])
}

pub fn create_agent(env: &mut TestEnv) -> AuthenticatedUser {
    user_with_roles(env, "agent@example.com", &["agent"])
}

pub fn create_viewer(env: &mut TestEnv) -> AuthenticatedUser {
    user_with_roles(env, "viewer@example.com", &["viewer"])
}

pub fn booking_request(customer_name: &str, center_id: Option<&str>) -> SubmitBookingRequest {
    SubmitBookingRequest {
        customer_name: customer_name.to_string(),
        customer_phone: String::from("+1 555 0100"),
        address: String::from("1 Main Street"),
        appointment_date: String::from("2026-03-02"),
        appointment_time_slot: String::from("10:00"),
        issue_description: String::from("Dishwasher will not drain"),
        center_id: center_id.map(str::to_string),
    }
}

/// Books a ticket through the public operation and returns its ID.
pub fn book(env: &mut TestEnv, customer_name: &str, center_id: Option<&str>) -> i64 {
    submit_booking(
        &mut env.persistence,
        &booking_request(customer_name, center_id),
        create_test_cause(),
        NOW,
    )
    .unwrap()
    .ticket_id
}

pub fn add_technician(
    env: &mut TestEnv,
    admin: &AuthenticatedUser,
    name: &str,
    center_id: Option<&str>,
) -> i64 {
    create_technician(
        &mut env.persistence,
        &CreateTechnicianRequest {
            name: name.to_string(),
            center_id: center_id.map(str::to_string),
        },
        admin,
        create_test_cause(),
        NOW,
    )
    .unwrap()
    .technician
    .technician_id
}

pub fn confirm(env: &mut TestEnv, user: &AuthenticatedUser, ticket_id: i64, version: i64) -> TicketWriteResponse {
    confirm_ticket(
        &mut env.persistence,
        ticket_id,
        VersionedRequest {
            expected_version: version,
        },
        user,
        create_test_cause(),
        NOW,
    )
    .unwrap()
}

pub fn assign_to(
    env: &mut TestEnv,
    user: &AuthenticatedUser,
    ticket_id: i64,
    version: i64,
    technician_id: Option<i64>,
) -> TicketWriteResponse {
    let config = env.config.clone();
    assign_ticket(
        &mut env.persistence,
        &config,
        ticket_id,
        &AssignTicketRequest {
            expected_version: version,
            technician_id,
            note: None,
        },
        user,
        create_test_cause(),
        NOW,
    )
    .unwrap()
}

pub fn upload_request(image_type: &str, contents: &[u8]) -> UploadImageRequest {
    UploadImageRequest {
        image_type: image_type.to_string(),
        file_name: String::from("receipt.jpg"),
        mime_type: String::from("image/jpeg"),
        contents: contents.to_vec(),
    }
}

pub fn upload(
    env: &mut TestEnv,
    user: &AuthenticatedUser,
    ticket_id: i64,
    image_type: &str,
    contents: &[u8],
) -> TicketWriteResponse {
    let config = env.config.clone();
    upload_ticket_image(
        &mut env.persistence,
        &config,
        ticket_id,
        &upload_request(image_type, contents),
        user,
        create_test_cause(),
        NOW,
    )
    .unwrap()
}

/// Books a ticket and moves it to `ASSIGNED`. Returns the ticket ID, its
/// version and the technician.
pub fn assigned_ticket(env: &mut TestEnv, admin: &AuthenticatedUser) -> (i64, i64, i64) {
    let technician_id = add_technician(env, admin, "Li Wei", Some("north"));
    let ticket_id = book(env, "Ada Lovelace", Some("north"));
    confirm(env, admin, ticket_id, 0);
    let write = assign_to(env, admin, ticket_id, 1, Some(technician_id));
    (ticket_id, write.ticket.version, technician_id)
}
