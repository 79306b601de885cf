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

mod assignment;
mod error;
pub mod permission;
mod rbac;
mod role;
mod technician;
mod ticket;
mod ticket_image;
mod ticket_status;
mod timestamp;
mod validation;

#[cfg(test)]
mod tests;

pub use assignment::{
    AssignmentMethod, AssignmentPolicy, DEFAULT_WINDOW_DAYS, TechnicianLoad, select_least_loaded,
};
pub use error::{DomainError, TransitionRejection};
pub use permission::{Permission, PermissionCatalog, SystemRole};
pub use rbac::{PermissionMode, aggregate_permissions, missing_permissions};
pub use role::{
    PermissionDiff, Role, validate_role_deletion, validate_role_name, validate_role_update,
};
pub use technician::{Technician, validate_technician_name};
pub use ticket::Ticket;
pub use ticket_image::{
    DEFAULT_ALLOWED_EXTENSIONS, DEFAULT_MAX_UPLOAD_BYTES, ImageType, TicketImage, UploadPolicy,
};
pub use ticket_status::TicketStatus;
pub use timestamp::{format_date, format_timestamp, parse_date, parse_timestamp};
pub use validation::{
    BookingRequest, ValidatedBooking, hash_phone, sha256_hex, validate_booking, validate_email,
    validate_time_slot,
};
