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

mod apply;
mod command;
mod error;
mod state;

#[cfg(test)]
mod tests;

// Re-export public types and functions
pub use apply::{
    apply, apply_booking, apply_role, apply_role_creation, apply_technician_creation,
    apply_technician_update, apply_user_roles,
};
pub use command::{RoleCommand, TechnicianUpdate, TicketCommand};
pub use error::CoreError;
pub use state::{
    RoleState, RoleTransition, TechnicianTransition, TicketState, TransitionResult, role_snapshot,
    technician_snapshot, ticket_snapshot,
};
