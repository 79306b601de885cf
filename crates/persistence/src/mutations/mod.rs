// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! State-changing operations.
//!
//! ## Module Organization
//!
//! - `audit` — Audit event inserts
//! - `tickets` — Bookings and transactional ticket transitions
//! - `rbac` — Role CRUD and role membership
//! - `technicians` — Technician registration and updates
//! - `users` — Users and sessions
//! - `seed` — Idempotent start-up seeding

pub mod audit;
pub mod rbac;
pub mod seed;
pub mod technicians;
pub mod tickets;
pub mod users;

pub use seed::SeedReport;
pub use tickets::TicketWrite;
