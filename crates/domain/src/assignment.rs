// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Least-loaded technician selection.
//!
//! A technician's load is the number of tickets currently assigned to them
//! whose appointment date falls within the trailing window ending today.
//! Canceled tickets drop their technician and so never count.

use serde::{Deserialize, Serialize};
use time::{Date, Duration};

/// Default trailing window, in days.
pub const DEFAULT_WINDOW_DAYS: u32 = 7;

/// How a technician ended up on a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentMethod {
    Manual,
    Auto,
}

impl AssignmentMethod {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Auto => "auto",
        }
    }
}

/// Tunables for auto-assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignmentPolicy {
    pub window_days: u32,
}

impl Default for AssignmentPolicy {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
        }
    }
}

impl AssignmentPolicy {
    #[must_use]
    pub const fn new(window_days: u32) -> Self {
        Self { window_days }
    }

    /// The inclusive `[start, end]` appointment-date range that counts toward load.
    #[must_use]
    pub fn window(&self, today: Date) -> (Date, Date) {
        let start = today
            .checked_sub(Duration::days(i64::from(self.window_days)))
            .unwrap_or(Date::MIN);
        (start, today)
    }
}

/// A candidate technician and their current load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TechnicianLoad {
    pub technician_id: i64,
    pub load: i64,
}

/// Picks the candidate with the lowest load, breaking ties by lowest id.
///
/// Callers are responsible for filtering candidates down to active
/// technicians of the right center. Returns `None` when there are none.
#[must_use]
pub fn select_least_loaded(candidates: &[TechnicianLoad]) -> Option<i64> {
    candidates
        .iter()
        .min_by_key(|c| (c.load, c.technician_id))
        .map(|c| c.technician_id)
}
