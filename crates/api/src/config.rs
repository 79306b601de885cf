// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Runtime policy shared by the API operations.

use std::path::PathBuf;

use repairdesk_domain::{AssignmentPolicy, DEFAULT_WINDOW_DAYS, UploadPolicy};
use time::Duration;

use crate::password_policy::PasswordPolicy;

/// Default session lifetime in hours.
pub const DEFAULT_SESSION_TTL_HOURS: u32 = 8;

/// Settings the API needs at call time.
///
/// Built once by the server from its command line and shared read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// How technician load is measured for auto-assignment.
    pub assignment: AssignmentPolicy,
    /// Which files may be uploaded and how large they may be.
    pub upload: UploadPolicy,
    /// Root directory for stored ticket images.
    pub upload_dir: PathBuf,
    /// How long a login session stays valid.
    pub session_ttl: Duration,
    /// Rules for staff passwords.
    pub password: PasswordPolicy,
}

impl ServiceConfig {
    /// Creates a configuration with default policies rooted at `upload_dir`.
    #[must_use]
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            assignment: AssignmentPolicy::new(DEFAULT_WINDOW_DAYS),
            upload: UploadPolicy::default(),
            upload_dir: upload_dir.into(),
            session_ttl: Duration::hours(i64::from(DEFAULT_SESSION_TTL_HOURS)),
            password: PasswordPolicy::default(),
        }
    }

    /// Sets the trailing window, in days, used to count technician load.
    #[must_use]
    pub const fn with_assignment_window_days(mut self, days: u32) -> Self {
        self.assignment = AssignmentPolicy::new(days);
        self
    }

    /// Sets the maximum upload size in mebibytes.
    #[must_use]
    pub const fn with_max_upload_mb(mut self, megabytes: u64) -> Self {
        self.upload.max_bytes = megabytes.saturating_mul(1024 * 1024);
        self
    }

    /// Sets the session lifetime in hours.
    #[must_use]
    pub fn with_session_ttl_hours(mut self, hours: u32) -> Self {
        self.session_ttl = Duration::hours(i64::from(hours));
        self
    }
}
