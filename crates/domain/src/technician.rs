// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::error::DomainError;
use serde::{Deserialize, Serialize};

const MAX_TECHNICIAN_NAME_LENGTH: usize = 100;

/// A field technician who can be assigned tickets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Technician {
    /// Database identifier, `None` until persisted.
    pub technician_id: Option<i64>,
    pub name: String,
    pub center_id: Option<String>,
    pub is_active: bool,
}

impl Technician {
    /// Creates a new active technician.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTechnicianName` if the name is empty or
    /// too long after trimming.
    pub fn new(name: &str, center_id: Option<String>) -> Result<Self, DomainError> {
        Ok(Self {
            technician_id: None,
            name: validate_technician_name(name)?,
            center_id: center_id.filter(|c| !c.trim().is_empty()),
            is_active: true,
        })
    }
}

/// Trims and validates a technician name.
///
/// # Errors
///
/// Returns `DomainError::InvalidTechnicianName` if the name is empty or too long.
pub fn validate_technician_name(name: &str) -> Result<String, DomainError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::InvalidTechnicianName(String::from(
            "Name cannot be empty",
        )));
    }
    if trimmed.chars().count() > MAX_TECHNICIAN_NAME_LENGTH {
        return Err(DomainError::InvalidTechnicianName(format!(
            "Name cannot exceed {MAX_TECHNICIAN_NAME_LENGTH} characters"
        )));
    }
    Ok(trimmed.to_string())
}
