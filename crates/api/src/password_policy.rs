// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Password rules for staff accounts.

use thiserror::Error;

/// Password policy errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PasswordPolicyError {
    /// Password is too short.
    #[error("Password must be at least {min_length} characters long")]
    TooShort { min_length: usize },

    /// Password does not mix enough character classes.
    #[error(
        "Password must contain at least {required} of: uppercase letter, lowercase letter, digit, symbol (found {found})"
    )]
    InsufficientComplexity { required: usize, found: usize },

    /// Password repeats account details.
    #[error("Password must not match the account {field}")]
    MatchesAccountField { field: String },
}

/// Password policy configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    /// Minimum password length in characters.
    pub min_length: usize,
    /// Minimum number of character classes required (out of 4).
    pub min_complexity: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 12,
            min_complexity: 3,
        }
    }
}

impl PasswordPolicy {
    /// Validates a password for a new or existing account.
    ///
    /// # Arguments
    ///
    /// * `password` - The candidate password
    /// * `email` - The account email; neither it nor its local part may be used
    /// * `display_name` - The account display name
    ///
    /// # Errors
    ///
    /// Returns a `PasswordPolicyError` describing the first rule broken.
    pub fn validate(
        &self,
        password: &str,
        email: &str,
        display_name: &str,
    ) -> Result<(), PasswordPolicyError> {
        if password.chars().count() < self.min_length {
            return Err(PasswordPolicyError::TooShort {
                min_length: self.min_length,
            });
        }

        let found: usize = Self::character_classes(password);
        if found < self.min_complexity {
            return Err(PasswordPolicyError::InsufficientComplexity {
                required: self.min_complexity,
                found,
            });
        }

        let candidate: String = password.to_lowercase();
        let email: String = email.trim().to_lowercase();
        let local_part: &str = email.split('@').next().unwrap_or_default();
        if candidate == email || candidate == local_part {
            return Err(PasswordPolicyError::MatchesAccountField {
                field: String::from("email"),
            });
        }
        if candidate == display_name.trim().to_lowercase() {
            return Err(PasswordPolicyError::MatchesAccountField {
                field: String::from("display_name"),
            });
        }

        Ok(())
    }

    /// Counts the character classes present: upper, lower, digit, symbol.
    fn character_classes(password: &str) -> usize {
        let checks: [fn(&char) -> bool; 4] = [
            char::is_ascii_uppercase,
            char::is_ascii_lowercase,
            char::is_ascii_digit,
            |c: &char| !c.is_alphanumeric() && !c.is_whitespace(),
        ];
        checks
            .iter()
            .filter(|check| password.chars().any(|c| check(&c)))
            .count()
    }
}
