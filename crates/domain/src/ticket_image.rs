// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Default upload size cap: 8 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 8 * 1024 * 1024;

/// Default accepted file extensions.
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// What an uploaded image documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImageType {
    Receipt,
    Before,
    After,
    Parts,
}

impl ImageType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Receipt => "RECEIPT",
            Self::Before => "BEFORE",
            Self::After => "AFTER",
            Self::Parts => "PARTS",
        }
    }
}

impl FromStr for ImageType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RECEIPT" => Ok(Self::Receipt),
            "BEFORE" => Ok(Self::Before),
            "AFTER" => Ok(Self::After),
            "PARTS" => Ok(Self::Parts),
            _ => Err(DomainError::InvalidImageType {
                image_type: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for ImageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable image attached to a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketImage {
    /// Database identifier, `None` until persisted.
    pub image_id: Option<i64>,
    pub ticket_id: i64,
    pub image_type: ImageType,
    /// Original client file name.
    pub file_name: String,
    /// Path of the stored file relative to the upload root.
    pub file_path: String,
    pub mime_type: String,
    pub size_bytes: i64,
    /// SHA-256 hex of the file contents.
    pub checksum_sha256: String,
    pub uploaded_by_user_id: Option<i64>,
    pub uploaded_at: String,
}

/// Limits applied to every upload before it touches disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    pub allowed_extensions: Vec<String>,
    pub max_bytes: u64,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|e| (*e).to_string())
                .collect(),
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl UploadPolicy {
    /// Checks an upload against the policy and returns its lowercase extension.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidUpload` if the file is empty, too large,
    /// has a disallowed extension or does not declare an `image/*` MIME type.
    pub fn validate(
        &self,
        file_name: &str,
        mime_type: &str,
        size_bytes: u64,
    ) -> Result<String, DomainError> {
        if size_bytes == 0 {
            return Err(DomainError::InvalidUpload(String::from("file is empty")));
        }
        if size_bytes > self.max_bytes {
            return Err(DomainError::InvalidUpload(format!(
                "file is {size_bytes} bytes, limit is {}",
                self.max_bytes
            )));
        }

        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        if !self.allowed_extensions.iter().any(|e| *e == extension) {
            return Err(DomainError::InvalidUpload(format!(
                "extension '{extension}' is not allowed (allowed: {})",
                self.allowed_extensions.join(", ")
            )));
        }

        if !mime_type.trim().to_ascii_lowercase().starts_with("image/") {
            return Err(DomainError::InvalidUpload(format!(
                "content type '{mime_type}' is not an image"
            )));
        }

        Ok(extension)
    }
}
