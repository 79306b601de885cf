// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Request extractors for sessions and audit causes.
//!
//! # Authentication Flow
//!
//! 1. Extract `Authorization: Bearer <token>` header
//! 2. Validate the token via `AuthenticationService::validate_session`
//! 3. Return the user with the roles they hold right now
//!
//! Any failure is an HTTP 401.

use std::convert::Infallible;

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use repairdesk_api::{AuthenticatedUser, AuthenticationService};
use repairdesk_audit::Cause;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::{AppState, ErrorResponse};

/// Header carrying a caller-supplied correlation id.
const REQUEST_ID_HEADER: &str = "x-request-id";

/// Extractor for authenticated staff.
///
/// Holds the resolved user and the raw token, which logout needs.
pub struct SessionUser(pub AuthenticatedUser, pub String);

impl FromRequestParts<AppState> for SessionUser {
    type Rejection = SessionError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .ok_or_else(|| {
                debug!("Missing Authorization header");
                SessionError::MissingAuthorizationHeader
            })?
            .to_str()
            .map_err(|_| {
                warn!("Invalid Authorization header encoding");
                SessionError::InvalidAuthorizationHeader
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            warn!("Authorization header does not start with 'Bearer '");
            SessionError::InvalidAuthorizationHeader
        })?;

        let mut persistence = state.persistence.lock().await;
        let user = AuthenticationService::validate_session(
            &mut persistence,
            token,
            OffsetDateTime::now_utc(),
        )
        .map_err(|e| {
            warn!(error = %e, "Session validation failed");
            SessionError::InvalidSession(e.to_string())
        })?;

        debug!(user_id = user.user_id, "Session validated");

        Ok(Self(user, token.to_string()))
    }
}

/// Session extraction errors.
#[derive(Debug)]
pub enum SessionError {
    /// Authorization header is missing.
    MissingAuthorizationHeader,
    /// Authorization header format is invalid.
    InvalidAuthorizationHeader,
    /// Session validation failed.
    InvalidSession(String),
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let message: String = match self {
            Self::MissingAuthorizationHeader => String::from("Missing Authorization header"),
            Self::InvalidAuthorizationHeader => String::from(
                "Invalid Authorization header format. Expected: 'Bearer <token>'",
            ),
            Self::InvalidSession(reason) => format!("Session validation failed: {reason}"),
        };

        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: true,
                message,
            }),
        )
            .into_response()
    }
}

/// The audit cause of the current request.
///
/// The id is the `x-request-id` header when present, otherwise the method
/// and path; the description is always the method and path.
pub struct RequestCause(pub Cause);

impl<S: Send + Sync> FromRequestParts<S> for RequestCause {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let description: String = format!("{} {}", parts.method, parts.uri.path());
        let id: String = parts
            .headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map_or_else(|| description.clone(), str::to_string);

        Ok(Self(Cause::new(id, description)))
    }
}
