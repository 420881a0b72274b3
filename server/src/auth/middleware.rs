//! Shared-token authentication.
//!
//! HTTP requests carry the token as `Authorization: Bearer <token>`; the
//! WebSocket endpoint takes it from the `token` query parameter because
//! browsers cannot set headers on an upgrade. When `AUTH_TOKEN` is unset,
//! HTTP requests may omit the header entirely.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::config::Config;
use crate::error::AppError;
use crate::AppState;

/// Authenticated caller extracted from request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthUser {
    /// A token was presented and accepted
    Token,
    /// No token configured and none presented
    Anonymous,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        match auth_header {
            Some(header) => match header.strip_prefix("Bearer ") {
                Some(token) => {
                    authorize_token(&state.config, Some(token))?;
                    Ok(AuthUser::Token)
                }
                None => Err(AppError::Unauthorized),
            },
            None if state.config.auth_token.is_none() => Ok(AuthUser::Anonymous),
            None => Err(AppError::Unauthorized),
        }
    }
}

/// Check a presented token against the configuration.
///
/// A token must always be non-empty; it must also equal `AUTH_TOKEN` when
/// one is configured.
pub fn authorize_token(config: &Config, token: Option<&str>) -> Result<(), AppError> {
    let token = token.map(str::trim).unwrap_or_default();
    if token.is_empty() {
        return Err(AppError::Unauthorized);
    }

    match &config.auth_token {
        Some(expected) if expected != token => Err(AppError::Unauthorized),
        _ => Ok(()),
    }
}
