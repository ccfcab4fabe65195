//! Request identity: role and email from headers.
//!
//! The census sits behind the hospital's gateway, which authenticates staff
//! and forwards `x-user-role` and `x-user-email`. A missing or unknown role
//! is rejected with 401; a known role without the needed permission with 403.

use axum::http::HeaderMap;
use axum::http::request::Parts;

use crate::error::ApiError;
use crate::services::auth::{Actor, Permission, Role};

pub const ROLE_HEADER: &str = "x-user-role";
pub const EMAIL_HEADER: &str = "x-user-email";

// =============================================================================
// AUTH EXTRACTOR
// =============================================================================

/// Caller identity. Use as a handler parameter to require a known role.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub actor: Actor,
}

impl AuthUser {
    #[cfg(test)]
    #[must_use]
    pub fn new(role: Role, email: Option<&str>) -> Self {
        Self { actor: Actor::new(role, email.map(str::to_owned)) }
    }

    /// # Errors
    ///
    /// 403 if the caller's role lacks `permission`.
    pub fn require(&self, permission: Permission) -> Result<(), ApiError> {
        if self.actor.role.can(permission) {
            Ok(())
        } else {
            Err(ApiError::forbidden(permission.as_str()))
        }
    }
}

/// # Errors
///
/// 401 if the role header is missing or names no known role.
pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, ApiError> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };
    let role = header(ROLE_HEADER)
        .and_then(Role::from_str)
        .ok_or_else(ApiError::unauthorized)?;
    let email = header(EMAIL_HEADER).map(str::to_ascii_lowercase);
    Ok(Actor::new(role, email))
}

impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self { actor: actor_from_headers(&parts.headers)? })
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
