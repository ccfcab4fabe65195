//! Audit log query route.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;

use super::auth::AuthUser;
use crate::error::ApiError;
use crate::services::audit::{AuditAction, AuditEntry, AuditFilter, clamp_limit};
use crate::services::auth::Permission;
use crate::services::census;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct AuditQuery {
    pub date: Option<String>,
    pub action: Option<String>,
    pub user: Option<String>,
    pub limit: Option<usize>,
}

/// # Errors
///
/// 400 for a malformed date or unknown action.
pub fn audit_filter(query: AuditQuery) -> Result<AuditFilter, ApiError> {
    let date = query
        .date
        .as_deref()
        .map(census::date_key)
        .transpose()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    let action = query
        .action
        .as_deref()
        .map(|raw| AuditAction::from_str(raw).ok_or_else(|| ApiError::bad_request(format!("unknown action: {raw}"))))
        .transpose()?;
    let user = query.user.map(|u| u.trim().to_ascii_lowercase()).filter(|u| !u.is_empty());
    Ok(AuditFilter { date, action, user, limit: clamp_limit(query.limit) })
}

/// `GET /api/audit`: newest first.
pub async fn list_audit(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Vec<AuditEntry>>, ApiError> {
    auth.require(Permission::ViewAudit)?;
    let filter = audit_filter(query)?;
    let entries = state
        .repo
        .store()
        .query_audit(&filter)
        .await
        .map_err(|e| ApiError::from_error(StatusCode::INTERNAL_SERVER_ERROR, &e))?;
    Ok(Json(entries))
}

#[cfg(test)]
#[path = "audit_test.rs"]
mod tests;
