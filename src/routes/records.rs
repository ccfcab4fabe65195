//! Daily record routes: lifecycle, bed actions, statistics and CUDYR.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;

use super::CommitResponse;
use super::auth::AuthUser;
use crate::error::ApiError;
use crate::model::DailyRecord;
use crate::services::auth::Permission;
use crate::services::beds::{BedAction, BedChange};
use crate::services::census::{self, SavedRecord};
use crate::services::cudyr::{self, CudyrSummary};
use crate::services::stats::{self, CensusStatistics};
use crate::state::AppState;

pub(crate) fn feature_disabled(name: &str) -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "E_FEATURE_DISABLED", format!("feature {name} is disabled"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecordBody {
    pub date: String,
    #[serde(default)]
    pub copy_previous: bool,
}

/// `GET /api/records`: known dates, oldest first.
pub async fn list_records(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Vec<String>>, ApiError> {
    auth.require(Permission::ViewCensus)?;
    Ok(Json(census::list_days(&state).await?))
}

/// `POST /api/records`: open a new day.
pub async fn create_record(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateRecordBody>,
) -> Result<(StatusCode, Json<SavedRecord>), ApiError> {
    auth.require(Permission::ManageDays)?;
    let saved = census::create_day(&state, &auth.actor, &body.date, body.copy_previous).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

/// `GET /api/records/{date}`
pub async fn get_record(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(date): Path<String>,
) -> Result<Json<DailyRecord>, ApiError> {
    auth.require(Permission::ViewCensus)?;
    Ok(Json(census::get_day(&state, &date).await?))
}

/// `DELETE /api/records/{date}`
pub async fn delete_record(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(date): Path<String>,
) -> Result<StatusCode, ApiError> {
    auth.require(Permission::ManageDays)?;
    census::delete_day(&state, &auth.actor, &date).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/records/{date}/previous`: latest record before `date`.
pub async fn previous_record(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(date): Path<String>,
) -> Result<Json<DailyRecord>, ApiError> {
    auth.require(Permission::ViewCensus)?;
    census::previous_day(&state, &date)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("no census record before {date}")))
}

/// `POST /api/records/{date}/beds`
pub async fn apply_bed_action(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(date): Path<String>,
    Json(action): Json<BedAction>,
) -> Result<Json<CommitResponse<BedChange>>, ApiError> {
    auth.require(Permission::EditBeds)?;
    if matches!(action, BedAction::SetCudyr { .. }) && !state.flags.cudyr {
        return Err(feature_disabled("cudyr"));
    }
    let committed = census::apply_bed_action(&state, &auth.actor, &date, action).await?;
    Ok(Json(committed.into()))
}

/// `GET /api/records/{date}/stats`
pub async fn record_stats(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(date): Path<String>,
) -> Result<Json<CensusStatistics>, ApiError> {
    auth.require(Permission::ViewCensus)?;
    let record = census::get_day(&state, &date).await?;
    Ok(Json(stats::census_statistics(&record)))
}

/// `GET /api/records/{date}/cudyr`
pub async fn record_cudyr(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(date): Path<String>,
) -> Result<Json<CudyrSummary>, ApiError> {
    auth.require(Permission::ViewCensus)?;
    if !state.flags.cudyr {
        return Err(feature_disabled("cudyr"));
    }
    let record = census::get_day(&state, &date).await?;
    Ok(Json(cudyr::summarize(&record)))
}

#[cfg(test)]
#[path = "records_test.rs"]
mod tests;
