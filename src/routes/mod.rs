//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! All endpoints are JSON over HTTP under `/api`, plus `/healthz`. Identity
//! comes from request headers (see `auth`); every handler checks the
//! permission it needs before touching state. Service errors are mapped to
//! status codes here so the services stay HTTP-agnostic.

pub mod audit;
pub mod auth;
pub mod handoff;
pub mod movements;
pub mod records;
pub mod reports;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{delete, get, patch, post};
use serde::Serialize;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::model::DailyRecord;
use crate::services::beds::BedError;
use crate::services::census::CensusError;
use crate::services::handoff::HandoffError;
use crate::services::movements::MovementError;
use crate::services::optimistic::Committed;
use crate::services::repository::SaveOutcome;
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/records", get(records::list_records).post(records::create_record))
        .route("/api/records/{date}", get(records::get_record).delete(records::delete_record))
        .route("/api/records/{date}/previous", get(records::previous_record))
        .route("/api/records/{date}/beds", post(records::apply_bed_action))
        .route("/api/records/{date}/stats", get(records::record_stats))
        .route("/api/records/{date}/cudyr", get(records::record_cudyr))
        .route("/api/records/{date}/discharges", post(movements::create_discharge))
        .route(
            "/api/records/{date}/discharges/{id}",
            patch(movements::update_discharge).delete(movements::delete_discharge),
        )
        .route("/api/records/{date}/discharges/{id}/undo", post(movements::undo_discharge))
        .route("/api/records/{date}/transfers", post(movements::create_transfer))
        .route(
            "/api/records/{date}/transfers/{id}",
            patch(movements::update_transfer).delete(movements::delete_transfer),
        )
        .route("/api/records/{date}/transfers/{id}/undo", post(movements::undo_transfer))
        .route("/api/records/{date}/cma", post(movements::create_cma))
        .route("/api/records/{date}/cma/{id}", delete(movements::delete_cma))
        .route("/api/records/{date}/handoff/{shift}", get(handoff::get_handoff))
        .route("/api/records/{date}/handoff/nursing", post(handoff::update_nursing))
        .route("/api/records/{date}/handoff/medical", post(handoff::update_medical_note))
        .route("/api/records/{date}/handoff/medical/sign", post(handoff::sign_medical))
        .route("/api/audit", get(audit::list_audit))
        .route("/api/reports/census/{date}", get(reports::download_day))
        .route("/api/reports/census/month/{date}", get(reports::download_month))
        .route("/api/census-email", post(reports::send_census_email))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

// =============================================================================
// RESPONSES
// =============================================================================

/// Body returned by every edit: the new record, what the edit produced, and
/// whether it reached the remote store.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitResponse<T> {
    pub record: DailyRecord,
    pub result: T,
    pub saved: SaveOutcome,
}

impl<T> From<Committed<T>> for CommitResponse<T> {
    fn from(committed: Committed<T>) -> Self {
        Self { record: committed.record, result: committed.value, saved: committed.outcome }
    }
}

// =============================================================================
// ERROR MAPPING
// =============================================================================

pub(crate) fn bed_error_to_status(err: &BedError) -> StatusCode {
    match err {
        BedError::BedBlocked(_)
        | BedError::BedOccupied(_)
        | BedError::NotOccupied(_)
        | BedError::ExtraBedInactive(_)
        | BedError::NoClinicalCrib(_)
        | BedError::CribPresent(_) => StatusCode::CONFLICT,
        BedError::UnknownBed(_)
        | BedError::MissingName
        | BedError::NotExtraBed(_)
        | BedError::SameBed
        | BedError::Cudyr(_) => StatusCode::BAD_REQUEST,
    }
}

pub(crate) fn census_error_to_status(err: &CensusError) -> StatusCode {
    match err {
        CensusError::InvalidDate(_) => StatusCode::BAD_REQUEST,
        CensusError::NotFound(_) => StatusCode::NOT_FOUND,
        CensusError::AlreadyExists(_) | CensusError::SaveInProgress(_) => StatusCode::CONFLICT,
        CensusError::Bed(e) => bed_error_to_status(e),
        CensusError::Movement(e) => match e {
            MovementError::Bed(e) => bed_error_to_status(e),
            MovementError::EntryNotFound(_) => StatusCode::NOT_FOUND,
            MovementError::CribAttached(_) | MovementError::BedNotAvailable(_) | MovementError::MissingSnapshot(_) => {
                StatusCode::CONFLICT
            }
            MovementError::InvalidTime(_) | MovementError::MissingField(_) => StatusCode::BAD_REQUEST,
        },
        CensusError::Handoff(e) => match e {
            HandoffError::Bed(e) => bed_error_to_status(e),
            HandoffError::AlreadySigned => StatusCode::CONFLICT,
            HandoffError::MissingDoctor | HandoffError::MissingItem => StatusCode::BAD_REQUEST,
        },
        CensusError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<CensusError> for ApiError {
    fn from(err: CensusError) -> Self {
        Self::from_error(census_error_to_status(&err), &err)
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
