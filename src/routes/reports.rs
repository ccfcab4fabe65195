//! Report routes: Excel downloads and the census email relay.

use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Json, Response};

use super::auth::AuthUser;
use crate::error::ApiError;
use crate::model::{DailyRecord, format_date_key, parse_date_key};
use crate::services::auth::Permission;
use crate::services::census::{self, CensusError};
use crate::services::email::{self, CensusEmailError, CensusEmailRequest, CensusEmailSent};
use crate::services::report::{self, ReportError};
use crate::state::AppState;

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub(crate) fn report_error_to_status(err: &ReportError) -> StatusCode {
    match err {
        ReportError::NoRecords => StatusCode::NOT_FOUND,
        ReportError::Xlsx(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn email_error_to_status(err: &CensusEmailError) -> StatusCode {
    match err {
        CensusEmailError::InvalidDate(_) | CensusEmailError::NoRecipients | CensusEmailError::InvalidRecipient(_) => {
            StatusCode::BAD_REQUEST
        }
        CensusEmailError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
        CensusEmailError::Mail(_) => StatusCode::BAD_GATEWAY,
        CensusEmailError::Report(e) => report_error_to_status(e),
        CensusEmailError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn xlsx_response(date: &str, bytes: Vec<u8>) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", report::report_filename(date));
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_owned()), (header::CONTENT_DISPOSITION, disposition)],
        bytes,
    )
        .into_response()
}

fn workbook(records: &[DailyRecord]) -> Result<Vec<u8>, ApiError> {
    report::build_census_workbook(records).map_err(|e| ApiError::from_error(report_error_to_status(&e), &e))
}

/// `GET /api/reports/census/{date}`: one-sheet workbook for the day.
pub async fn download_day(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(date): Path<String>,
) -> Result<Response, ApiError> {
    auth.require(Permission::DownloadReports)?;
    let record = census::get_day(&state, &date).await?;
    let bytes = workbook(std::slice::from_ref(&record))?;
    Ok(xlsx_response(&record.date, bytes))
}

/// `GET /api/reports/census/month/{date}`: first of the month through `date`.
pub async fn download_month(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(date): Path<String>,
) -> Result<Response, ApiError> {
    auth.require(Permission::DownloadReports)?;
    let key = census::date_key(&date)?;
    let first = parse_date_key(&key)
        .and_then(|day| day.replace_day(1).ok())
        .map(format_date_key)
        .ok_or_else(|| ApiError::from(CensusError::InvalidDate(date.clone())))?;
    let records = state.repo.list_range(&first, &key).await.map_err(CensusError::from)?;
    let bytes = workbook(&records)?;
    Ok(xlsx_response(&key, bytes))
}

/// `POST /api/census-email`
pub async fn send_census_email(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CensusEmailRequest>,
) -> Result<Json<CensusEmailSent>, ApiError> {
    auth.require(Permission::SendEmail)?;
    let sent = email::send_census_email(&state, &auth.actor, body)
        .await
        .map_err(|e| ApiError::from_error(email_error_to_status(&e), &e))?;
    Ok(Json(sent))
}

#[cfg(test)]
#[path = "reports_test.rs"]
mod tests;
