use axum::body::to_bytes;

use super::*;
use crate::services::auth::Role;
use crate::services::email::MailError;
use crate::state::test_helpers::{self, MockMailer};

const DATE: &str = "2024-07-15";

fn nurse() -> AuthUser {
    AuthUser::new(Role::NurseHospital, Some("enfermera@hospital.cl"))
}

fn email_request(recipients: &[&str]) -> CensusEmailRequest {
    CensusEmailRequest {
        date: DATE.into(),
        recipients: recipients.iter().map(|r| (*r).to_owned()).collect(),
        ..CensusEmailRequest::default()
    }
}

#[test]
fn email_errors_map_to_status() {
    let cases = [
        (CensusEmailError::NoRecipients, StatusCode::BAD_REQUEST),
        (CensusEmailError::InvalidRecipient("x".into()), StatusCode::BAD_REQUEST),
        (CensusEmailError::NotConfigured, StatusCode::SERVICE_UNAVAILABLE),
        (CensusEmailError::Mail(MailError::Delivery("down".into())), StatusCode::BAD_GATEWAY),
        (CensusEmailError::Report(ReportError::NoRecords), StatusCode::NOT_FOUND),
    ];
    for (err, expected) in cases {
        assert_eq!(email_error_to_status(&err), expected, "{err}");
    }
}

#[tokio::test]
async fn day_download_is_an_xlsx_attachment() {
    let state = test_helpers::test_app_state();
    census::create_day(&state, &nurse().actor, DATE, false).await.unwrap();

    let response = download_day(State(state), nurse(), Path(DATE.into())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::CONTENT_TYPE], XLSX_CONTENT_TYPE);
    let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap().to_owned();
    assert!(disposition.contains(&report::report_filename(DATE)));

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(body.starts_with(b"PK"));
}

#[tokio::test]
async fn missing_day_download_is_404() {
    let state = test_helpers::test_app_state();
    let err = download_day(State(state), nurse(), Path(DATE.into())).await.unwrap_err();
    assert_eq!(err.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn month_download_needs_records() {
    let state = test_helpers::test_app_state();
    let err = download_month(State(state.clone()), nurse(), Path(DATE.into())).await.unwrap_err();
    assert_eq!(err.status, StatusCode::NOT_FOUND);
    assert_eq!(err.body.code, "E_NO_RECORDS");

    census::create_day(&state, &nurse().actor, "2024-07-02", false).await.unwrap();
    let response = download_month(State(state), nurse(), Path(DATE.into())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn viewers_cannot_download_or_send() {
    let state = test_helpers::test_app_state();
    let viewer = || AuthUser::new(Role::Viewer, None);
    let err = download_day(State(state.clone()), viewer(), Path(DATE.into())).await.unwrap_err();
    assert_eq!(err.status, StatusCode::FORBIDDEN);
    let err = send_census_email(State(state), viewer(), Json(email_request(&["a@b.cl"]))).await.unwrap_err();
    assert_eq!(err.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn email_is_sent_through_the_mailer() {
    let app = test_helpers::test_app();
    census::create_day(&app.state, &nurse().actor, DATE, false).await.unwrap();

    let Json(sent) = send_census_email(State(app.state.clone()), nurse(), Json(email_request(&[" Jefa@Hospital.cl "])))
        .await
        .unwrap();
    assert!(sent.success);
    assert_eq!(sent.gmail_id, "mock-1");
    assert_eq!(app.mailer.sent()[0].to, vec!["jefa@hospital.cl".to_owned()]);
}

#[tokio::test]
async fn email_failures_map_to_gateway_and_bad_request() {
    let app = test_helpers::build(None, MockMailer::failing());
    census::create_day(&app.state, &nurse().actor, DATE, false).await.unwrap();

    let err = send_census_email(State(app.state.clone()), nurse(), Json(email_request(&["a@b.cl"])))
        .await
        .unwrap_err();
    assert_eq!(err.status, StatusCode::BAD_GATEWAY);

    let err = send_census_email(State(app.state), nurse(), Json(email_request(&[]))).await.unwrap_err();
    assert_eq!(err.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn email_without_mailer_is_503() {
    let mut app = test_helpers::test_app();
    app.state.mailer = None;
    let err = send_census_email(State(app.state), nurse(), Json(email_request(&["a@b.cl"]))).await.unwrap_err();
    assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn email_with_malformed_record_date_is_400() {
    let state = test_helpers::test_app_state();
    let mut body = email_request(&["a@b.cl"]);
    body.records = Some(vec![DailyRecord::empty("15/07/2024")]);
    let err = send_census_email(State(state), nurse(), Json(body)).await.unwrap_err();
    assert_eq!(err.status, StatusCode::BAD_REQUEST);
    assert_eq!(err.body.code, "E_INVALID_DATE");
}
