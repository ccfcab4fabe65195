use axum::http::HeaderValue;

use super::*;

fn headers(role: Option<&str>, email: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Some(role) = role {
        headers.insert(ROLE_HEADER, HeaderValue::from_str(role).unwrap());
    }
    if let Some(email) = email {
        headers.insert(EMAIL_HEADER, HeaderValue::from_str(email).unwrap());
    }
    headers
}

#[test]
fn role_and_email_are_read() {
    let actor = actor_from_headers(&headers(Some("nurse_hospital"), Some("Enfermera@Hospital.cl"))).unwrap();
    assert_eq!(actor.role, Role::NurseHospital);
    assert_eq!(actor.email.as_deref(), Some("enfermera@hospital.cl"));
}

#[test]
fn email_is_optional() {
    let actor = actor_from_headers(&headers(Some(" VIEWER "), None)).unwrap();
    assert_eq!(actor.role, Role::Viewer);
    assert!(actor.email.is_none());
}

#[test]
fn missing_or_unknown_role_is_unauthorized() {
    for role in [None, Some(""), Some("superuser")] {
        let err = actor_from_headers(&headers(role, None)).unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::UNAUTHORIZED);
    }
}

#[test]
fn require_checks_the_permission_table() {
    let doctor = AuthUser::new(Role::DoctorUrgency, None);
    assert!(doctor.require(Permission::SignMedicalHandoff).is_ok());
    let err = doctor.require(Permission::EditBeds).unwrap_err();
    assert_eq!(err.status, axum::http::StatusCode::FORBIDDEN);
    assert_eq!(err.body.code, "E_FORBIDDEN");

    let viewer = AuthUser::new(Role::ViewerCensus, None);
    assert!(viewer.require(Permission::DownloadReports).is_ok());
    assert!(viewer.require(Permission::SendEmail).is_err());
}
