//! Census email relay.
//!
//! DESIGN
//! ======
//! The census workbook for a day is mailed as an attachment to a list of
//! recipients. Delivery sits behind the [`Mailer`] trait; production uses
//! Resend, tests inject a recording mock through `AppState`.
//!
//! ERROR HANDLING
//! ==============
//! Request problems (bad date, no or malformed recipients) are rejected
//! before any work. A missing mailer is distinguished from a failed
//! delivery so callers can tell "not set up" from "provider down".

use std::sync::Arc;

use resend_rs::Resend;
use resend_rs::types::{CreateAttachment, CreateEmailBaseOptions};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ErrorCode;
use crate::model::{DailyRecord, display_date, format_date_key, parse_date_key};
use crate::services::audit::{self, AuditAction, AuditEntry};
use crate::services::auth::Actor;
use crate::services::report::{self, ReportError};
use crate::services::store::StoreError;
use crate::state::AppState;

pub const DEFAULT_SIGNATURE: &str = "Enfermería Servicio Hospitalizados";

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("email delivery failed: {0}")]
    Delivery(String),
}

impl ErrorCode for MailError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Delivery(_) => "E_MAIL_DELIVERY",
        }
    }

    fn retryable(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
    pub attachment_name: String,
    pub attachment: Vec<u8>,
}

/// Email delivery. Returns the provider's message id.
#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<String, MailError>;
}

pub struct ResendMailer {
    client: Resend,
    from: String,
}

impl ResendMailer {
    #[must_use]
    pub fn new(api_key: &str, from: &str) -> Self {
        Self { client: Resend::new(api_key), from: from.to_owned() }
    }
}

#[async_trait::async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<String, MailError> {
        let attachment = CreateAttachment::from_content(email.attachment).with_filename(&email.attachment_name);
        let options = CreateEmailBaseOptions::new(&self.from, email.to, &email.subject)
            .with_text(&email.body)
            .with_attachment(attachment);
        let response = self
            .client
            .emails
            .send(options)
            .await
            .map_err(|e| MailError::Delivery(e.to_string()))?;
        Ok(response.id.to_string())
    }
}

// =============================================================================
// REQUEST HANDLING
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CensusEmailError {
    #[error("invalid date: {0}")]
    InvalidDate(String),
    #[error("at least one recipient is required")]
    NoRecipients,
    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),
    #[error("email delivery is not configured")]
    NotConfigured,
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error(transparent)]
    Mail(#[from] MailError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ErrorCode for CensusEmailError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidDate(_) => "E_INVALID_DATE",
            Self::NoRecipients => "E_NO_RECIPIENTS",
            Self::InvalidRecipient(_) => "E_INVALID_RECIPIENT",
            Self::NotConfigured => "E_MAIL_NOT_CONFIGURED",
            Self::Report(e) => e.error_code(),
            Self::Mail(e) => e.error_code(),
            Self::Store(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Mail(e) => e.retryable(),
            Self::Store(e) => e.retryable(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CensusEmailRequest {
    pub date: String,
    pub record: Option<DailyRecord>,
    pub records: Option<Vec<DailyRecord>>,
    pub recipients: Vec<String>,
    pub nurses_signature: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CensusEmailSent {
    pub success: bool,
    pub gmail_id: String,
}

/// Lowercased, trimmed address with exactly one `@` and non-empty parts.
#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    let (local, domain) = normalized.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') || normalized.contains(char::is_whitespace) {
        return None;
    }
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return None;
    }
    Some(normalized)
}

/// # Errors
///
/// Fails on an empty list or any malformed address.
pub fn normalize_recipients(raw: &[String]) -> Result<Vec<String>, CensusEmailError> {
    let mut recipients: Vec<String> = Vec::new();
    for address in raw {
        if address.trim().is_empty() {
            continue;
        }
        let normalized =
            normalize_email(address).ok_or_else(|| CensusEmailError::InvalidRecipient(address.trim().to_owned()))?;
        if !recipients.contains(&normalized) {
            recipients.push(normalized);
        }
    }
    if recipients.is_empty() {
        return Err(CensusEmailError::NoRecipients);
    }
    Ok(recipients)
}

#[must_use]
pub fn email_subject(date: &str) -> String {
    format!("Censo diario pacientes hospitalizados - {}", display_date(date))
}

#[must_use]
pub fn email_body(date: &str, body: Option<&str>, signature: Option<&str>) -> String {
    let signature = signature.map(str::trim).filter(|s| !s.is_empty()).unwrap_or(DEFAULT_SIGNATURE);
    match body.map(str::trim).filter(|b| !b.is_empty()) {
        Some(body) => format!("{body}\n\n{signature}"),
        None => format!(
            "Estimados/as:\n\nAdjunto el censo diario de pacientes hospitalizados correspondiente al {}.\n\nSaludos cordiales,\n{signature}",
            display_date(date)
        ),
    }
}

/// Client-supplied records must carry a calendar date key; it names the sheet.
fn checked_record(mut record: DailyRecord) -> Result<DailyRecord, CensusEmailError> {
    let day = parse_date_key(&record.date).ok_or_else(|| CensusEmailError::InvalidDate(record.date.clone()))?;
    record.date = format_date_key(day);
    Ok(record)
}

/// Records for the email: explicit list, else the single record, else the
/// month to date from storage.
async fn collect_records(state: &AppState, date: &str, request: &mut CensusEmailRequest) -> Result<Vec<DailyRecord>, CensusEmailError> {
    if let Some(records) = request.records.take().filter(|r| !r.is_empty()) {
        return records.into_iter().map(checked_record).collect();
    }
    if let Some(record) = request.record.take() {
        return Ok(vec![checked_record(record)?]);
    }
    let day = parse_date_key(date).ok_or_else(|| CensusEmailError::InvalidDate(date.to_owned()))?;
    let first = day.replace_day(1).map_err(|_| CensusEmailError::InvalidDate(date.to_owned()))?;
    Ok(state.repo.list_range(&format_date_key(first), date).await?)
}

/// Validate, build the workbook, send it, and audit the delivery.
///
/// # Errors
///
/// See [`CensusEmailError`].
pub async fn send_census_email(
    state: &AppState,
    actor: &Actor,
    mut request: CensusEmailRequest,
) -> Result<CensusEmailSent, CensusEmailError> {
    let day = parse_date_key(&request.date).ok_or_else(|| CensusEmailError::InvalidDate(request.date.clone()))?;
    let date = format_date_key(day);
    let recipients = normalize_recipients(&request.recipients)?;
    let mailer: Arc<dyn Mailer> = match (&state.mailer, state.flags.email) {
        (Some(mailer), true) => Arc::clone(mailer),
        _ => return Err(CensusEmailError::NotConfigured),
    };

    let records = collect_records(state, &date, &mut request).await?;
    let attachment = report::build_census_workbook(&records)?;
    let email = OutgoingEmail {
        to: recipients.clone(),
        subject: email_subject(&date),
        body: email_body(&date, request.body.as_deref(), request.nurses_signature.as_deref()),
        attachment_name: report::report_filename(&date),
        attachment,
    };

    let message_id = mailer.send(email).await?;
    info!(%date, recipients = recipients.len(), %message_id, "census email sent");

    let entry = AuditEntry::new(actor, AuditAction::CensusEmailSent, "dailyRecord", &date)
        .with_record_date(&date)
        .with_details(serde_json::json!({
            "recipients": recipients,
            "messageId": message_id,
            "sheets": records.len(),
        }));
    audit::record(state, entry).await;

    Ok(CensusEmailSent { success: true, gmail_id: message_id })
}

#[cfg(test)]
#[path = "email_test.rs"]
mod tests;
