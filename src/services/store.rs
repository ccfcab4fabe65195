//! Document storage for census records and audit entries.
//!
//! ARCHITECTURE
//! ============
//! `RecordStore` is the seam between census logic and the remote document
//! database. Postgres stores each day as one JSONB document keyed by its
//! `YYYY-MM-DD` string; the in-memory store backs tests and database-less
//! deployments. Because keys are zero-padded ISO dates, lexical order is
//! chronological order and range queries compare strings.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use sqlx::{PgPool, QueryBuilder, Row};
use tokio::sync::RwLock;

use crate::error::ErrorCode;
use crate::model::DailyRecord;
use crate::services::audit::{AuditAction, AuditEntry, AuditFilter};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl ErrorCode for StoreError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Database(_) => "E_DATABASE",
            Self::Serde(_) => "E_SERDE",
            Self::Io(_) => "E_IO",
            Self::Unavailable(_) => "E_STORE_UNAVAILABLE",
        }
    }

    fn retryable(&self) -> bool {
        !matches!(self, Self::Serde(_))
    }
}

/// Async document store for daily records and the audit log.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, date: &str) -> Result<Option<DailyRecord>, StoreError>;

    /// Insert or replace the document for `record.date`.
    async fn put(&self, record: &DailyRecord) -> Result<(), StoreError>;

    /// Returns `false` when no document existed.
    async fn delete(&self, date: &str) -> Result<bool, StoreError>;

    /// All stored date keys, ascending.
    async fn list_dates(&self) -> Result<Vec<String>, StoreError>;

    /// Records with `from <= date <= to`, ascending.
    async fn list_range(&self, from: &str, to: &str) -> Result<Vec<DailyRecord>, StoreError>;

    /// The newest record strictly before `date`.
    async fn latest_before(&self, date: &str) -> Result<Option<DailyRecord>, StoreError>;

    async fn append_audit(&self, entry: &AuditEntry) -> Result<(), StoreError>;

    /// Matching entries, newest first, at most `filter.limit`.
    async fn query_audit(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>, StoreError>;
}

// =============================================================================
// IN-MEMORY STORE
// =============================================================================

/// Process-local store. `set_available(false)` simulates a remote outage.
#[derive(Default)]
pub struct MemoryRecordStore {
    records: RwLock<BTreeMap<String, DailyRecord>>,
    audit: RwLock<Vec<AuditEntry>>,
    unavailable: AtomicBool,
}

impl MemoryRecordStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store marked offline".into()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get(&self, date: &str) -> Result<Option<DailyRecord>, StoreError> {
        self.check()?;
        Ok(self.records.read().await.get(date).cloned())
    }

    async fn put(&self, record: &DailyRecord) -> Result<(), StoreError> {
        self.check()?;
        self.records
            .write()
            .await
            .insert(record.date.clone(), record.clone());
        Ok(())
    }

    async fn delete(&self, date: &str) -> Result<bool, StoreError> {
        self.check()?;
        Ok(self.records.write().await.remove(date).is_some())
    }

    async fn list_dates(&self) -> Result<Vec<String>, StoreError> {
        self.check()?;
        Ok(self.records.read().await.keys().cloned().collect())
    }

    async fn list_range(&self, from: &str, to: &str) -> Result<Vec<DailyRecord>, StoreError> {
        self.check()?;
        if from > to {
            return Ok(Vec::new());
        }
        let records = self.records.read().await;
        Ok(records
            .range(from.to_owned()..=to.to_owned())
            .map(|(_, record)| record.clone())
            .collect())
    }

    async fn latest_before(&self, date: &str) -> Result<Option<DailyRecord>, StoreError> {
        self.check()?;
        let records = self.records.read().await;
        Ok(records
            .range(..date.to_owned())
            .next_back()
            .map(|(_, record)| record.clone()))
    }

    async fn append_audit(&self, entry: &AuditEntry) -> Result<(), StoreError> {
        self.check()?;
        self.audit.write().await.push(entry.clone());
        Ok(())
    }

    async fn query_audit(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>, StoreError> {
        self.check()?;
        let audit = self.audit.read().await;
        let mut matching = audit
            .iter()
            .filter(|entry| filter.matches(entry))
            .cloned()
            .collect::<Vec<_>>();
        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        matching.truncate(filter.limit);
        Ok(matching)
    }
}

// =============================================================================
// POSTGRES STORE
// =============================================================================

pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn decode_record(data: serde_json::Value) -> Result<DailyRecord, StoreError> {
    let mut record: DailyRecord = serde_json::from_value(data)?;
    record.ensure_catalogue();
    Ok(record)
}

#[async_trait::async_trait]
impl RecordStore for PgRecordStore {
    async fn get(&self, date: &str) -> Result<Option<DailyRecord>, StoreError> {
        let data = sqlx::query_scalar::<_, serde_json::Value>("SELECT data FROM daily_records WHERE date = $1")
            .bind(date)
            .fetch_optional(&self.pool)
            .await?;
        data.map(decode_record).transpose()
    }

    async fn put(&self, record: &DailyRecord) -> Result<(), StoreError> {
        let data = serde_json::to_value(record)?;
        sqlx::query(
            r"INSERT INTO daily_records (date, data, last_updated)
              VALUES ($1, $2, $3)
              ON CONFLICT (date) DO UPDATE SET data = EXCLUDED.data, last_updated = EXCLUDED.last_updated",
        )
        .bind(&record.date)
        .bind(&data)
        .bind(record.last_updated)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, date: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM daily_records WHERE date = $1")
            .bind(date)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_dates(&self) -> Result<Vec<String>, StoreError> {
        let dates = sqlx::query_scalar::<_, String>("SELECT date FROM daily_records ORDER BY date ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(dates)
    }

    async fn list_range(&self, from: &str, to: &str) -> Result<Vec<DailyRecord>, StoreError> {
        let rows = sqlx::query_scalar::<_, serde_json::Value>(
            "SELECT data FROM daily_records WHERE date >= $1 AND date <= $2 ORDER BY date ASC",
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(decode_record).collect()
    }

    async fn latest_before(&self, date: &str) -> Result<Option<DailyRecord>, StoreError> {
        let data = sqlx::query_scalar::<_, serde_json::Value>(
            "SELECT data FROM daily_records WHERE date < $1 ORDER BY date DESC LIMIT 1",
        )
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;
        data.map(decode_record).transpose()
    }

    async fn append_audit(&self, entry: &AuditEntry) -> Result<(), StoreError> {
        sqlx::query(
            r"INSERT INTO audit_logs
                (id, ts, user_email, user_role, action, entity_type, entity_id, record_date, details)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(entry.id)
        .bind(entry.timestamp)
        .bind(&entry.user_email)
        .bind(&entry.user_role)
        .bind(entry.action.as_str())
        .bind(&entry.entity_type)
        .bind(&entry.entity_id)
        .bind(&entry.record_date)
        .bind(&entry.details)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn query_audit(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>, StoreError> {
        let mut builder = QueryBuilder::<sqlx::Postgres>::new(
            "SELECT id, ts, user_email, user_role, action, entity_type, entity_id, record_date, details
             FROM audit_logs WHERE TRUE",
        );
        if let Some(date) = &filter.date {
            builder.push(" AND record_date = ").push_bind(date);
        }
        if let Some(action) = filter.action {
            builder.push(" AND action = ").push_bind(action.as_str());
        }
        if let Some(user) = &filter.user {
            builder.push(" AND user_email = ").push_bind(user);
        }
        builder
            .push(" ORDER BY ts DESC LIMIT ")
            .push_bind(i64::try_from(filter.limit).unwrap_or(i64::MAX));

        let rows = builder.build().fetch_all(&self.pool).await?;
        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let raw_action: String = row.try_get("action")?;
            let Some(action) = AuditAction::from_str(&raw_action) else {
                tracing::warn!(action = %raw_action, "skipping audit row with unknown action");
                continue;
            };
            entries.push(AuditEntry {
                id: row.try_get("id")?,
                timestamp: row.try_get("ts")?,
                user_email: row.try_get("user_email")?,
                user_role: row.try_get("user_role")?,
                action,
                entity_type: row.try_get("entity_type")?,
                entity_id: row.try_get("entity_id")?,
                record_date: row.try_get("record_date")?,
                details: row.try_get("details")?,
            });
        }
        Ok(entries)
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
