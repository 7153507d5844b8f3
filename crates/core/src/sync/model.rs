use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{DatabaseError, Error};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncLogStatus {
    Running,
    Success,
    Failed,
    Skipped,
}

impl SyncLogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
            Self::Skipped => "SKIPPED",
        }
    }

    pub fn from_str(value: &str) -> Result<Self, Error> {
        match value {
            "RUNNING" => Ok(Self::Running),
            "SUCCESS" => Ok(Self::Success),
            "FAILED" => Ok(Self::Failed),
            "SKIPPED" => Ok(Self::Skipped),
            other => Err(Error::Database(DatabaseError::Internal(format!(
                "Unknown sync log status '{}'",
                other
            )))),
        }
    }

    /// Terminal statuses carry `completed_at` and `duration_ms`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Append-only trace of sync activity. `store_id = None` marks the
/// run-level entry; per-store entries carry the store they cover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncLogEntry {
    pub id: String,
    pub store_id: Option<String>,
    pub job_name: String,
    pub status: SyncLogStatus,
    pub message: Option<String>,
    pub error_details: Option<String>,
    pub duration_ms: Option<i64>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SyncLogEntry {
    /// Open a RUNNING entry for a job that just started.
    pub fn begin(job_name: impl Into<String>, store_id: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            store_id,
            job_name: job_name.into(),
            status: SyncLogStatus::Running,
            message: None,
            error_details: None,
            duration_ms: None,
            started_at: Utc::now(),
            completed_at: None,
        }
    }
}
