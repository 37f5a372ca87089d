//! Archival settings and run records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default hot-path retention before rows are archived
pub const DEFAULT_RETENTION_MONTHS: i32 = 6;
/// Informational hint for a later cold tier
pub const DEFAULT_COLD_STORAGE_AFTER_MONTHS: i32 = 24;

/// Default confirmation phrase for manual runs; includes the retention window
pub fn default_confirmation_phrase(retention_months: i32) -> String {
    format!(
        "archive all records older than {retention_months} months for this branch"
    )
}

/// Per-branch archival policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ArchiveSettings {
    pub branch_id: i64,
    pub enabled: bool,
    pub retention_months: i32,
    pub cold_storage_after_months: i32,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_reminder_at: Option<DateTime<Utc>>,
    pub confirmation_phrase: String,
}

/// Update archive settings payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveSettingsUpdate {
    pub enabled: Option<bool>,
    pub retention_months: Option<i32>,
    pub cold_storage_after_months: Option<i32>,
    pub confirmation_phrase: Option<String>,
}

/// How a run was started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(
    feature = "db",
    sqlx(type_name = "archive_run_type", rename_all = "snake_case")
)]
pub enum ArchiveRunType {
    Scheduled,
    Manual,
}

/// Run outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(
    feature = "db",
    sqlx(type_name = "archive_run_status", rename_all = "snake_case")
)]
pub enum ArchiveRunStatus {
    Success,
    Failed,
    Skipped,
}

/// Audit record of one archival run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ArchiveRun {
    pub id: i64,
    pub branch_id: i64,
    pub triggered_by_actor_id: Option<i64>,
    pub run_type: ArchiveRunType,
    pub status: ArchiveRunStatus,
    pub cutoff_at: DateTime<Utc>,
    /// Per-entity moved-row counts
    pub details: serde_json::Value,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Manual run payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveRunRequest {
    pub confirmation_phrase: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_confirmation_phrase_names_window() {
        let phrase = default_confirmation_phrase(6);
        assert!(phrase.contains("6 months"));
    }
}
