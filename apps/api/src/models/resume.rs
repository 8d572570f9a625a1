use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One uploaded resume document, created at upload acceptance.
/// `parsing_status` is mutated only by the ingestion pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub file_name: String,
    pub file_path: String,
    pub file_size: i64,
    pub mime_type: String,
    pub parsing_status: String,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle of one upload through the ingestion pipeline.
///
/// `pending` is set at upload acceptance. The pipeline moves the record to
/// `processing` and then to exactly one terminal state. Terminal states are
/// never left automatically; a stuck `processing` row means the host died
/// mid-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParsingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    FailedNoText,
    FailedException,
}

impl ParsingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParsingStatus::Pending => "pending",
            ParsingStatus::Processing => "processing",
            ParsingStatus::Completed => "completed",
            ParsingStatus::Failed => "failed",
            ParsingStatus::FailedNoText => "failed_no_text",
            ParsingStatus::FailedException => "failed_exception",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ParsingStatus::Completed
                | ParsingStatus::Failed
                | ParsingStatus::FailedNoText
                | ParsingStatus::FailedException
        )
    }
}

impl std::fmt::Display for ParsingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
