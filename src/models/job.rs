use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Upper bound on the stored failure message, in characters.
pub const MAX_ERROR_MESSAGE_LENGTH: usize = 1000;

/// Lifecycle of an import job.
///
/// `Pending -> InProgress -> {Completed, Failed}`. A job that never started
/// may also go straight from `Pending` to `Failed`. Terminal states are never
/// left again.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportJobStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl ImportJobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn can_transition_to(self, next: ImportJobStatus) -> bool {
        use ImportJobStatus::*;
        matches!(
            (self, next),
            (Pending, InProgress) | (Pending, Failed) | (InProgress, Completed) | (InProgress, Failed)
        )
    }

    /// States from which `target` may be entered.
    pub fn predecessors(target: ImportJobStatus) -> Vec<ImportJobStatus> {
        [Self::Pending, Self::InProgress, Self::Completed, Self::Failed]
            .into_iter()
            .filter(|from| from.can_transition_to(target))
            .collect()
    }
}

/// Metadata captured from an upload before any processing happens.
#[derive(Debug, Clone)]
pub struct NewImportJob {
    pub file_name: String,
    pub file_size: i64,
    pub content_type: Option<String>,
}

/// A bulk import job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImportJob {
    pub id: Uuid,
    pub file_name: String,
    pub file_size: i64,
    pub content_type: Option<String>,
    pub status: ImportJobStatus,
    pub total_records: Option<i32>,
    pub processed_records: Option<i32>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ImportJob {
    pub fn new(new_job: NewImportJob) -> Self {
        Self {
            id: Uuid::new_v4(),
            file_name: new_job.file_name,
            file_size: new_job.file_size,
            content_type: new_job.content_type,
            status: ImportJobStatus::Pending,
            total_records: None,
            processed_records: None,
            error_message: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }
}

/// Cut a failure message down to what the job row stores.
pub fn truncate_error_message(message: &str) -> String {
    match message.char_indices().nth(MAX_ERROR_MESSAGE_LENGTH) {
        Some((byte_idx, _)) => message[..byte_idx].to_string(),
        None => message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_transitions() {
        use ImportJobStatus::*;
        assert!(Pending.can_transition_to(InProgress));
        assert!(Pending.can_transition_to(Failed));
        assert!(InProgress.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(Failed));
    }

    #[test]
    fn test_terminal_states_are_never_left() {
        use ImportJobStatus::*;
        for next in [Pending, InProgress, Completed, Failed] {
            assert!(!Completed.can_transition_to(next));
            assert!(!Failed.can_transition_to(next));
        }
        assert!(!InProgress.can_transition_to(InProgress));
        assert!(!InProgress.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Completed));
    }

    #[test]
    fn test_predecessors() {
        use ImportJobStatus::*;
        assert_eq!(ImportJobStatus::predecessors(InProgress), vec![Pending]);
        assert_eq!(ImportJobStatus::predecessors(Failed), vec![Pending, InProgress]);
        assert_eq!(ImportJobStatus::predecessors(Completed), vec![InProgress]);
        assert!(ImportJobStatus::predecessors(Pending).is_empty());
    }

    #[test]
    fn test_status_text_form() {
        assert_eq!(ImportJobStatus::InProgress.to_string(), "IN_PROGRESS");
        assert_eq!(
            "COMPLETED".parse::<ImportJobStatus>().unwrap(),
            ImportJobStatus::Completed
        );
        assert_eq!(
            serde_json::to_string(&ImportJobStatus::Pending).unwrap(),
            "\"PENDING\""
        );
    }

    #[test]
    fn test_truncate_error_message() {
        let short = "Missing required column: email";
        assert_eq!(truncate_error_message(short), short);

        let long = "ą".repeat(MAX_ERROR_MESSAGE_LENGTH + 25);
        let truncated = truncate_error_message(&long);
        assert_eq!(truncated.chars().count(), MAX_ERROR_MESSAGE_LENGTH);
    }
}
