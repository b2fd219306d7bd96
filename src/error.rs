use thiserror::Error;

use crate::poll::PollError;
use crate::report::ReportError;
use crate::services::logs::LogsError;
use crate::services::storage::StorageError;
use crate::store::StoreError;

/// Why an exporter run ended without doing its work.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("submission failed: {0}")]
    Submit(#[source] LogsError),
    #[error("waiting for {what} {id} failed: {source}")]
    Poll {
        what: &'static str,
        id: String,
        #[source]
        source: PollError,
    },
    #[error("query {query_id} ended with status {status}")]
    QueryFailed { query_id: String, status: String },
    #[error("export task {task_id} did not complete (last status: {status})")]
    TaskNotCompleted { task_id: String, status: String },
    #[error("query {query_id} returned no rows")]
    EmptyResultSet { query_id: String },
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("state store is not available")]
    StoreUnavailable,
}

impl ExportError {
    /// Short label used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Submit(_) => "submit",
            Self::Poll {
                source: PollError::Timeout { .. },
                ..
            } => "timeout",
            Self::Poll { .. } => "poll",
            Self::QueryFailed { .. } => "query_failed",
            Self::TaskNotCompleted { .. } => "task_not_completed",
            Self::EmptyResultSet { .. } => "empty_result_set",
            Self::Report(_) => "report",
            Self::Storage(_) => "storage",
            Self::Store(_) | Self::StoreUnavailable => "store",
        }
    }
}
