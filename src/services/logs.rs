use async_trait::async_trait;
use aws_sdk_cloudwatchlogs::error::DisplayErrorContext;
use aws_sdk_cloudwatchlogs::operation::get_query_results::GetQueryResultsOutput;
use aws_sdk_cloudwatchlogs::Client;

use crate::types::{ExportTaskStatus, QueryResults, QueryStatistics, QueryStatus, ResultField, TimeWindow};

#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub log_group: String,
    pub query: String,
    pub window: TimeWindow,
    pub limit: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportTaskRequest {
    pub log_group: String,
    pub bucket: String,
    pub prefix: String,
    pub window: TimeWindow,
}

#[derive(Debug, thiserror::Error)]
pub enum LogsError {
    #[error("cloudwatch logs request failed: {0}")]
    Service(String),
    #[error("malformed cloudwatch logs response: {0}")]
    MalformedResponse(&'static str),
}

/// Query and export operations of the managed log service.
#[async_trait]
pub trait LogsApi: Send + Sync {
    async fn start_query(&self, request: &QueryRequest) -> Result<String, LogsError>;

    async fn get_query_results(&self, query_id: &str) -> Result<QueryResults, LogsError>;

    async fn create_export_task(&self, request: &ExportTaskRequest) -> Result<String, LogsError>;

    async fn describe_export_task(&self, task_id: &str) -> Result<ExportTaskStatus, LogsError>;
}

#[derive(Debug, Clone)]
pub struct CloudWatchLogs {
    client: Client,
}

impl CloudWatchLogs {
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
        }
    }
}

fn service_error<E>(err: E) -> LogsError
where
    E: std::error::Error,
{
    LogsError::Service(DisplayErrorContext(err).to_string())
}

/// Converts a `GetQueryResults` response. Result cells without a field name
/// cannot become CSV columns and are dropped.
pub fn query_results_from(output: &GetQueryResultsOutput) -> QueryResults {
    let status = output
        .status()
        .map(|s| QueryStatus::from_service(s.as_str()))
        .unwrap_or(QueryStatus::Unknown);

    let statistics = output.statistics().map(|s| QueryStatistics {
        records_scanned: s.records_scanned(),
        records_matched: s.records_matched(),
        bytes_scanned: s.bytes_scanned(),
    });

    let mut unnamed = 0usize;
    let records = output
        .results()
        .iter()
        .map(|record| {
            record
                .iter()
                .filter_map(|f| match f.field() {
                    Some(field) => Some(ResultField::new(field, f.value().unwrap_or_default())),
                    None => {
                        unnamed += 1;
                        None
                    }
                })
                .collect()
        })
        .collect();

    if unnamed > 0 {
        tracing::warn!(unnamed, "Dropped result cells without a field name");
    }

    QueryResults {
        status,
        statistics,
        records,
    }
}

#[async_trait]
impl LogsApi for CloudWatchLogs {
    async fn start_query(&self, request: &QueryRequest) -> Result<String, LogsError> {
        let output = self
            .client
            .start_query()
            .log_group_name(&request.log_group)
            .start_time(request.window.start_secs())
            .end_time(request.window.end_secs())
            .query_string(&request.query)
            .limit(request.limit)
            .send()
            .await
            .map_err(service_error)?;

        output
            .query_id()
            .map(str::to_string)
            .ok_or(LogsError::MalformedResponse("missing queryId"))
    }

    async fn get_query_results(&self, query_id: &str) -> Result<QueryResults, LogsError> {
        let output = self
            .client
            .get_query_results()
            .query_id(query_id)
            .send()
            .await
            .map_err(service_error)?;

        Ok(query_results_from(&output))
    }

    async fn create_export_task(&self, request: &ExportTaskRequest) -> Result<String, LogsError> {
        let output = self
            .client
            .create_export_task()
            .log_group_name(&request.log_group)
            .from(request.window.start_millis())
            .to(request.window.end_millis())
            .destination(&request.bucket)
            .destination_prefix(&request.prefix)
            .send()
            .await
            .map_err(service_error)?;

        output
            .task_id()
            .map(str::to_string)
            .ok_or(LogsError::MalformedResponse("missing taskId"))
    }

    async fn describe_export_task(&self, task_id: &str) -> Result<ExportTaskStatus, LogsError> {
        let output = self
            .client
            .describe_export_tasks()
            .task_id(task_id)
            .send()
            .await
            .map_err(service_error)?;

        let task = output
            .export_tasks()
            .first()
            .ok_or(LogsError::MalformedResponse("no export task returned"))?;

        task.status()
            .and_then(|s| s.code())
            .map(|code| ExportTaskStatus::from_code(code.as_str()))
            .ok_or(LogsError::MalformedResponse("export task without status code"))
    }
}
