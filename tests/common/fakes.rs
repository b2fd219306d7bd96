use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use log_exporter::services::logs::{ExportTaskRequest, LogsApi, LogsError, QueryRequest};
use log_exporter::services::storage::{ObjectStore, StorageError};
use log_exporter::types::{ExportTaskStatus, QueryResults};

/// Scripted log service. Each queue hands out its responses in order and
/// keeps repeating the last one.
#[derive(Default)]
pub struct FakeLogs {
    fail_submit: bool,
    query_results: Mutex<VecDeque<Result<QueryResults, String>>>,
    export_statuses: Mutex<VecDeque<Result<ExportTaskStatus, String>>>,
    pub query_requests: Mutex<Vec<QueryRequest>>,
    pub export_requests: Mutex<Vec<ExportTaskRequest>>,
    pub query_polls: AtomicU32,
    pub export_polls: AtomicU32,
}

impl FakeLogs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_submit(mut self) -> Self {
        self.fail_submit = true;
        self
    }

    pub fn with_query_results(self, results: Vec<Result<QueryResults, String>>) -> Self {
        *self.query_results.lock().unwrap() = results.into();
        self
    }

    pub fn with_export_statuses(self, statuses: Vec<Result<ExportTaskStatus, String>>) -> Self {
        *self.export_statuses.lock().unwrap() = statuses.into();
        self
    }

    pub fn query_polls(&self) -> u32 {
        self.query_polls.load(Ordering::SeqCst)
    }

    pub fn export_polls(&self) -> u32 {
        self.export_polls.load(Ordering::SeqCst)
    }

    fn next<T: Clone>(queue: &Mutex<VecDeque<Result<T, String>>>) -> Result<T, LogsError> {
        let mut queue = queue.lock().unwrap();
        let item = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        match item {
            Some(Ok(value)) => Ok(value),
            Some(Err(message)) => Err(LogsError::Service(message)),
            None => Err(LogsError::Service("no scripted response".to_string())),
        }
    }
}

#[async_trait]
impl LogsApi for FakeLogs {
    async fn start_query(&self, request: &QueryRequest) -> Result<String, LogsError> {
        self.query_requests.lock().unwrap().push(request.clone());
        if self.fail_submit {
            return Err(LogsError::Service("AccessDeniedException".to_string()));
        }
        Ok("query-1".to_string())
    }

    async fn get_query_results(&self, _query_id: &str) -> Result<QueryResults, LogsError> {
        self.query_polls.fetch_add(1, Ordering::SeqCst);
        Self::next(&self.query_results)
    }

    async fn create_export_task(&self, request: &ExportTaskRequest) -> Result<String, LogsError> {
        self.export_requests.lock().unwrap().push(request.clone());
        if self.fail_submit {
            return Err(LogsError::Service("LimitExceededException".to_string()));
        }
        Ok("task-1".to_string())
    }

    async fn describe_export_task(&self, _task_id: &str) -> Result<ExportTaskStatus, LogsError> {
        self.export_polls.fetch_add(1, Ordering::SeqCst);
        Self::next(&self.export_statuses)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub bucket: String,
    pub key: String,
    pub body: String,
}

/// In-memory bucket that records uploads and serves listings from seeded keys.
#[derive(Default)]
pub struct FakeStorage {
    fail_list: bool,
    keys: Mutex<Vec<String>>,
    pub uploads: Mutex<Vec<Upload>>,
    pub list_calls: Mutex<Vec<(String, String)>>,
}

impl FakeStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keys(self, keys: &[&str]) -> Self {
        *self.keys.lock().unwrap() = keys.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    pub fn uploads(&self) -> Vec<Upload> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> Vec<(String, String)> {
        self.list_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for FakeStorage {
    async fn upload_file(&self, path: &Path, bucket: &str, key: &str) -> Result<(), StorageError> {
        let body = std::fs::read_to_string(path).map_err(|e| StorageError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        self.uploads.lock().unwrap().push(Upload {
            bucket: bucket.to_string(),
            key: key.to_string(),
            body,
        });
        self.keys.lock().unwrap().push(key.to_string());
        Ok(())
    }

    async fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError> {
        self.list_calls
            .lock()
            .unwrap()
            .push((bucket.to_string(), prefix.to_string()));
        if self.fail_list {
            return Err(StorageError::List {
                bucket: bucket.to_string(),
                prefix: prefix.to_string(),
                message: "AccessDenied".to_string(),
            });
        }
        Ok(self
            .keys
            .lock()
            .unwrap()
            .iter()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}
