use std::path::Path;
use std::sync::Arc;

use log_exporter::config::{
    BucketConfig, Config, ExportConfig, InsightsConfig, NotifyConfig, WorkerConfig,
};
use log_exporter::services::notifier::NotificationMessage;
use log_exporter::state::JobContext;
use log_exporter::store::Store;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::fakes::{FakeLogs, FakeStorage};

pub const HOOK_PATH: &str = "/services/T000/B000";

/// Config with zero poll intervals so exporter runs finish without waiting.
pub fn test_config(hook_url: &str, scratch_dir: &Path) -> Config {
    Config {
        log_level: "debug".to_string(),
        enable_file_logs: false,
        log_dir: "./logs".to_string(),
        state_path: String::new(),
        job_name: "waf-report".to_string(),
        scratch_dir: scratch_dir.to_path_buf(),
        log_group: "aws-waf-logs-test".to_string(),
        bucket: BucketConfig {
            name: "reports".to_string(),
            path: "waf".to_string(),
        },
        notify: NotifyConfig {
            channel: "#alerts".to_string(),
            hook_url: hook_url.to_string(),
            timeout_secs: 5,
        },
        insights: InsightsConfig {
            query: "stats count(*)".to_string(),
            limit: 20,
            poll_interval_secs: 0,
            poll_max_interval_secs: 0,
            poll_timeout_secs: 5,
        },
        export: ExportConfig {
            poll_interval_secs: 0,
            poll_max_attempts: 5,
        },
        worker: WorkerConfig {
            run_once: None,
            insights_cron: "0 0 0 * * *".to_string(),
            export_task_cron: "0 */10 * * * *".to_string(),
            enable_insights_export: true,
            enable_export_task: true,
        },
    }
}

pub struct TestApp {
    pub ctx: JobContext,
    pub logs: Arc<FakeLogs>,
    pub storage: Arc<FakeStorage>,
    pub store: Arc<Store>,
    pub server: MockServer,
    pub scratch: TempDir,
}

impl TestApp {
    /// Builds an app whose webhook answers 200.
    pub async fn spawn(logs: FakeLogs, storage: FakeStorage) -> Self {
        Self::spawn_with_hook_status(logs, storage, 200).await
    }

    pub async fn spawn_with_hook_status(logs: FakeLogs, storage: FakeStorage, status: u16) -> Self {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(HOOK_PATH))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;
        Self::with_server(logs, storage, server, |_| {})
    }

    pub fn with_server(
        logs: FakeLogs,
        storage: FakeStorage,
        server: MockServer,
        tweak: impl FnOnce(&mut Config),
    ) -> Self {
        let scratch = tempfile::tempdir().expect("scratch dir");
        let hook_url = format!("{}{}", server.uri(), HOOK_PATH);
        let mut config = test_config(&hook_url, scratch.path());
        tweak(&mut config);

        let logs = Arc::new(logs);
        let storage = Arc::new(storage);
        let store = Arc::new(Store::temporary().expect("temporary store"));
        let ctx = JobContext::new(&config, logs.clone(), storage.clone(), Some(store.clone()));

        Self {
            ctx,
            logs,
            storage,
            store,
            server,
            scratch,
        }
    }

    /// Webhook payloads received so far, in order.
    pub async fn notifications(&self) -> Vec<NotificationMessage> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(|r| serde_json::from_slice(&r.body).expect("notification payload"))
            .collect()
    }

    pub fn scratch_is_empty(&self) -> bool {
        std::fs::read_dir(self.scratch.path())
            .expect("read scratch dir")
            .next()
            .is_none()
    }
}

/// Context with no webhook server behind it, for paused-clock tests that
/// fail before anything is posted.
pub fn offline_context(
    logs: Arc<FakeLogs>,
    storage: Arc<FakeStorage>,
    tweak: impl FnOnce(&mut Config),
) -> (JobContext, TempDir) {
    let scratch = tempfile::tempdir().expect("scratch dir");
    let mut config = test_config("http://127.0.0.1:9/hook", scratch.path());
    tweak(&mut config);
    let store = Arc::new(Store::temporary().expect("temporary store"));
    (JobContext::new(&config, logs, storage, Some(store)), scratch)
}

/// Context whose state store could not be opened.
pub fn storeless_context(
    logs: Arc<FakeLogs>,
    storage: Arc<FakeStorage>,
    hook_url: &str,
) -> (JobContext, TempDir) {
    let scratch = tempfile::tempdir().expect("scratch dir");
    let config = test_config(hook_url, scratch.path());
    (JobContext::new(&config, logs, storage, None), scratch)
}
