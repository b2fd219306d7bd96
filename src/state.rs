use std::sync::Arc;

use crate::config::Config;
use crate::services::logs::LogsApi;
use crate::services::notifier::Notifier;
use crate::services::storage::ObjectStore;
use crate::store::Store;

/// Everything a job invocation needs, built once at startup.
#[derive(Clone)]
pub struct JobContext {
    config: Arc<Config>,
    logs: Arc<dyn LogsApi>,
    storage: Arc<dyn ObjectStore>,
    notifier: Notifier,
    store: Option<Arc<Store>>,
}

impl JobContext {
    pub fn new(
        config: &Config,
        logs: Arc<dyn LogsApi>,
        storage: Arc<dyn ObjectStore>,
        store: Option<Arc<Store>>,
    ) -> Self {
        Self {
            notifier: Notifier::new(&config.notify),
            config: Arc::new(config.clone()),
            logs,
            storage,
            store,
        }
    }

    /// Builds the production context from the ambient AWS configuration.
    pub async fn from_aws(config: &Config, store: Option<Arc<Store>>) -> Self {
        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let logs = Arc::new(crate::services::logs::CloudWatchLogs::new(&sdk_config));
        let storage = Arc::new(crate::services::storage::S3Storage::new(&sdk_config));
        Self::new(config, logs, storage, store)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn logs(&self) -> &dyn LogsApi {
        self.logs.as_ref()
    }

    pub fn storage(&self) -> &dyn ObjectStore {
        self.storage.as_ref()
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// The marker store, absent when it was not needed or failed to open.
    pub fn store(&self) -> Option<&Store> {
        self.store.as_deref()
    }
}
