use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use crate::constants::{
    DEFAULT_EXPORT_POLL_MAX_ATTEMPTS, DEFAULT_INSIGHTS_POLL_TIMEOUT_SECS, DEFAULT_INSIGHTS_QUERY,
    DEFAULT_JOB_NAME, DEFAULT_NOTIFY_TIMEOUT_SECS, DEFAULT_POLL_INTERVAL_SECS,
    DEFAULT_POLL_MAX_INTERVAL_SECS, DEFAULT_QUERY_LIMIT,
};

#[derive(Clone)]
pub struct Config {
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub state_path: String,
    pub job_name: String,
    pub scratch_dir: PathBuf,
    pub log_group: String,
    pub bucket: BucketConfig,
    pub notify: NotifyConfig,
    pub insights: InsightsConfig,
    pub export: ExportConfig,
    pub worker: WorkerConfig,
}

#[derive(Debug, Clone)]
pub struct BucketConfig {
    pub name: String,
    pub path: String,
}

#[derive(Clone)]
pub struct NotifyConfig {
    pub channel: String,
    pub hook_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct InsightsConfig {
    pub query: String,
    pub limit: i32,
    pub poll_interval_secs: u64,
    pub poll_max_interval_secs: u64,
    pub poll_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub poll_interval_secs: u64,
    pub poll_max_attempts: u32,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub run_once: Option<String>,
    pub insights_cron: String,
    pub export_task_cron: String,
    pub enable_insights_export: bool,
    pub enable_export_task: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("log_level", &self.log_level)
            .field("enable_file_logs", &self.enable_file_logs)
            .field("log_dir", &self.log_dir)
            .field("state_path", &self.state_path)
            .field("job_name", &self.job_name)
            .field("scratch_dir", &self.scratch_dir)
            .field("log_group", &self.log_group)
            .field("bucket", &self.bucket)
            .field("notify", &self.notify)
            .field("insights", &self.insights)
            .field("export", &self.export)
            .field("worker", &self.worker)
            .finish()
    }
}

impl fmt::Debug for NotifyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifyConfig")
            .field("channel", &self.channel)
            .field("hook_url", &"***REDACTED***")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let poll_interval_secs = env_or_parse("POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS);
        Ok(Self {
            log_level: env_or("RUST_LOG", "info"),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false),
            log_dir: env_or("LOG_DIR", "./logs"),
            state_path: env_or("STATE_PATH", "./data/log-exporter.sled"),
            job_name: env::var("AWS_LAMBDA_FUNCTION_NAME")
                .or_else(|_| env::var("JOB_NAME"))
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_JOB_NAME.to_string()),
            scratch_dir: env::var("SCRATCH_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(env::temp_dir),
            log_group: env_or("LOG_GROUP", ""),
            bucket: BucketConfig {
                name: env_required("bucket_name")?,
                path: env_or("bucket_path", ""),
            },
            notify: NotifyConfig {
                channel: env_required("slackChannel")?,
                hook_url: env_required("HOOK_URL")?,
                timeout_secs: env_or_parse("NOTIFY_TIMEOUT_SECS", DEFAULT_NOTIFY_TIMEOUT_SECS),
            },
            insights: InsightsConfig {
                query: env_or("INSIGHTS_QUERY", DEFAULT_INSIGHTS_QUERY),
                limit: env_or_parse("INSIGHTS_QUERY_LIMIT", DEFAULT_QUERY_LIMIT),
                poll_interval_secs,
                poll_max_interval_secs: env_or_parse(
                    "INSIGHTS_POLL_MAX_INTERVAL_SECS",
                    DEFAULT_POLL_MAX_INTERVAL_SECS,
                ),
                poll_timeout_secs: env_or_parse(
                    "INSIGHTS_POLL_TIMEOUT_SECS",
                    DEFAULT_INSIGHTS_POLL_TIMEOUT_SECS,
                ),
            },
            export: ExportConfig {
                poll_interval_secs,
                poll_max_attempts: env_or_parse(
                    "EXPORT_POLL_MAX_ATTEMPTS",
                    DEFAULT_EXPORT_POLL_MAX_ATTEMPTS,
                ),
            },
            worker: WorkerConfig {
                run_once: env::var("RUN_ONCE").ok().filter(|v| !v.trim().is_empty()),
                insights_cron: env_or("INSIGHTS_EXPORT_CRON", "0 0 0 * * *"),
                export_task_cron: env_or("EXPORT_TASK_CRON", "0 */10 * * * *"),
                enable_insights_export: env_or_bool("ENABLE_INSIGHTS_EXPORT", true),
                enable_export_task: env_or_bool("ENABLE_EXPORT_TASK", true),
            },
        })
    }
}

pub fn env_required(key: &'static str) -> Result<String, ConfigError> {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::Missing(key)),
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(
                    key,
                    value = %raw,
                    "Failed to parse env var, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}
