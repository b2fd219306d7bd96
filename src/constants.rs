/// Insights query used when `INSIGHTS_QUERY` is unset.
pub const DEFAULT_INSIGHTS_QUERY: &str = "stats count(*)";

/// Maximum rows returned by an Insights query.
pub const DEFAULT_QUERY_LIMIT: i32 = 20;

pub const INSIGHTS_WINDOW_HOURS: i64 = 24;

/// Span of each export task; also the length of the first window after
/// midnight in which a run without a summary marker may summarize.
pub const EXPORT_WINDOW_MINUTES: i64 = 10;

/// Initial Insights poll interval and fixed export task poll interval (seconds).
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 2;

/// Cap for the Insights backoff interval (seconds).
pub const DEFAULT_POLL_MAX_INTERVAL_SECS: u64 = 30;

pub const DEFAULT_INSIGHTS_POLL_TIMEOUT_SECS: u64 = 600;

/// Export task status checks before giving up.
pub const DEFAULT_EXPORT_POLL_MAX_ATTEMPTS: u32 = 5;

pub const DEFAULT_NOTIFY_TIMEOUT_SECS: u64 = 10;

/// Report filename prefix when no job name is configured.
pub const DEFAULT_JOB_NAME: &str = "log-exporter";

pub const INSIGHTS_NOTIFY_TAG: &str = "*[log-insight-exporter]*";
pub const EXPORT_SUMMARY_NOTIFY_TAG: &str = "*[WAF-log-exporter]*";
