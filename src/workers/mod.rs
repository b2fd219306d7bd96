pub mod daily_summary;
pub mod export_task;
pub mod insights_export;

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::config::WorkerConfig;
use crate::error::ExportError;
use crate::state::JobContext;

/// Timeout for individual worker invocations (15 minutes).
const WORKER_TIMEOUT: Duration = Duration::from_secs(900);

/// Drain period before scheduler shutdown to let in-flight tasks complete.
#[cfg(test)]
const DRAIN_TIMEOUT: Duration = Duration::from_millis(10);
#[cfg(not(test))]
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerName {
    InsightsExport,
    ExportTask,
}

impl WorkerName {
    pub const ALL: [WorkerName; 2] = [WorkerName::InsightsExport, WorkerName::ExportTask];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::InsightsExport => "insights_export",
            Self::ExportTask => "export_task",
        }
    }
}

impl FromStr for WorkerName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|w| w.as_str() == normalized)
            .ok_or_else(|| {
                format!("unknown worker '{s}', expected one of: insights_export, export_task")
            })
    }
}

/// Runs a single invocation of `name` and reports its outcome, for
/// deployments where an external scheduler starts one process per run.
pub async fn run_once(name: WorkerName, ctx: &JobContext) -> Result<(), ExportError> {
    let now = Utc::now();
    match name {
        WorkerName::InsightsExport => {
            let report = insights_export::export(ctx, now).await?;
            tracing::info!(key = %report.key, rows = report.rows, "Insights export complete");
        }
        WorkerName::ExportTask => {
            let outcome = export_task::export(ctx, now).await?;
            tracing::info!(task_id = %outcome.task_id, summary = ?outcome.summary, "Export task complete");
        }
    }
    Ok(())
}

/// Only the export task keeps state between runs.
pub fn needs_store(config: &WorkerConfig, selected: Option<WorkerName>) -> bool {
    match selected {
        Some(name) => name == WorkerName::ExportTask,
        None => config.enable_export_task,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub name: WorkerName,
    pub cron: String,
    pub enabled: bool,
}

pub struct WorkerManager {
    ctx: JobContext,
    shutdown_rx: broadcast::Receiver<()>,
    config: WorkerConfig,
}

impl WorkerManager {
    pub fn new(
        ctx: JobContext,
        shutdown_rx: broadcast::Receiver<()>,
        config: &WorkerConfig,
    ) -> Self {
        Self {
            ctx,
            shutdown_rx,
            config: config.clone(),
        }
    }

    /// Single source of truth for all planned jobs and their cron schedules.
    pub fn planned_jobs(&self) -> Vec<JobSpec> {
        vec![
            JobSpec {
                name: WorkerName::InsightsExport,
                cron: self.config.insights_cron.clone(),
                enabled: self.config.enable_insights_export,
            },
            JobSpec {
                name: WorkerName::ExportTask,
                cron: self.config.export_task_cron.clone(),
                enabled: self.config.enable_export_task,
            },
        ]
    }

    /// Start the worker scheduler and block until shutdown is signalled.
    pub async fn start(mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut scheduler = JobScheduler::new().await?;

        let registered = self.register_jobs(&scheduler).await;
        if registered == 0 {
            tracing::warn!("No workers enabled; nothing to schedule");
            return Ok(());
        }

        scheduler.start().await?;

        tracing::info!(registered, "Worker manager started");
        let _ = self.shutdown_rx.recv().await;

        tracing::info!(
            "Worker manager shutting down, draining for {}s",
            DRAIN_TIMEOUT.as_secs()
        );
        tokio::time::sleep(DRAIN_TIMEOUT).await;
        let _ = scheduler.shutdown().await;
        Ok(())
    }

    /// Register all enabled jobs, returning how many were added.
    async fn register_jobs(&self, scheduler: &JobScheduler) -> usize {
        let mut registered = 0;

        for spec in self.planned_jobs() {
            let name_str = spec.name.as_str();
            if !spec.enabled {
                tracing::info!(name = name_str, "Skipping disabled worker");
                continue;
            }

            let ctx = self.ctx.clone();
            let added = match spec.name {
                WorkerName::InsightsExport => {
                    add_job(scheduler, &spec.cron, name_str, move || {
                        let ctx = ctx.clone();
                        async move {
                            insights_export::run(&ctx).await;
                        }
                    })
                    .await
                }
                WorkerName::ExportTask => {
                    add_job(scheduler, &spec.cron, name_str, move || {
                        let ctx = ctx.clone();
                        async move {
                            export_task::run(&ctx).await;
                        }
                    })
                    .await
                }
            };
            if added {
                registered += 1;
                tracing::info!(name = name_str, cron = %spec.cron, "Registered worker");
            }
        }
        registered
    }
}

/// Add a job to the scheduler with an overlap guard and timeout wrapper.
async fn add_job<Fut, F>(
    scheduler: &JobScheduler,
    cron: &str,
    name: &'static str,
    mut run: F,
) -> bool
where
    F: FnMut() -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let running = Arc::new(AtomicBool::new(false));

    let job = Job::new_async(cron, move |_uuid, _lock| {
        let guard = running.clone();

        if guard
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!(
                worker = name,
                "Skipping worker invocation: previous run still in progress"
            );
            return Box::pin(async {});
        }

        let fut = run();
        Box::pin(async move {
            if tokio::time::timeout(WORKER_TIMEOUT, fut).await.is_err() {
                tracing::error!(
                    worker = name,
                    timeout_secs = WORKER_TIMEOUT.as_secs(),
                    "Worker timed out"
                );
            }
            guard.store(false, Ordering::SeqCst);
        })
    });

    match job {
        Ok(job) => match scheduler.add(job).await {
            Ok(_) => true,
            Err(err) => {
                tracing::error!(error = %err, cron, worker = name, "Failed to add worker job");
                false
            }
        },
        Err(err) => {
            tracing::error!(error = %err, cron, worker = name, "Failed to create worker job");
            false
        }
    }
}
