//! Export task: copy the last ten minutes of the log group into the bucket's
//! date partition, wait for the task, then hand over to the daily summary.

use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};

use crate::constants::EXPORT_WINDOW_MINUTES;
use crate::error::ExportError;
use crate::poll::{poll_until, PollPolicy};
use crate::report::date_prefix;
use crate::services::logs::ExportTaskRequest;
use crate::state::JobContext;
use crate::types::{ExportTaskStatus, TimeWindow};
use crate::workers::daily_summary::{self, SummaryOutcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTaskOutcome {
    pub task_id: String,
    pub prefix: String,
    pub summary: SummaryOutcome,
}

pub async fn run(ctx: &JobContext) {
    tracing::info!("Export task worker running");
    match export(ctx, Utc::now()).await {
        Ok(outcome) => match outcome.summary {
            SummaryOutcome::Sent { object_count, .. } => tracing::info!(
                task_id = %outcome.task_id,
                object_count,
                "Task is completed, daily summary sent"
            ),
            SummaryOutcome::NotDue { .. } => {
                tracing::info!(task_id = %outcome.task_id, "Task is completed")
            }
        },
        Err(e) => tracing::error!(kind = e.kind(), error = %e, "Export task failed"),
    }
}

pub async fn export(
    ctx: &JobContext,
    now: DateTime<Utc>,
) -> Result<ExportTaskOutcome, ExportError> {
    let cfg = ctx.config();
    let request = ExportTaskRequest {
        log_group: cfg.log_group.clone(),
        bucket: cfg.bucket.name.clone(),
        prefix: date_prefix(&cfg.bucket.path, now.date_naive()),
        window: TimeWindow::trailing(now, Duration::minutes(EXPORT_WINDOW_MINUTES)),
    };

    let task_id = match ctx.logs().create_export_task(&request).await {
        Ok(id) => id,
        Err(e) => {
            tracing::error!(error = %e, "CreateExportTask failed");
            return Err(ExportError::Submit(e));
        }
    };
    tracing::info!(%task_id, prefix = %request.prefix, "Export task created");

    let status = wait_for_task(ctx, &task_id).await?;
    if status != ExportTaskStatus::Completed {
        tracing::error!(%task_id, status = status.code(), "Task is failed");
        return Err(ExportError::TaskNotCompleted {
            task_id,
            status: status.code().to_string(),
        });
    }
    tracing::info!(%task_id, "Task is completed");

    let summary = daily_summary::run_if_due(ctx, now).await?;

    Ok(ExportTaskOutcome {
        task_id,
        prefix: request.prefix,
        summary,
    })
}

async fn wait_for_task(ctx: &JobContext, task_id: &str) -> Result<ExportTaskStatus, ExportError> {
    let cfg = &ctx.config().export;
    let policy = PollPolicy::fixed(
        StdDuration::from_secs(cfg.poll_interval_secs),
        cfg.poll_max_attempts,
    );

    poll_until(
        &policy,
        "export task",
        || async move {
            let status = ctx.logs().describe_export_task(task_id).await;
            if let Ok(s) = &status {
                tracing::info!(%task_id, status = s.code(), "TASK STATUS");
            }
            status
        },
        ExportTaskStatus::is_pending,
    )
    .await
    .map_err(|source| {
        tracing::error!(%task_id, error = %source, "Task is failed");
        ExportError::Poll {
            what: "export task",
            id: task_id.to_string(),
            source,
        }
    })
}
