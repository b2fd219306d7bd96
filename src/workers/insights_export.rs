//! Insights export: run a Logs Insights query over the last day, save the
//! rows as CSV in the report bucket, then post the match count.

use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};

use crate::constants::{INSIGHTS_NOTIFY_TAG, INSIGHTS_WINDOW_HOURS};
use crate::error::ExportError;
use crate::poll::{poll_until, PollPolicy};
use crate::report::{flatten_records, object_key, report_filename, ReportFile};
use crate::services::logs::QueryRequest;
use crate::state::JobContext;
use crate::types::{QueryResults, QueryStatistics, QueryStatus, TimeWindow};

#[derive(Debug, Clone, PartialEq)]
pub struct InsightsReport {
    pub query_id: String,
    pub statistics: QueryStatistics,
    pub filename: String,
    pub key: String,
    pub rows: usize,
    pub notified: bool,
}

pub async fn run(ctx: &JobContext) {
    tracing::info!("Insights export worker running");
    match export(ctx, Utc::now()).await {
        Ok(report) => tracing::info!(
            query_id = %report.query_id,
            key = %report.key,
            rows = report.rows,
            "Insights export complete"
        ),
        Err(e) => tracing::error!(kind = e.kind(), error = %e, "Insights export failed"),
    }
}

pub async fn export(ctx: &JobContext, now: DateTime<Utc>) -> Result<InsightsReport, ExportError> {
    let cfg = ctx.config();
    let window = TimeWindow::trailing(now, Duration::hours(INSIGHTS_WINDOW_HOURS));

    let query_id = submit_query(ctx, window).await?;
    let results = poll_query(ctx, &query_id).await?;

    if results.status != QueryStatus::Complete {
        tracing::error!(%query_id, status = results.status.as_str(), "Querying failed");
        return Err(ExportError::QueryFailed {
            query_id,
            status: results.status.as_str().to_string(),
        });
    }

    let statistics = results.statistics.unwrap_or_default();
    tracing::info!(
        %query_id,
        scanned = statistics.records_scanned,
        matched = statistics.records_matched,
        "Querying done"
    );

    let rows = flatten_records(&results.records);
    if rows.is_empty() {
        tracing::warn!(%query_id, "Query returned no rows, skipping report");
        return Err(ExportError::EmptyResultSet { query_id });
    }
    tracing::debug!(rows = rows.len(), "Preprocessed query results");

    let filename = report_filename(&cfg.job_name, now);
    let key = object_key(&cfg.bucket.path, &filename);
    {
        let report = ReportFile::write(&cfg.scratch_dir, &filename, &rows)?;
        tracing::info!(%filename, path = %report.path().display(), "Report written");
        ctx.storage()
            .upload_file(report.path(), &cfg.bucket.name, &key)
            .await?;
    }
    tracing::info!(bucket = %cfg.bucket.name, %key, "Report uploaded");

    let notifier = ctx.notifier();
    let message = notifier.message(format!(
        "{INSIGHTS_NOTIFY_TAG}\t{} matched, saved as {}",
        statistics.records_matched, filename
    ));
    let notified = notifier.notify(&message).await;

    Ok(InsightsReport {
        query_id,
        statistics,
        filename,
        key,
        rows: rows.len(),
        notified,
    })
}

async fn submit_query(ctx: &JobContext, window: TimeWindow) -> Result<String, ExportError> {
    let cfg = ctx.config();
    let request = QueryRequest {
        log_group: cfg.log_group.clone(),
        query: cfg.insights.query.clone(),
        window,
        limit: cfg.insights.limit,
    };

    match ctx.logs().start_query(&request).await {
        Ok(query_id) => {
            tracing::info!(start = %window.start, end = %window.end, %query_id, "StartQuery");
            Ok(query_id)
        }
        Err(e) => {
            tracing::error!(error = %e, "StartQuery failed");
            Err(ExportError::Submit(e))
        }
    }
}

async fn poll_query(ctx: &JobContext, query_id: &str) -> Result<QueryResults, ExportError> {
    let cfg = &ctx.config().insights;
    let policy = PollPolicy::backoff(
        StdDuration::from_secs(cfg.poll_interval_secs),
        StdDuration::from_secs(cfg.poll_max_interval_secs),
        StdDuration::from_secs(cfg.poll_timeout_secs),
    );

    poll_until(
        &policy,
        "insights query",
        || ctx.logs().get_query_results(query_id),
        |r: &QueryResults| r.status.is_pending(),
    )
    .await
    .map_err(|source| {
        tracing::error!(%query_id, error = %source, "Gave up waiting for query");
        ExportError::Poll {
            what: "query",
            id: query_id.to_string(),
            source,
        }
    })
}
