//! Once-per-day rollup of export task output.
//!
//! The last summarized date is persisted, so the summary goes out on the first
//! completed export run after midnight instead of depending on a run landing
//! exactly at 00:00. Without a marker (first run, or a deployment whose state
//! does not outlive the process) only a run inside the first export window of
//! the day summarizes.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc};

use crate::constants::{EXPORT_SUMMARY_NOTIFY_TAG, EXPORT_WINDOW_MINUTES};
use crate::error::ExportError;
use crate::report::date_prefix;
use crate::state::JobContext;
use crate::store::operations::markers::SummaryMarker;

pub const EXPORT_SUMMARY: &str = "export_task";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryOutcome {
    NotDue {
        target: NaiveDate,
    },
    Sent {
        date: NaiveDate,
        object_count: usize,
        notified: bool,
    },
}

/// The day a summary taken at `now` reports on.
pub fn target_date(now: DateTime<Utc>) -> NaiveDate {
    (now - Duration::days(1)).date_naive()
}

/// Whether `now` falls in the first export window after midnight UTC.
pub fn in_first_window(now: DateTime<Utc>) -> bool {
    let window = Duration::minutes(EXPORT_WINDOW_MINUTES).num_seconds();
    i64::from(now.num_seconds_from_midnight()) < window
}

pub fn is_due(last: Option<&SummaryMarker>, target: NaiveDate, now: DateTime<Utc>) -> bool {
    match last {
        Some(marker) => marker.date < target,
        None => in_first_window(now),
    }
}

pub async fn run_if_due(
    ctx: &JobContext,
    now: DateTime<Utc>,
) -> Result<SummaryOutcome, ExportError> {
    let target = target_date(now);
    let store = ctx.store().ok_or(ExportError::StoreUnavailable)?;
    let last = store.get_summary_marker(EXPORT_SUMMARY)?;

    if !is_due(last.as_ref(), target, now) {
        tracing::debug!(%target, has_marker = last.is_some(), "Daily summary not due");
        return Ok(SummaryOutcome::NotDue { target });
    }

    let cfg = ctx.config();
    let prefix = date_prefix(&cfg.bucket.path, target);
    let keys = ctx.storage().list_keys(&cfg.bucket.name, &prefix).await?;
    let object_count = keys.len();

    tracing::info!(
        "{}/{}/{} Summary",
        target.year(),
        target.month(),
        target.day()
    );
    tracing::info!(object_count, %prefix, "{} reports saved", object_count);

    let notifier = ctx.notifier();
    let message = notifier.message(format!(
        "{EXPORT_SUMMARY_NOTIFY_TAG}\t{object_count} task has completed"
    ));
    let notified = notifier.notify(&message).await;

    store.save_summary_marker(
        EXPORT_SUMMARY,
        &SummaryMarker {
            date: target,
            object_count,
            recorded_at: now,
        },
    )?;

    Ok(SummaryOutcome::Sent {
        date: target,
        object_count,
        notified,
    })
}
