//! Cron-driven run scheduling.
//!
//! Each fire spawns an independent run. There is no lock between runs: if a
//! run is still going when the next fire arrives, both proceed. That is safe
//! because label provisioning is idempotent and re-applying a label to a
//! message is a no-op on the provider.

use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::error::ConfigError;
use crate::pipeline::InboxClassifier;
use crate::pipeline::types::RunStatus;

/// Parse a schedule expression.
///
/// Standard 5-field crontab (`min hour dom mon dow`) gets a leading `0`
/// seconds field, and its day-of-week field is rewritten from crontab
/// numbering (0 or 7 = Sunday, 1 = Monday) to day names. 6- and 7-field
/// expressions are passed through in the `cron` crate's own dialect.
pub fn parse_schedule(expression: &str) -> Result<cron::Schedule, ConfigError> {
    let invalid = |message: String| ConfigError::InvalidValue {
        key: "CRON_SCHEDULE".into(),
        message: format!("invalid cron expression '{expression}': {message}"),
    };

    let trimmed = expression.trim();
    let fields: Vec<&str> = trimmed.split_whitespace().collect();
    let normalized = if let [minute, hour, dom, month, dow] = fields.as_slice() {
        let dow = crontab_day_of_week(dow).map_err(invalid)?;
        format!("0 {minute} {hour} {dom} {month} {dow}")
    } else {
        trimmed.to_string()
    };

    cron::Schedule::from_str(&normalized).map_err(|e| invalid(e.to_string()))
}

const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Rewrite a crontab day-of-week field into day names.
///
/// Numeric items (values, ranges, steps, lists) are expanded into an explicit
/// list of names, so `1-5` becomes `Mon,Tue,Wed,Thu,Fri` and `5-7` wraps to
/// Sunday. Items already written with names are left alone.
fn crontab_day_of_week(field: &str) -> Result<String, String> {
    let mut items = Vec::new();

    for item in field.split(',') {
        let (range, step) = match item.split_once('/') {
            Some((range, step)) => {
                let step: u32 = step
                    .parse()
                    .ok()
                    .filter(|s| *s > 0)
                    .ok_or_else(|| format!("invalid day-of-week step in '{item}'"))?;
                (range, Some(step))
            }
            None => (item, None),
        };

        let bounds = match range {
            "*" if step.is_none() => {
                items.push("*".to_string());
                continue;
            }
            "*" => Some((0, 6)),
            _ => match range.split_once('-') {
                Some((start, end)) => start.parse::<u32>().ok().zip(end.parse::<u32>().ok()),
                None => range
                    .parse::<u32>()
                    .ok()
                    .map(|start| (start, if step.is_some() { 6 } else { start })),
            },
        };

        let Some((start, end)) = bounds else {
            items.push(item.to_string());
            continue;
        };
        if start > 7 || end > 7 || start > end {
            return Err(format!("day of week '{item}' must be within 0-7"));
        }

        let mut days: Vec<u32> = (start..=end)
            .step_by(step.unwrap_or(1) as usize)
            .map(|d| d % 7)
            .collect();
        days.sort_unstable();
        days.dedup();
        items.extend(days.into_iter().map(|d| DAY_NAMES[d as usize].to_string()));
    }

    Ok(items.join(","))
}

/// Time until the next fire, or `None` if the schedule has no future fires.
pub fn until_next_fire(schedule: &cron::Schedule) -> Option<Duration> {
    let next = schedule.upcoming(Utc).next()?;
    Some((next - Utc::now()).to_std().unwrap_or(Duration::ZERO))
}

/// Run once and log the outcome. Run-fatal errors end the run, not the process.
pub async fn run_and_log(classifier: &InboxClassifier) {
    match classifier.run_once().await {
        Ok(summary) if summary.status() == RunStatus::PartialFailure => {
            warn!(
                run_id = %summary.run_id,
                failed = summary.failed,
                "Run finished with failures; affected messages stay unread for the next run"
            );
        }
        Ok(_) => {}
        Err(e) => {
            error!(error = %e, "Run aborted");
        }
    }
}

/// Spawn the scheduler loop.
///
/// Returns a `JoinHandle` and a shutdown flag. Set the flag to stop
/// scheduling new runs; runs already in flight are not cancelled.
pub fn spawn_scheduler(
    classifier: Arc<InboxClassifier>,
    schedule: cron::Schedule,
) -> (JoinHandle<()>, Arc<AtomicBool>) {
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = Arc::clone(&shutdown);

    let handle = tokio::spawn(async move {
        info!("Scheduler started");

        loop {
            let Some(wait) = until_next_fire(&schedule) else {
                warn!("Schedule has no upcoming fire times, scheduler stopping");
                return;
            };
            tokio::time::sleep(wait).await;

            if shutdown.load(Ordering::Relaxed) {
                info!("Scheduler shutting down");
                return;
            }

            let classifier = Arc::clone(&classifier);
            tokio::spawn(async move {
                run_and_log(&classifier).await;
            });

            // Step past the fire time we just handled.
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    });

    (handle, shutdown_flag)
}
