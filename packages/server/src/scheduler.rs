use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::{Instant, timeout};
use tracing::{debug, error, info, instrument, warn};
use utoipa::ToSchema;

use crate::dlq::{AttemptOutcome, DeadLetterStore, RecordedAttempt, StoreError, ThresholdMonitor};
use crate::reconcile::{EventReconciler, ReconcileOutcome};

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("a retry run is already in progress")]
    AlreadyRunning,

    #[error("dead-letter store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}

/// Counters for one retry run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct RetrySummary {
    /// Items attempted in this run.
    #[schema(example = 3)]
    pub retried: u64,
    /// Attempts that removed the item from the queue.
    #[schema(example = 2)]
    pub succeeded: u64,
    /// Attempts that were recorded as failures.
    #[schema(example = 1)]
    pub failed: u64,
    /// Successes that changed a shipment.
    #[schema(example = 1)]
    pub applied: u64,
    /// Successes with nothing to apply (unknown type, missing reference, ...).
    #[schema(example = 1)]
    pub skipped: u64,
    /// Ready items left for the next run because the time budget ran out.
    #[schema(example = 0)]
    pub deferred: u64,
    /// Whether a backlog alert was raised.
    pub alerted: bool,
}

/// Fraction of the run budget (1/N) held back for recording the last attempt.
pub const BOOKKEEPING_SHARE: u32 = 4;

/// Drains due dead-letter items through the reconciler.
pub struct RetryScheduler {
    store: Arc<dyn DeadLetterStore>,
    reconciler: EventReconciler,
    monitor: ThresholdMonitor,
    budget: Duration,
    run_lock: Mutex<()>,
}

impl RetryScheduler {
    pub fn new(
        store: Arc<dyn DeadLetterStore>,
        reconciler: EventReconciler,
        monitor: ThresholdMonitor,
        budget: Duration,
    ) -> Self {
        Self {
            store,
            reconciler,
            monitor,
            budget,
            run_lock: Mutex::new(()),
        }
    }

    pub async fn run_once(&self) -> Result<RetrySummary, SchedulerError> {
        self.run_at(Utc::now()).await
    }

    /// One retry run evaluated at `now`.
    ///
    /// Fails fast with [`SchedulerError::AlreadyRunning`] if another run holds the
    /// lock, and with [`SchedulerError::StoreUnavailable`] if the ready items cannot
    /// be listed. Per-item failures never abort the run.
    ///
    /// Every store and reconcile call is bounded by the run budget. Reconcile calls
    /// stop a 1/[`BOOKKEEPING_SHARE`] slice of the budget before the deadline so the
    /// last outcome can still be recorded.
    #[instrument(skip(self))]
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<RetrySummary, SchedulerError> {
        let Ok(_guard) = self.run_lock.try_lock() else {
            warn!("Retry run requested while another run is in progress");
            return Err(SchedulerError::AlreadyRunning);
        };

        let started = Instant::now();
        let deadline = started + self.budget;
        let work_deadline = started + (self.budget - self.budget / BOOKKEEPING_SHARE);

        let alerted = match timeout(remaining(work_deadline), self.monitor.check(now)).await {
            Ok(alerted) => alerted,
            Err(_) => {
                warn!("Threshold check did not finish within the run budget");
                false
            }
        };
        let mut summary = RetrySummary {
            alerted,
            ..Default::default()
        };

        let items = timeout(remaining(deadline), self.store.list_ready_for_retry(now))
            .await
            .map_err(|_| StoreError::Timeout)??;
        info!(ready = items.len(), "Starting retry run");

        for (index, item) in items.iter().enumerate() {
            let window = remaining(work_deadline);
            if window.is_zero() {
                summary.deferred = (items.len() - index) as u64;
                warn!(
                    deferred = summary.deferred,
                    budget_secs = self.budget.as_secs(),
                    "Retry run budget exhausted, deferring remaining items"
                );
                break;
            }

            summary.retried += 1;
            let reconciled = timeout(
                window,
                self.reconciler.reconcile_payload(
                    &item.event_type,
                    &item.payload,
                    item.reference_number.as_deref(),
                    now,
                ),
            )
            .await;

            let (outcome, applied) = match reconciled {
                Ok(Ok(ReconcileOutcome::Applied)) => (AttemptOutcome::Succeeded, true),
                Ok(Ok(ReconcileOutcome::Skipped(reason))) => {
                    debug!(
                        id = item.id,
                        event_type = %item.event_type,
                        reason = %reason,
                        "Event skipped"
                    );
                    (AttemptOutcome::Succeeded, false)
                }
                Ok(Err(e)) => (AttemptOutcome::Failed(e.to_string()), false),
                Err(_) => (
                    AttemptOutcome::Failed(format!(
                        "reconciliation timed out after {}ms",
                        window.as_millis()
                    )),
                    false,
                ),
            };

            let recorded = timeout(
                remaining(deadline),
                self.store.record_attempt(item, &outcome, now),
            )
            .await
            .unwrap_or(Err(StoreError::Timeout));

            match recorded {
                Ok(recorded) => {
                    if outcome == AttemptOutcome::Succeeded {
                        summary.succeeded += 1;
                        if applied {
                            summary.applied += 1;
                        } else {
                            summary.skipped += 1;
                        }
                    } else {
                        summary.failed += 1;
                    }
                    log_recorded(item.id, &item.event_type, &outcome, recorded);
                }
                Err(StoreError::Timeout) => {
                    summary.failed += 1;
                    summary.deferred = (items.len() - index - 1) as u64;
                    error!(
                        id = item.id,
                        event_type = %item.event_type,
                        deferred = summary.deferred,
                        "Recording retry attempt did not finish within the run budget"
                    );
                    break;
                }
                Err(e) => {
                    error!(
                        id = item.id,
                        event_type = %item.event_type,
                        error = %e,
                        "Failed to record retry attempt"
                    );
                    summary.failed += 1;
                }
            }
        }

        info!(
            retried = summary.retried,
            succeeded = summary.succeeded,
            failed = summary.failed,
            applied = summary.applied,
            skipped = summary.skipped,
            deferred = summary.deferred,
            alerted = summary.alerted,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Retry run finished"
        );

        Ok(summary)
    }
}

fn remaining(deadline: Instant) -> Duration {
    deadline.saturating_duration_since(Instant::now())
}

fn log_recorded(id: i32, event_type: &str, outcome: &AttemptOutcome, recorded: RecordedAttempt) {
    match recorded {
        RecordedAttempt::Removed => debug!(id, event_type, "Dead-letter item resolved"),
        RecordedAttempt::Rescheduled {
            attempt_count,
            next_retry_at,
        } => {
            if let AttemptOutcome::Failed(error) = outcome {
                warn!(
                    id,
                    event_type,
                    attempt_count,
                    next_retry_at = %next_retry_at,
                    error = %error,
                    "Retry failed, rescheduled"
                );
            }
        }
        RecordedAttempt::Exhausted { attempt_count } => {
            error!(
                id,
                event_type,
                attempt_count,
                "Retry ceiling reached, item needs manual attention"
            );
        }
        RecordedAttempt::Stale => {
            warn!(
                id,
                event_type,
                "Dead-letter item changed during the attempt, result not applied"
            );
        }
    }
}

/// Run the scheduler on a fixed interval as a background task.
pub async fn run_retry_loop(scheduler: Arc<RetryScheduler>, period: Duration) {
    info!(interval_secs = period.as_secs(), "Starting in-process retry loop");

    let mut interval = tokio::time::interval(period);

    loop {
        interval.tick().await;

        if let Err(e) = scheduler.run_once().await {
            error!(error = %e, "Scheduled retry run failed");
        }
    }
}
