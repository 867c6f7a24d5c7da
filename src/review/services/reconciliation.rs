//! Periodic reconciliation of requested merges against the code host.
//!
//! Each sweep first re-issues merge requests for approvals whose hand-off
//! never ran, then visits every review with `merge_state = requested` and
//! moves it to `confirmed` or `failed` once the remote pull request settles.
//! Reviews that are still open get their `merge_checked_at` refreshed. A
//! failure on one review is logged and counted but never aborts the sweep, so
//! running a sweep twice against an unchanged code host is harmless.

use super::merge::{MergeCoordinator, MergeRequestOutcome};
use crate::config::WorkflowConfig;
use crate::review::{
    domain::{MergeState, Review, ReviewMutation, ReviewStatus},
    ports::{
        CodeHost, CodeHostError, RemotePullRequestState, ReviewFilter, ReviewRepository,
        ReviewRepositoryError,
    },
};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

const CLOSED_UNMERGED_REASON: &str = "pull request was closed without being merged";
const NOT_MERGEABLE_REASON: &str = "pull request cannot be merged";

/// Counts from one reconciliation sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Approved reviews whose pending merge request was issued by this sweep.
    pub merges_requested: usize,
    /// Reviews with a requested merge that were examined.
    pub examined: usize,
    /// Reviews moved to `confirmed`.
    pub confirmed: usize,
    /// Reviews moved to `failed`.
    pub failed: usize,
    /// Reviews whose pull request is still open.
    pub still_open: usize,
    /// Reviews already reconciled or requested by a concurrent writer.
    pub skipped: usize,
    /// Reviews that could not be checked this sweep.
    pub errors: usize,
}

/// Errors that abort a sweep before any review is visited.
#[derive(Debug, Error)]
pub enum ReconciliationError {
    /// Listing pending or requested merges failed.
    #[error(transparent)]
    Repository(#[from] ReviewRepositoryError),
}

#[derive(Debug, Error)]
enum ReviewSyncError {
    #[error(transparent)]
    Remote(#[from] CodeHostError),
    #[error(transparent)]
    Store(#[from] ReviewRepositoryError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReviewSync {
    Confirmed,
    Failed,
    StillOpen,
    Skipped,
}

/// Polls the code host for reviews awaiting merge confirmation.
pub struct ReconciliationPoller<R, H, C>
where
    R: ReviewRepository,
    H: CodeHost,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    code_host: Arc<H>,
    clock: Arc<C>,
    config: WorkflowConfig,
    coordinator: MergeCoordinator<R, H, C>,
}

impl<R, H, C> ReconciliationPoller<R, H, C>
where
    R: ReviewRepository + 'static,
    H: CodeHost + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a new poller.
    #[must_use]
    pub fn new(
        repository: Arc<R>,
        code_host: Arc<H>,
        clock: Arc<C>,
        config: WorkflowConfig,
    ) -> Self {
        let coordinator = MergeCoordinator::new(
            Arc::clone(&repository),
            Arc::clone(&code_host),
            Arc::clone(&clock),
            config,
        );
        Self {
            repository,
            code_host,
            clock,
            config,
            coordinator,
        }
    }

    /// Runs one reconciliation pass.
    ///
    /// Approved reviews that asked for auto-merge but are still
    /// `not_requested` are handed to the merge coordinator first. Its
    /// `not_requested -> requested` compare-and-set keeps this safe against a
    /// decision hand-off that is still running.
    ///
    /// # Errors
    ///
    /// Returns [`ReconciliationError::Repository`] when the pending or
    /// requested reviews cannot be listed. Per-review failures are counted in
    /// the report.
    pub async fn sweep(&self) -> Result<SweepReport, ReconciliationError> {
        let mut report = SweepReport::default();
        self.resume_merge_requests(&mut report).await?;

        let pending = self
            .repository
            .list(ReviewFilter::all().with_merge_state(MergeState::Requested))
            .await?;
        report.examined = pending.len();
        for review in &pending {
            match self.reconcile(review).await {
                Ok(ReviewSync::Confirmed) => report.confirmed += 1,
                Ok(ReviewSync::Failed) => report.failed += 1,
                Ok(ReviewSync::StillOpen) => report.still_open += 1,
                Ok(ReviewSync::Skipped) => report.skipped += 1,
                Err(err) => {
                    warn!(review_id = %review.id(), error = %err, "merge reconciliation failed");
                    report.errors += 1;
                }
            }
        }

        if report.examined > 0 || report.merges_requested > 0 {
            info!(
                merges_requested = report.merges_requested,
                examined = report.examined,
                confirmed = report.confirmed,
                failed = report.failed,
                still_open = report.still_open,
                skipped = report.skipped,
                errors = report.errors,
                "reconciliation sweep complete"
            );
        }
        Ok(report)
    }

    async fn resume_merge_requests(
        &self,
        report: &mut SweepReport,
    ) -> Result<(), ReconciliationError> {
        let awaiting = self
            .repository
            .list(
                ReviewFilter::all()
                    .with_status(ReviewStatus::Posted)
                    .with_merge_state(MergeState::NotRequested),
            )
            .await?;

        for review in awaiting.iter().filter(|review| review.awaits_merge_request()) {
            let review_id = review.id();
            match self.coordinator.request_merge(review_id).await {
                Ok(MergeRequestOutcome::AlreadyRequested(merge_state)) => {
                    debug!(%review_id, %merge_state, "merge hand-off already running");
                    report.skipped += 1;
                }
                Ok(outcome) => {
                    info!(%review_id, ?outcome, "pending merge request issued");
                    report.merges_requested += 1;
                }
                Err(err) => {
                    warn!(%review_id, error = %err, "pending merge request failed");
                    report.errors += 1;
                }
            }
        }
        Ok(())
    }

    async fn reconcile(&self, review: &Review) -> Result<ReviewSync, ReviewSyncError> {
        let review_id = review.id();
        let target = review.pull_request().target();
        let remote = tokio::time::timeout(
            self.config.call_timeout,
            self.code_host.pull_request_state(&target),
        )
        .await
        .unwrap_or(Err(CodeHostError::Timeout(self.config.call_timeout)))?;

        let at = self.clock.utc();
        let (mutation, sync) = match remote {
            RemotePullRequestState::Merged => {
                (ReviewMutation::ConfirmMerge { at }, ReviewSync::Confirmed)
            }
            RemotePullRequestState::ClosedUnmerged => (
                ReviewMutation::FailMerge {
                    reason: CLOSED_UNMERGED_REASON.to_owned(),
                    at,
                },
                ReviewSync::Failed,
            ),
            RemotePullRequestState::NotMergeable => (
                ReviewMutation::FailMerge {
                    reason: NOT_MERGEABLE_REASON.to_owned(),
                    at,
                },
                ReviewSync::Failed,
            ),
            RemotePullRequestState::Open => {
                (ReviewMutation::RecordMergeCheck { at }, ReviewSync::StillOpen)
            }
        };

        match self.repository.compare_and_set(review_id, mutation).await {
            Ok(updated) => {
                if sync != ReviewSync::StillOpen {
                    info!(
                        %review_id,
                        pr_number = target.number.value(),
                        merge_state = %updated.merge_state(),
                        "merge state reconciled"
                    );
                }
                Ok(sync)
            }
            Err(ReviewRepositoryError::Conflict { actual, .. }) => {
                debug!(%review_id, merge_state = %actual, "review reconciled concurrently");
                Ok(ReviewSync::Skipped)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Runs [`Self::sweep`] every poll interval until `shutdown` becomes
    /// `true` or its sender is dropped.
    ///
    /// The first sweep runs immediately. Ticks missed while a sweep is
    /// running are delayed rather than replayed.
    #[must_use]
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.config.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                if *shutdown.borrow() {
                    break;
                }
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(err) = self.sweep().await {
                            error!(error = %err, "reconciliation sweep failed");
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
            debug!("reconciliation poller stopped");
        })
    }
}
