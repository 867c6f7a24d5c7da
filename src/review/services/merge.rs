//! Merge coordination for approved reviews that asked for an automatic merge.

use super::retry::{RetryOutcome, retry_with_backoff};
use crate::config::WorkflowConfig;
use crate::review::{
    domain::{MergeState, Review, ReviewId, ReviewMutation, ReviewStatus},
    ports::{CodeHost, MergeRequest, MergeResponse, ReviewRepository, ReviewRepositoryError},
};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Result of a merge request for one review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeRequestOutcome {
    /// The code host accepted the merge; confirmation comes from polling.
    Accepted,
    /// The code host refused the merge; the review is now `failed`.
    Rejected {
        /// Reason reported by the code host.
        reason: String,
    },
    /// The code host could not be reached; the review stays `requested` and
    /// the poller keeps checking it.
    Deferred {
        /// Last error observed.
        reason: String,
    },
    /// Another caller already moved the merge state; nothing was done.
    AlreadyRequested(MergeState),
}

/// Errors returned by [`MergeCoordinator`].
#[derive(Debug, Error)]
pub enum MergeCoordinatorError {
    /// No review exists with the given identifier.
    #[error("review {0} not found")]
    NotFound(ReviewId),

    /// The review is not an approval with auto-merge requested.
    #[error("review {review_id} is not eligible for auto-merge (status: {status})")]
    NotEligible {
        /// Review identifier.
        review_id: ReviewId,
        /// Current review status.
        status: ReviewStatus,
    },

    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] ReviewRepositoryError),
}

/// Result type for merge coordination.
pub type MergeCoordinatorResult<T> = Result<T, MergeCoordinatorError>;

/// Requests remote merges and records their immediate outcome.
pub struct MergeCoordinator<R, H, C>
where
    R: ReviewRepository,
    H: CodeHost,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    code_host: Arc<H>,
    clock: Arc<C>,
    config: WorkflowConfig,
}

impl<R, H, C> Clone for MergeCoordinator<R, H, C>
where
    R: ReviewRepository,
    H: CodeHost,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            code_host: Arc::clone(&self.code_host),
            clock: Arc::clone(&self.clock),
            config: self.config,
        }
    }
}

impl<R, H, C> MergeCoordinator<R, H, C>
where
    R: ReviewRepository,
    H: CodeHost,
    C: Clock + Send + Sync,
{
    /// Creates a new merge coordinator.
    #[must_use]
    pub const fn new(
        repository: Arc<R>,
        code_host: Arc<H>,
        clock: Arc<C>,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            repository,
            code_host,
            clock,
            config,
        }
    }

    /// Moves the review to `requested` and asks the code host to merge.
    ///
    /// Losing the `not_requested -> requested` race is not an error: the
    /// winner owns the remote call, so this returns
    /// [`MergeRequestOutcome::AlreadyRequested`] without calling the host.
    ///
    /// # Errors
    ///
    /// Returns [`MergeCoordinatorError::NotFound`] for unknown reviews,
    /// [`MergeCoordinatorError::NotEligible`] when the review is not an
    /// approval with auto-merge, or repository errors.
    pub async fn request_merge(
        &self,
        review_id: ReviewId,
    ) -> MergeCoordinatorResult<MergeRequestOutcome> {
        let review = self
            .repository
            .find_by_id(review_id)
            .await?
            .ok_or(MergeCoordinatorError::NotFound(review_id))?;
        if review.status() != ReviewStatus::Posted || !review.auto_merge_requested() {
            return Err(MergeCoordinatorError::NotEligible {
                review_id,
                status: review.status(),
            });
        }

        let mutation = ReviewMutation::RequestMerge {
            at: self.clock.utc(),
        };
        let requested = match self.repository.compare_and_set(review_id, mutation).await {
            Ok(updated) => updated,
            Err(ReviewRepositoryError::Conflict { .. }) => {
                let current = self
                    .repository
                    .find_by_id(review_id)
                    .await?
                    .map_or(review.merge_state(), |latest| latest.merge_state());
                debug!(%review_id, merge_state = %current, "merge already requested");
                return Ok(MergeRequestOutcome::AlreadyRequested(current));
            }
            Err(err) => return Err(err.into()),
        };
        info!(
            %review_id,
            pr_number = requested.pull_request().number().value(),
            merge_state = %requested.merge_state(),
            "merge requested"
        );

        self.call_code_host(&requested).await
    }

    async fn call_code_host(
        &self,
        review: &Review,
    ) -> MergeCoordinatorResult<MergeRequestOutcome> {
        let review_id = review.id();
        let pull_request = review.pull_request();
        let target = pull_request.target();
        let request = MergeRequest {
            method: self.config.merge_method,
            commit_title: format!(
                "Merge PR #{}: {}",
                pull_request.number(),
                pull_request.title()
            ),
        };

        let outcome = retry_with_backoff(self.config.retry, self.config.call_timeout, || {
            self.code_host.request_merge(&target, &request)
        })
        .await;

        match outcome {
            RetryOutcome::Success(MergeResponse::Accepted) => {
                info!(%review_id, pr_number = target.number.value(), "merge accepted by code host");
                Ok(MergeRequestOutcome::Accepted)
            }
            RetryOutcome::Success(MergeResponse::Rejected { reason }) => {
                self.record_rejection(review_id, &reason).await?;
                Ok(MergeRequestOutcome::Rejected { reason })
            }
            RetryOutcome::Exhausted {
                last_error,
                attempts,
            } => {
                warn!(
                    %review_id,
                    attempts,
                    error = %last_error,
                    "merge request deferred after exhausting retries"
                );
                Ok(MergeRequestOutcome::Deferred {
                    reason: last_error.to_string(),
                })
            }
            RetryOutcome::Permanent(error) => {
                warn!(%review_id, %error, "merge request deferred after permanent failure");
                Ok(MergeRequestOutcome::Deferred {
                    reason: error.to_string(),
                })
            }
        }
    }

    async fn record_rejection(
        &self,
        review_id: ReviewId,
        reason: &str,
    ) -> MergeCoordinatorResult<()> {
        let mutation = ReviewMutation::FailMerge {
            reason: reason.to_owned(),
            at: self.clock.utc(),
        };
        match self.repository.compare_and_set(review_id, mutation).await {
            Ok(_) => {
                info!(%review_id, reason, merge_state = %MergeState::Failed, "merge rejected");
                Ok(())
            }
            Err(ReviewRepositoryError::Conflict { actual, .. }) => {
                debug!(%review_id, merge_state = %actual, "merge outcome already reconciled");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}
