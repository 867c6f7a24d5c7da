//! Instructor decision handling.
//!
//! A decision is committed with a compare-and-set against `pending`. Side
//! effects that follow an approval (posting the comment, handing off the
//! merge) never roll the decision back; their failures are reported as
//! [`DecisionWarning`]s on an otherwise successful [`DecisionOutcome`].

use super::comment::render_review_comment;
use super::merge::{MergeCoordinator, MergeCoordinatorResult, MergeRequestOutcome};
use super::retry::retry_with_backoff;
use crate::config::WorkflowConfig;
use crate::review::{
    domain::{
        Decision, DecisionAction, Review, ReviewDomainError, ReviewId, ReviewMutation,
        ReviewStatus,
    },
    ports::{CodeHost, ReviewRepository, ReviewRepositoryError},
};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Decision requested by the instructor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecideReviewRequest {
    /// Approve or reject.
    pub action: DecisionAction,
    /// Optional free-text notes.
    pub notes: Option<String>,
    /// Whether to merge the pull request after an approval.
    pub auto_merge: bool,
}

impl DecideReviewRequest {
    /// Creates a request for `action` without notes or auto-merge.
    #[must_use]
    pub const fn new(action: DecisionAction) -> Self {
        Self {
            action,
            notes: None,
            auto_merge: false,
        }
    }

    /// Shorthand for an approval.
    #[must_use]
    pub const fn approve() -> Self {
        Self::new(DecisionAction::Approve)
    }

    /// Shorthand for a rejection.
    #[must_use]
    pub const fn reject() -> Self {
        Self::new(DecisionAction::Reject)
    }

    /// Attaches instructor notes.
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Sets the auto-merge flag.
    #[must_use]
    pub const fn with_auto_merge(mut self, auto_merge: bool) -> Self {
        self.auto_merge = auto_merge;
        self
    }
}

/// Degraded side effect of a committed decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionWarning {
    /// The review comment could not be posted to the code host.
    CommentNotPosted {
        /// Failure description.
        reason: String,
    },
}

/// Join handle for the asynchronous merge hand-off.
pub type MergeHandoff = JoinHandle<MergeCoordinatorResult<MergeRequestOutcome>>;

/// Result of a committed decision.
#[derive(Debug)]
pub struct DecisionOutcome {
    /// Review as stored after the decision.
    pub review: Review,
    /// Side effects that did not complete.
    pub warnings: Vec<DecisionWarning>,
    /// Merge hand-off task, present for approvals with auto-merge. Dropping
    /// the handle detaches the task.
    pub merge_handoff: Option<MergeHandoff>,
}

/// Errors returned by [`ReviewDecisionService::decide`].
#[derive(Debug, Error)]
pub enum DecisionError {
    /// No review exists with the given identifier.
    #[error("review {0} not found")]
    NotFound(ReviewId),

    /// The review has already been decided.
    #[error("review {review_id} already decided (current status: {status})")]
    InvalidState {
        /// Review identifier.
        review_id: ReviewId,
        /// Current status.
        status: ReviewStatus,
    },

    /// Another decision was committed concurrently.
    #[error("review {0} was decided concurrently; refresh and retry")]
    Conflict(ReviewId),

    /// Repository operation failed.
    #[error(transparent)]
    Repository(ReviewRepositoryError),
}

impl DecisionError {
    /// Returns whether the caller may refresh and try again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl From<ReviewRepositoryError> for DecisionError {
    fn from(err: ReviewRepositoryError) -> Self {
        match err {
            ReviewRepositoryError::NotFound(review_id) => Self::NotFound(review_id),
            ReviewRepositoryError::Conflict { review_id, .. } => Self::Conflict(review_id),
            ReviewRepositoryError::Rejected(ReviewDomainError::AlreadyDecided {
                review_id,
                status,
            }) => Self::InvalidState { review_id, status },
            other => Self::Repository(other),
        }
    }
}

/// Result type for decision operations.
pub type DecisionResult<T> = Result<T, DecisionError>;

/// Applies instructor decisions and triggers their side effects.
pub struct ReviewDecisionService<R, H, C>
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

impl<R, H, C> ReviewDecisionService<R, H, C>
where
    R: ReviewRepository + 'static,
    H: CodeHost + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a decision service with its own merge coordinator.
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

    /// Records a decision on a pending review.
    ///
    /// Approvals post the rendered review comment; approvals with auto-merge
    /// also spawn the merge hand-off on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`DecisionError::NotFound`] for unknown reviews,
    /// [`DecisionError::InvalidState`] when the review is not pending,
    /// [`DecisionError::Conflict`] when a concurrent decision won, or
    /// repository errors.
    pub async fn decide(
        &self,
        review_id: ReviewId,
        request: DecideReviewRequest,
    ) -> DecisionResult<DecisionOutcome> {
        let current = self
            .repository
            .find_by_id(review_id)
            .await?
            .ok_or(DecisionError::NotFound(review_id))?;
        if current.status().is_decided() {
            return Err(DecisionError::InvalidState {
                review_id,
                status: current.status(),
            });
        }

        let decision = Decision::new(
            request.action,
            request.notes,
            request.auto_merge,
            &*self.clock,
        );
        let review = self
            .repository
            .compare_and_set(review_id, ReviewMutation::Decide(decision))
            .await?;
        info!(
            %review_id,
            pr_number = review.pull_request().number().value(),
            status = %review.status(),
            auto_merge = review.auto_merge_requested(),
            "review decided"
        );

        let mut warnings = Vec::new();
        if review.status() == ReviewStatus::Posted {
            if let Err(reason) = self.post_comment(&review).await {
                warn!(%review_id, %reason, "review comment not posted");
                warnings.push(DecisionWarning::CommentNotPosted { reason });
            }
        }

        let merge_handoff = review.awaits_merge_request().then(|| {
            let coordinator = self.coordinator.clone();
            tokio::spawn(async move { coordinator.request_merge(review_id).await })
        });

        Ok(DecisionOutcome {
            review,
            warnings,
            merge_handoff,
        })
    }

    async fn post_comment(&self, review: &Review) -> Result<(), String> {
        let body = render_review_comment(review).map_err(|err| err.to_string())?;
        let target = review.pull_request().target();
        retry_with_backoff(self.config.retry, self.config.call_timeout, || {
            self.code_host.post_review_comment(&target, &body)
        })
        .await
        .into_result()
        .map_err(|err| err.to_string())
    }
}
