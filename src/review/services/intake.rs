//! Intake of generated reviews from the feedback pipeline.

use crate::review::{
    domain::{
        ExpectationsApplied, FeedbackItem, NewReview, PullRequestFields, PullRequestMetadata,
        PullRequestNumber, RepositoryFullName, Review, ReviewDomainError,
    },
    ports::{ReviewRepository, ReviewRepositoryError},
};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Generated review submitted for instructor approval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitReviewRequest {
    /// Raw pull request fields.
    pub pull_request: PullRequestFields,
    /// Generated summary.
    pub review_summary: String,
    /// Generated feedback items.
    pub review_feedback: Vec<FeedbackItem>,
    /// Expectations the generator applied.
    pub expectations_applied: ExpectationsApplied,
}

/// Errors returned by [`ReviewIntakeService::submit`].
#[derive(Debug, Error)]
pub enum ReviewIntakeError {
    /// Pull request metadata failed validation.
    #[error(transparent)]
    Domain(#[from] ReviewDomainError),

    /// A review for this pull request commit already exists.
    #[error("review already submitted for {repository}#{number} at {commit_sha}")]
    DuplicateSubmission {
        /// Repository.
        repository: RepositoryFullName,
        /// Pull request number.
        number: PullRequestNumber,
        /// Commit SHA.
        commit_sha: String,
    },

    /// Repository operation failed.
    #[error(transparent)]
    Repository(ReviewRepositoryError),
}

impl From<ReviewRepositoryError> for ReviewIntakeError {
    fn from(err: ReviewRepositoryError) -> Self {
        match err {
            ReviewRepositoryError::DuplicateSubmission {
                repository,
                number,
                commit_sha,
            } => Self::DuplicateSubmission {
                repository,
                number,
                commit_sha,
            },
            other => Self::Repository(other),
        }
    }
}

/// Accepts generated reviews and stores them as `pending`.
#[derive(Clone)]
pub struct ReviewIntakeService<R, C>
where
    R: ReviewRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
}

impl<R, C> ReviewIntakeService<R, C>
where
    R: ReviewRepository,
    C: Clock + Send + Sync,
{
    /// Creates an intake service.
    #[must_use]
    pub const fn new(repository: Arc<R>, clock: Arc<C>) -> Self {
        Self { repository, clock }
    }

    /// Validates and stores a new pending review.
    ///
    /// A commit that already has a review is refused rather than reset, so a
    /// decided review never returns to `pending`.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewIntakeError::Domain`] for invalid metadata,
    /// [`ReviewIntakeError::DuplicateSubmission`] for a repeated commit, or
    /// repository errors.
    pub async fn submit(&self, request: SubmitReviewRequest) -> Result<Review, ReviewIntakeError> {
        let pull_request = PullRequestMetadata::new(request.pull_request)?;
        let existing = self
            .repository
            .find_by_submission(
                pull_request.repository(),
                pull_request.number(),
                pull_request.commit_sha(),
            )
            .await?;
        if existing.is_some() {
            return Err(ReviewIntakeError::DuplicateSubmission {
                repository: pull_request.repository().clone(),
                number: pull_request.number(),
                commit_sha: pull_request.commit_sha().to_owned(),
            });
        }

        let review = Review::new(
            NewReview {
                pull_request,
                review_summary: request.review_summary,
                review_feedback: request.review_feedback,
                expectations_applied: request.expectations_applied,
            },
            &*self.clock,
        );
        self.repository.store(&review).await?;
        info!(
            review_id = %review.id(),
            repository = %review.pull_request().repository(),
            pr_number = review.pull_request().number().value(),
            branch_type = %review.pull_request().branch_type(),
            "review submitted"
        );
        Ok(review)
    }
}
