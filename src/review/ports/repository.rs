//! Repository port for review persistence and guarded mutation.

use crate::review::domain::{
    MergeState, PullRequestNumber, RepositoryFullName, Review, ReviewDomainError, ReviewGuard,
    ReviewId, ReviewMutation, ReviewStatus,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for review repository operations.
pub type ReviewRepositoryResult<T> = Result<T, ReviewRepositoryError>;

/// Optional equality filters for listing reviews.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReviewFilter {
    /// Only reviews with this status.
    pub status: Option<ReviewStatus>,
    /// Only reviews with this merge state.
    pub merge_state: Option<MergeState>,
}

impl ReviewFilter {
    /// Filter matching every review.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            status: None,
            merge_state: None,
        }
    }

    /// Restricts the filter to one status.
    #[must_use]
    pub const fn with_status(mut self, status: ReviewStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Restricts the filter to one merge state.
    #[must_use]
    pub const fn with_merge_state(mut self, merge_state: MergeState) -> Self {
        self.merge_state = Some(merge_state);
        self
    }

    /// Returns whether `review` passes the filter.
    #[must_use]
    pub fn matches(&self, review: &Review) -> bool {
        self.status.is_none_or(|status| review.status() == status)
            && self
                .merge_state
                .is_none_or(|merge_state| review.merge_state() == merge_state)
    }
}

/// Review persistence contract.
///
/// [`ReviewRepository::compare_and_set`] is the only way a stored review
/// changes.
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// Stores a new review.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewRepositoryError::DuplicateReview`] when the identifier
    /// exists or [`ReviewRepositoryError::DuplicateSubmission`] when a review
    /// for the same repository, pull request and commit already exists.
    async fn store(&self, review: &Review) -> ReviewRepositoryResult<()>;

    /// Finds a review by identifier.
    ///
    /// Returns `None` when the review does not exist.
    async fn find_by_id(&self, id: ReviewId) -> ReviewRepositoryResult<Option<Review>>;

    /// Finds the review generated for a specific pull request commit.
    async fn find_by_submission(
        &self,
        repository: &RepositoryFullName,
        number: PullRequestNumber,
        commit_sha: &str,
    ) -> ReviewRepositoryResult<Option<Review>>;

    /// Lists reviews matching `filter`, newest first.
    async fn list(&self, filter: ReviewFilter) -> ReviewRepositoryResult<Vec<Review>>;

    /// Applies `mutation` if its guard still holds and returns the updated
    /// review.
    ///
    /// The guard check and the write are atomic with respect to every other
    /// call on the same review.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewRepositoryError::NotFound`] for unknown reviews,
    /// [`ReviewRepositoryError::Conflict`] when the guarded value changed, and
    /// [`ReviewRepositoryError::Rejected`] when the domain refuses the change.
    async fn compare_and_set(
        &self,
        id: ReviewId,
        mutation: ReviewMutation,
    ) -> ReviewRepositoryResult<Review>;
}

/// Errors returned by review repository implementations.
#[derive(Debug, Clone, Error)]
pub enum ReviewRepositoryError {
    /// A review with the same identifier already exists.
    #[error("duplicate review identifier: {0}")]
    DuplicateReview(ReviewId),

    /// A review for the same pull request commit already exists.
    #[error("review already submitted for {repository}#{number} at {commit_sha}")]
    DuplicateSubmission {
        /// Repository.
        repository: RepositoryFullName,
        /// Pull request number.
        number: PullRequestNumber,
        /// Commit SHA.
        commit_sha: String,
    },

    /// The review was not found.
    #[error("review not found: {0}")]
    NotFound(ReviewId),

    /// The guarded value no longer matches.
    #[error("review {review_id} changed concurrently: expected {expected}, found {actual}")]
    Conflict {
        /// Review identifier.
        review_id: ReviewId,
        /// Guard the mutation required.
        expected: ReviewGuard,
        /// Value observed in storage.
        actual: String,
    },

    /// The guard held but the domain refused the mutation.
    #[error(transparent)]
    Rejected(#[from] ReviewDomainError),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl ReviewRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
