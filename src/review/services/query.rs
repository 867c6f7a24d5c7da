//! Read-only queries backing the instructor dashboard.

use crate::review::{
    domain::{MergeState, Review, ReviewId, ReviewStatus, Severity},
    ports::{ReviewFilter, ReviewRepository, ReviewRepositoryError},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Aggregate counts over all stored reviews.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewStats {
    /// Number of reviews.
    pub total: usize,
    /// Reviews per status; every status is present.
    pub counts_by_status: HashMap<ReviewStatus, usize>,
    /// Feedback items per severity across all reviews; every severity is
    /// present.
    pub counts_by_severity: HashMap<Severity, usize>,
}

impl ReviewStats {
    fn from_reviews(reviews: &[Review]) -> Self {
        let mut counts_by_status: HashMap<ReviewStatus, usize> =
            ReviewStatus::ALL.iter().map(|status| (*status, 0)).collect();
        let mut counts_by_severity: HashMap<Severity, usize> =
            Severity::ALL.iter().map(|severity| (*severity, 0)).collect();

        for review in reviews {
            *counts_by_status.entry(review.status()).or_default() += 1;
            for item in review.review_feedback() {
                *counts_by_severity.entry(item.severity()).or_default() += 1;
            }
        }

        Self {
            total: reviews.len(),
            counts_by_status,
            counts_by_severity,
        }
    }

    /// Returns the number of reviews with `status`.
    #[must_use]
    pub fn status_count(&self, status: ReviewStatus) -> usize {
        self.counts_by_status.get(&status).copied().unwrap_or_default()
    }

    /// Returns the number of feedback items with `severity`.
    #[must_use]
    pub fn severity_count(&self, severity: Severity) -> usize {
        self.counts_by_severity
            .get(&severity)
            .copied()
            .unwrap_or_default()
    }
}

/// Merge progress of one review's pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeStatusView {
    /// Review identifier.
    pub review_id: ReviewId,
    /// Reconciled merge state.
    pub merge_state: MergeState,
    /// Whether the instructor asked for an automatic merge.
    pub auto_merge_requested: bool,
    /// When the code host was last checked, if ever.
    pub last_checked_at: Option<DateTime<Utc>>,
}

impl From<&Review> for MergeStatusView {
    fn from(review: &Review) -> Self {
        Self {
            review_id: review.id(),
            merge_state: review.merge_state(),
            auto_merge_requested: review.auto_merge_requested(),
            last_checked_at: review.merge_checked_at(),
        }
    }
}

/// Errors returned by [`ReviewQueryService`].
#[derive(Debug, Error)]
pub enum ReviewQueryError {
    /// No review exists with the given identifier.
    #[error("review {0} not found")]
    NotFound(ReviewId),

    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] ReviewRepositoryError),
}

/// Result type for review queries.
pub type ReviewQueryResult<T> = Result<T, ReviewQueryError>;

/// Read-only review queries.
#[derive(Clone)]
pub struct ReviewQueryService<R>
where
    R: ReviewRepository,
{
    repository: Arc<R>,
}

impl<R> ReviewQueryService<R>
where
    R: ReviewRepository,
{
    /// Creates a query service.
    #[must_use]
    pub const fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Lists reviews matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns repository errors.
    pub async fn list(&self, filter: ReviewFilter) -> ReviewQueryResult<Vec<Review>> {
        Ok(self.repository.list(filter).await?)
    }

    /// Returns one review.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewQueryError::NotFound`] for unknown reviews or
    /// repository errors.
    pub async fn get(&self, review_id: ReviewId) -> ReviewQueryResult<Review> {
        self.repository
            .find_by_id(review_id)
            .await?
            .ok_or(ReviewQueryError::NotFound(review_id))
    }

    /// Returns counts by status and by feedback severity.
    ///
    /// # Errors
    ///
    /// Returns repository errors.
    pub async fn stats(&self) -> ReviewQueryResult<ReviewStats> {
        let reviews = self.repository.list(ReviewFilter::all()).await?;
        Ok(ReviewStats::from_reviews(&reviews))
    }

    /// Returns the merge progress of a review's pull request.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewQueryError::NotFound`] for unknown reviews or
    /// repository errors.
    pub async fn pr_status(&self, review_id: ReviewId) -> ReviewQueryResult<MergeStatusView> {
        let review = self.get(review_id).await?;
        Ok(MergeStatusView::from(&review))
    }
}
