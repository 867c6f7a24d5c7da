//! In-memory review repository for tests and local runs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::review::{
    domain::{PullRequestNumber, RepositoryFullName, Review, ReviewId, ReviewMutation},
    ports::{ReviewFilter, ReviewRepository, ReviewRepositoryError, ReviewRepositoryResult},
};

/// Thread-safe in-memory review repository.
///
/// Every compare-and-set runs under a single write lock, so guard checks and
/// writes are serialised across clones of the same repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReviewRepository {
    state: Arc<RwLock<InMemoryReviewState>>,
}

type SubmissionKey = (RepositoryFullName, PullRequestNumber, String);

#[derive(Debug, Default)]
struct InMemoryReviewState {
    reviews: HashMap<ReviewId, Review>,
    submission_index: HashMap<SubmissionKey, ReviewId>,
}

fn submission_key(review: &Review) -> SubmissionKey {
    let pull_request = review.pull_request();
    (
        pull_request.repository().clone(),
        pull_request.number(),
        pull_request.commit_sha().to_owned(),
    )
}

impl InMemoryReviewRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> ReviewRepositoryResult<RwLockReadGuard<'_, InMemoryReviewState>> {
        self.state.read().map_err(|err| {
            ReviewRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }

    fn write(&self) -> ReviewRepositoryResult<RwLockWriteGuard<'_, InMemoryReviewState>> {
        self.state.write().map_err(|err| {
            ReviewRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }
}

#[async_trait]
impl ReviewRepository for InMemoryReviewRepository {
    async fn store(&self, review: &Review) -> ReviewRepositoryResult<()> {
        let mut state = self.write()?;
        if state.reviews.contains_key(&review.id()) {
            return Err(ReviewRepositoryError::DuplicateReview(review.id()));
        }

        let key = submission_key(review);
        if state.submission_index.contains_key(&key) {
            let (repository, number, commit_sha) = key;
            return Err(ReviewRepositoryError::DuplicateSubmission {
                repository,
                number,
                commit_sha,
            });
        }

        state.submission_index.insert(key, review.id());
        state.reviews.insert(review.id(), review.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: ReviewId) -> ReviewRepositoryResult<Option<Review>> {
        let state = self.read()?;
        Ok(state.reviews.get(&id).cloned())
    }

    async fn find_by_submission(
        &self,
        repository: &RepositoryFullName,
        number: PullRequestNumber,
        commit_sha: &str,
    ) -> ReviewRepositoryResult<Option<Review>> {
        let state = self.read()?;
        let key = (repository.clone(), number, commit_sha.to_owned());
        Ok(state
            .submission_index
            .get(&key)
            .and_then(|id| state.reviews.get(id))
            .cloned())
    }

    async fn list(&self, filter: ReviewFilter) -> ReviewRepositoryResult<Vec<Review>> {
        let state = self.read()?;
        let mut reviews: Vec<Review> = state
            .reviews
            .values()
            .filter(|review| filter.matches(review))
            .cloned()
            .collect();
        reviews.sort_by(|left, right| right.created_at().cmp(&left.created_at()));
        Ok(reviews)
    }

    async fn compare_and_set(
        &self,
        id: ReviewId,
        mutation: ReviewMutation,
    ) -> ReviewRepositoryResult<Review> {
        let mut state = self.write()?;
        let stored = state
            .reviews
            .get_mut(&id)
            .ok_or(ReviewRepositoryError::NotFound(id))?;

        let guard = mutation.guard();
        if !guard.holds(stored) {
            return Err(ReviewRepositoryError::Conflict {
                review_id: id,
                expected: guard,
                actual: guard.observed(stored),
            });
        }

        let mut updated = stored.clone();
        updated.apply(&mutation)?;
        *stored = updated.clone();
        Ok(updated)
    }
}
