//! `PostgreSQL` repository implementation for review storage.

use super::{
    models::{NewReviewRow, ReviewMutationChangeset, ReviewRow},
    schema::reviews,
};
use crate::review::{
    domain::{
        BranchType, DecisionAction, ExpectationsApplied, FeedbackItem, MergeState,
        PersistedReviewData, PullRequestFields, PullRequestMetadata, PullRequestNumber,
        RepositoryFullName, Review, ReviewId, ReviewMutation, ReviewStatus,
    },
    ports::{ReviewFilter, ReviewRepository, ReviewRepositoryError, ReviewRepositoryResult},
};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind, Error as DieselError};

/// `PostgreSQL` connection pool type used by review adapters.
pub type ReviewPgPool = Pool<ConnectionManager<PgConnection>>;

const SUBMISSION_UNIQUE_INDEX: &str = "idx_reviews_submission_unique";

/// `PostgreSQL`-backed review repository.
///
/// Guarded mutations lock the row with `SELECT ... FOR UPDATE` inside a
/// transaction before checking the guard.
#[derive(Debug, Clone)]
pub struct PostgresReviewRepository {
    pool: ReviewPgPool,
}

impl PostgresReviewRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: ReviewPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> ReviewRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> ReviewRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(ReviewRepositoryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(ReviewRepositoryError::persistence)?
    }
}

impl From<DieselError> for ReviewRepositoryError {
    fn from(err: DieselError) -> Self {
        Self::persistence(err)
    }
}

#[async_trait]
impl ReviewRepository for PostgresReviewRepository {
    async fn store(&self, review: &Review) -> ReviewRepositoryResult<()> {
        let review_id = review.id();
        let pull_request = review.pull_request();
        let repository = pull_request.repository().clone();
        let number = pull_request.number();
        let commit_sha = pull_request.commit_sha().to_owned();
        let new_row = to_new_row(review)?;

        self.run_blocking(move |connection| {
            diesel::insert_into(reviews::table)
                .values(&new_row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info)
                        if is_submission_unique_violation(info.as_ref()) =>
                    {
                        ReviewRepositoryError::DuplicateSubmission {
                            repository: repository.clone(),
                            number,
                            commit_sha: commit_sha.clone(),
                        }
                    }
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        ReviewRepositoryError::DuplicateReview(review_id)
                    }
                    _ => ReviewRepositoryError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn find_by_id(&self, id: ReviewId) -> ReviewRepositoryResult<Option<Review>> {
        self.run_blocking(move |connection| {
            let row = reviews::table
                .filter(reviews::id.eq(id.into_inner()))
                .select(ReviewRow::as_select())
                .first::<ReviewRow>(connection)
                .optional()?;
            row.map(row_to_review).transpose()
        })
        .await
    }

    async fn find_by_submission(
        &self,
        repository: &RepositoryFullName,
        number: PullRequestNumber,
        commit_sha: &str,
    ) -> ReviewRepositoryResult<Option<Review>> {
        let repository_name = repository.as_str().to_owned();
        let pr_number = pr_number_to_column(number)?;
        let head_sha = commit_sha.to_owned();
        self.run_blocking(move |connection| {
            let row = reviews::table
                .filter(reviews::repository.eq(repository_name))
                .filter(reviews::pr_number.eq(pr_number))
                .filter(reviews::commit_sha.eq(head_sha))
                .select(ReviewRow::as_select())
                .first::<ReviewRow>(connection)
                .optional()?;
            row.map(row_to_review).transpose()
        })
        .await
    }

    async fn list(&self, filter: ReviewFilter) -> ReviewRepositoryResult<Vec<Review>> {
        self.run_blocking(move |connection| {
            let mut query = reviews::table.into_boxed();
            if let Some(status) = filter.status {
                query = query.filter(reviews::status.eq(status.as_str()));
            }
            if let Some(merge_state) = filter.merge_state {
                query = query.filter(reviews::merge_state.eq(merge_state.as_str()));
            }
            let rows = query
                .order(reviews::created_at.desc())
                .select(ReviewRow::as_select())
                .load::<ReviewRow>(connection)?;
            rows.into_iter().map(row_to_review).collect()
        })
        .await
    }

    async fn compare_and_set(
        &self,
        id: ReviewId,
        mutation: ReviewMutation,
    ) -> ReviewRepositoryResult<Review> {
        self.run_blocking(move |connection| {
            connection.transaction::<_, ReviewRepositoryError, _>(|tx| {
                let row = reviews::table
                    .filter(reviews::id.eq(id.into_inner()))
                    .select(ReviewRow::as_select())
                    .for_update()
                    .first::<ReviewRow>(tx)
                    .optional()?
                    .ok_or(ReviewRepositoryError::NotFound(id))?;
                let mut review = row_to_review(row)?;

                let guard = mutation.guard();
                if !guard.holds(&review) {
                    return Err(ReviewRepositoryError::Conflict {
                        review_id: id,
                        expected: guard,
                        actual: guard.observed(&review),
                    });
                }

                review.apply(&mutation)?;
                diesel::update(reviews::table.filter(reviews::id.eq(id.into_inner())))
                    .set(&to_changeset(&review))
                    .execute(tx)?;
                Ok(review)
            })
        })
        .await
    }
}

fn pr_number_to_column(number: PullRequestNumber) -> ReviewRepositoryResult<i64> {
    i64::try_from(number.value()).map_err(ReviewRepositoryError::persistence)
}

fn to_new_row(review: &Review) -> ReviewRepositoryResult<NewReviewRow> {
    let pull_request = review.pull_request();
    let review_feedback =
        serde_json::to_value(review.review_feedback()).map_err(ReviewRepositoryError::persistence)?;
    let expectations_applied = serde_json::to_value(review.expectations_applied())
        .map_err(ReviewRepositoryError::persistence)?;

    Ok(NewReviewRow {
        id: review.id().into_inner(),
        repository: pull_request.repository().as_str().to_owned(),
        pr_number: pr_number_to_column(pull_request.number())?,
        pr_title: pull_request.title().to_owned(),
        pr_author: pull_request.author().to_owned(),
        pr_url: pull_request.url().to_owned(),
        branch_name: pull_request.branch_name().to_owned(),
        branch_type: pull_request.branch_type().as_str().to_owned(),
        commit_sha: pull_request.commit_sha().to_owned(),
        review_summary: review.review_summary().to_owned(),
        review_feedback,
        expectations_applied,
        status: review.status().as_str().to_owned(),
        instructor_notes: review.instructor_notes().map(str::to_owned),
        decision_action: review.decision_action().map(|action| action.as_str().to_owned()),
        auto_merge_requested: review.auto_merge_requested(),
        merge_state: review.merge_state().as_str().to_owned(),
        merge_checked_at: review.merge_checked_at(),
        created_at: review.created_at(),
        decided_at: review.decided_at(),
        updated_at: review.updated_at(),
    })
}

fn to_changeset(review: &Review) -> ReviewMutationChangeset {
    ReviewMutationChangeset {
        status: review.status().as_str().to_owned(),
        instructor_notes: review.instructor_notes().map(str::to_owned),
        decision_action: review.decision_action().map(|action| action.as_str().to_owned()),
        auto_merge_requested: review.auto_merge_requested(),
        merge_state: review.merge_state().as_str().to_owned(),
        merge_checked_at: review.merge_checked_at(),
        decided_at: review.decided_at(),
        updated_at: review.updated_at(),
    }
}

fn row_to_review(row: ReviewRow) -> ReviewRepositoryResult<Review> {
    let ReviewRow {
        id,
        repository,
        pr_number,
        pr_title,
        pr_author,
        pr_url,
        branch_name,
        branch_type: persisted_branch_type,
        commit_sha,
        review_summary,
        review_feedback: persisted_feedback,
        expectations_applied: persisted_expectations,
        status: persisted_status,
        instructor_notes,
        decision_action: persisted_action,
        auto_merge_requested,
        merge_state: persisted_merge_state,
        merge_checked_at,
        created_at,
        decided_at,
        updated_at,
    } = row;

    let number = u64::try_from(pr_number).map_err(ReviewRepositoryError::persistence)?;
    let branch_type = BranchType::try_from(persisted_branch_type.as_str())
        .map_err(ReviewRepositoryError::persistence)?;
    let pull_request = PullRequestMetadata::from_persisted(
        PullRequestFields {
            repository,
            number,
            title: pr_title,
            author: pr_author,
            url: pr_url,
            branch_name,
            commit_sha,
        },
        branch_type,
    )
    .map_err(ReviewRepositoryError::persistence)?;

    let review_feedback = serde_json::from_value::<Vec<FeedbackItem>>(persisted_feedback)
        .map_err(ReviewRepositoryError::persistence)?;
    let expectations_applied =
        serde_json::from_value::<ExpectationsApplied>(persisted_expectations)
            .map_err(ReviewRepositoryError::persistence)?;
    let status = ReviewStatus::try_from(persisted_status.as_str())
        .map_err(ReviewRepositoryError::persistence)?;
    let decision_action = persisted_action
        .as_deref()
        .map(DecisionAction::try_from)
        .transpose()
        .map_err(ReviewRepositoryError::persistence)?;
    let merge_state = MergeState::try_from(persisted_merge_state.as_str())
        .map_err(ReviewRepositoryError::persistence)?;

    Ok(Review::from_persisted(PersistedReviewData {
        id: ReviewId::from_uuid(id),
        pull_request,
        review_summary,
        review_feedback,
        expectations_applied,
        status,
        instructor_notes,
        decision_action,
        auto_merge_requested,
        merge_state,
        merge_checked_at,
        created_at,
        decided_at,
        updated_at,
    }))
}

fn is_submission_unique_violation(info: &dyn DatabaseErrorInformation) -> bool {
    info.constraint_name()
        .is_some_and(|name| name == SUBMISSION_UNIQUE_INDEX)
}
