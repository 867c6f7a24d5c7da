//! Diesel row models for review persistence.

use super::schema::reviews;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Query result row for review records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = reviews)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ReviewRow {
    /// Review identifier.
    pub id: uuid::Uuid,
    /// Repository in `owner/repo` form.
    pub repository: String,
    /// Pull request number.
    pub pr_number: i64,
    /// Pull request title.
    pub pr_title: String,
    /// Pull request author.
    pub pr_author: String,
    /// Pull request URL.
    pub pr_url: String,
    /// Head branch name.
    pub branch_name: String,
    /// Derived branch type.
    pub branch_type: String,
    /// Reviewed commit SHA.
    pub commit_sha: String,
    /// Generated summary.
    pub review_summary: String,
    /// Feedback items JSON array.
    pub review_feedback: Value,
    /// Expectations JSON object.
    pub expectations_applied: Value,
    /// Review status.
    pub status: String,
    /// Instructor notes.
    pub instructor_notes: Option<String>,
    /// Decision action.
    pub decision_action: Option<String>,
    /// Auto-merge flag.
    pub auto_merge_requested: bool,
    /// Merge state.
    pub merge_state: String,
    /// Last remote merge check.
    pub merge_checked_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Decision timestamp.
    pub decided_at: Option<DateTime<Utc>>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Insert model for review records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = reviews)]
pub struct NewReviewRow {
    /// Review identifier.
    pub id: uuid::Uuid,
    /// Repository in `owner/repo` form.
    pub repository: String,
    /// Pull request number.
    pub pr_number: i64,
    /// Pull request title.
    pub pr_title: String,
    /// Pull request author.
    pub pr_author: String,
    /// Pull request URL.
    pub pr_url: String,
    /// Head branch name.
    pub branch_name: String,
    /// Derived branch type.
    pub branch_type: String,
    /// Reviewed commit SHA.
    pub commit_sha: String,
    /// Generated summary.
    pub review_summary: String,
    /// Feedback items JSON array.
    pub review_feedback: Value,
    /// Expectations JSON object.
    pub expectations_applied: Value,
    /// Review status.
    pub status: String,
    /// Instructor notes.
    pub instructor_notes: Option<String>,
    /// Decision action.
    pub decision_action: Option<String>,
    /// Auto-merge flag.
    pub auto_merge_requested: bool,
    /// Merge state.
    pub merge_state: String,
    /// Last remote merge check.
    pub merge_checked_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Decision timestamp.
    pub decided_at: Option<DateTime<Utc>>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Changeset for the columns a guarded mutation may write.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = reviews)]
#[diesel(treat_none_as_null = true)]
pub struct ReviewMutationChangeset {
    /// Review status.
    pub status: String,
    /// Instructor notes.
    pub instructor_notes: Option<String>,
    /// Decision action.
    pub decision_action: Option<String>,
    /// Auto-merge flag.
    pub auto_merge_requested: bool,
    /// Merge state.
    pub merge_state: String,
    /// Last remote merge check.
    pub merge_checked_at: Option<DateTime<Utc>>,
    /// Decision timestamp.
    pub decided_at: Option<DateTime<Utc>>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}
