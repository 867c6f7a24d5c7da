//! Error types for review domain validation, parsing, and transitions.

use super::{MergeState, ReviewId, ReviewStatus};
use thiserror::Error;

/// Errors returned while constructing or mutating review domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReviewDomainError {
    /// The repository name does not follow `owner/repo` format.
    #[error("invalid repository name '{0}', expected owner/repo")]
    InvalidRepository(String),

    /// The pull request number is invalid.
    #[error("invalid pull request number {0}, expected a positive integer")]
    InvalidPullRequestNumber(u64),

    /// A required metadata field is empty after trimming.
    #[error("pull request {0} must not be empty")]
    EmptyField(&'static str),

    /// The pull request URL is not an `http(s)` URL.
    #[error("pull request URL '{0}' must start with 'http://' or 'https://'")]
    InvalidPullRequestUrl(String),

    /// A decision was attempted on a review that is no longer pending.
    #[error("review {review_id} already decided (current status: {status})")]
    AlreadyDecided {
        /// Review identifier.
        review_id: ReviewId,
        /// Current review status.
        status: ReviewStatus,
    },

    /// A merge was requested for a review that does not allow one.
    #[error("review {review_id} is not eligible for auto-merge (status: {status})")]
    MergeNotEligible {
        /// Review identifier.
        review_id: ReviewId,
        /// Current review status.
        status: ReviewStatus,
    },

    /// The merge state cannot move between the two given states.
    #[error("invalid merge state transition for review {review_id}: {from} -> {to}")]
    InvalidMergeTransition {
        /// Review identifier.
        review_id: ReviewId,
        /// Current merge state.
        from: MergeState,
        /// Requested merge state.
        to: MergeState,
    },
}

/// Error returned while parsing a review status.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown review status: {0}")]
pub struct ParseReviewStatusError(pub String);

/// Error returned while parsing a merge state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown merge state: {0}")]
pub struct ParseMergeStateError(pub String);

/// Error returned while parsing a decision action.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown decision action: {0}")]
pub struct ParseDecisionActionError(pub String);

/// Error returned while parsing a feedback severity.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown feedback severity: {0}")]
pub struct ParseSeverityError(pub String);

/// Error returned while parsing a branch type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown branch type: {0}")]
pub struct ParseBranchTypeError(pub String);
