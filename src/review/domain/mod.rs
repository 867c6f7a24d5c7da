//! Domain model for instructor-gated pull request reviews.
//!
//! A review carries generated feedback for one pull request commit, an
//! instructor decision, and the reconciled merge state of the pull request.
//! All mutations are expressed as [`ReviewMutation`] values so the store can
//! apply them under a compare-and-set guard.

mod error;
mod feedback;
mod ids;
mod metadata;
mod review;
mod status;

pub use error::{
    ParseBranchTypeError, ParseDecisionActionError, ParseMergeStateError, ParseReviewStatusError,
    ParseSeverityError, ReviewDomainError,
};
pub use feedback::{ExpectationsApplied, FeedbackItem, Severity};
pub use ids::{PullRequestNumber, RepositoryFullName, ReviewId};
pub use metadata::{BranchType, PullRequestFields, PullRequestMetadata, PullRequestTarget};
pub use review::{Decision, NewReview, PersistedReviewData, Review, ReviewGuard, ReviewMutation};
pub use status::{DecisionAction, MergeState, ReviewStatus};
