//! Application services for review decisions, merges, and queries.

mod comment;
mod decision;
mod intake;
mod merge;
mod query;
mod reconciliation;
mod retry;

pub use comment::{CommentRenderError, render_review_comment};
pub use decision::{
    DecideReviewRequest, DecisionError, DecisionOutcome, DecisionResult, DecisionWarning,
    MergeHandoff, ReviewDecisionService,
};
pub use intake::{ReviewIntakeError, ReviewIntakeService, SubmitReviewRequest};
pub use merge::{
    MergeCoordinator, MergeCoordinatorError, MergeCoordinatorResult, MergeRequestOutcome,
};
pub use query::{
    MergeStatusView, ReviewQueryError, ReviewQueryResult, ReviewQueryService, ReviewStats,
};
pub use reconciliation::{ReconciliationError, ReconciliationPoller, SweepReport};
pub use retry::{RetryOutcome, RetryPolicy, retry_with_backoff};
