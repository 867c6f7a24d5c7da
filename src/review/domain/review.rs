//! Review aggregate root and the mutations the store may apply to it.

use super::{
    DecisionAction, ExpectationsApplied, FeedbackItem, MergeState, PullRequestMetadata,
    ReviewDomainError, ReviewId, ReviewStatus,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix for merge failure reasons appended to instructor notes.
const MERGE_FAILURE_PREFIX: &str = "Auto-merge failed: ";

/// Review aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    id: ReviewId,
    pull_request: PullRequestMetadata,
    review_summary: String,
    review_feedback: Vec<FeedbackItem>,
    expectations_applied: ExpectationsApplied,
    status: ReviewStatus,
    instructor_notes: Option<String>,
    decision_action: Option<DecisionAction>,
    auto_merge_requested: bool,
    merge_state: MergeState,
    merge_checked_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    decided_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

/// Generated content for a new review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReview {
    /// Pull request under review.
    pub pull_request: PullRequestMetadata,
    /// Free-text summary from the feedback generator.
    pub review_summary: String,
    /// Ordered feedback items.
    pub review_feedback: Vec<FeedbackItem>,
    /// Expectations applied while generating feedback.
    pub expectations_applied: ExpectationsApplied,
}

/// Parameter object for reconstructing a persisted review aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedReviewData {
    /// Persisted review identifier.
    pub id: ReviewId,
    /// Persisted pull request metadata.
    pub pull_request: PullRequestMetadata,
    /// Persisted summary.
    pub review_summary: String,
    /// Persisted feedback items.
    pub review_feedback: Vec<FeedbackItem>,
    /// Persisted expectations.
    pub expectations_applied: ExpectationsApplied,
    /// Persisted status.
    pub status: ReviewStatus,
    /// Persisted instructor notes.
    pub instructor_notes: Option<String>,
    /// Persisted decision action.
    pub decision_action: Option<DecisionAction>,
    /// Persisted auto-merge flag.
    pub auto_merge_requested: bool,
    /// Persisted merge state.
    pub merge_state: MergeState,
    /// Persisted time of the last remote merge check.
    pub merge_checked_at: Option<DateTime<Utc>>,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted decision timestamp.
    pub decided_at: Option<DateTime<Utc>>,
    /// Persisted latest update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Review {
    /// Creates a pending review from generated content.
    #[must_use]
    pub fn new(content: NewReview, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            id: ReviewId::new(),
            pull_request: content.pull_request,
            review_summary: content.review_summary,
            review_feedback: content.review_feedback,
            expectations_applied: content.expectations_applied,
            status: ReviewStatus::Pending,
            instructor_notes: None,
            decision_action: None,
            auto_merge_requested: false,
            merge_state: MergeState::NotRequested,
            merge_checked_at: None,
            created_at: timestamp,
            decided_at: None,
            updated_at: timestamp,
        }
    }

    /// Reconstructs a review from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedReviewData) -> Self {
        Self {
            id: data.id,
            pull_request: data.pull_request,
            review_summary: data.review_summary,
            review_feedback: data.review_feedback,
            expectations_applied: data.expectations_applied,
            status: data.status,
            instructor_notes: data.instructor_notes,
            decision_action: data.decision_action,
            auto_merge_requested: data.auto_merge_requested,
            merge_state: data.merge_state,
            merge_checked_at: data.merge_checked_at,
            created_at: data.created_at,
            decided_at: data.decided_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the review identifier.
    #[must_use]
    pub const fn id(&self) -> ReviewId {
        self.id
    }

    /// Returns the pull request metadata.
    #[must_use]
    pub const fn pull_request(&self) -> &PullRequestMetadata {
        &self.pull_request
    }

    /// Returns the generated summary.
    #[must_use]
    pub fn review_summary(&self) -> &str {
        &self.review_summary
    }

    /// Returns the generated feedback items in order.
    #[must_use]
    pub fn review_feedback(&self) -> &[FeedbackItem] {
        &self.review_feedback
    }

    /// Returns the applied expectations.
    #[must_use]
    pub const fn expectations_applied(&self) -> &ExpectationsApplied {
        &self.expectations_applied
    }

    /// Returns the review status.
    #[must_use]
    pub const fn status(&self) -> ReviewStatus {
        self.status
    }

    /// Returns the instructor notes, if any.
    #[must_use]
    pub fn instructor_notes(&self) -> Option<&str> {
        self.instructor_notes.as_deref()
    }

    /// Returns the recorded decision, if any.
    #[must_use]
    pub const fn decision_action(&self) -> Option<DecisionAction> {
        self.decision_action
    }

    /// Returns whether the instructor asked for an automatic merge.
    #[must_use]
    pub const fn auto_merge_requested(&self) -> bool {
        self.auto_merge_requested
    }

    /// Returns the reconciled merge state.
    #[must_use]
    pub const fn merge_state(&self) -> MergeState {
        self.merge_state
    }

    /// Returns when the remote merge state was last observed.
    #[must_use]
    pub const fn merge_checked_at(&self) -> Option<DateTime<Utc>> {
        self.merge_checked_at
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the decision timestamp, if decided.
    #[must_use]
    pub const fn decided_at(&self) -> Option<DateTime<Utc>> {
        self.decided_at
    }

    /// Returns the latest update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns whether this review is waiting for a merge hand-off.
    #[must_use]
    pub const fn awaits_merge_request(&self) -> bool {
        matches!(self.status, ReviewStatus::Posted)
            && self.auto_merge_requested
            && matches!(self.merge_state, MergeState::NotRequested)
    }

    /// Applies a store mutation.
    ///
    /// Callers are expected to have checked [`ReviewMutation::guard`] first;
    /// the domain rules are enforced here regardless.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewDomainError::AlreadyDecided`] when deciding a
    /// non-pending review, [`ReviewDomainError::MergeNotEligible`] when
    /// requesting a merge the decision did not ask for, and
    /// [`ReviewDomainError::InvalidMergeTransition`] for out-of-order merge
    /// state changes.
    pub fn apply(&mut self, mutation: &ReviewMutation) -> Result<(), ReviewDomainError> {
        match mutation {
            ReviewMutation::Decide(decision) => self.decide(decision)?,
            ReviewMutation::RequestMerge { at } => {
                if !matches!(self.status, ReviewStatus::Posted) || !self.auto_merge_requested {
                    return Err(ReviewDomainError::MergeNotEligible {
                        review_id: self.id,
                        status: self.status,
                    });
                }
                self.transition_merge(MergeState::Requested)?;
                self.updated_at = *at;
            }
            ReviewMutation::ConfirmMerge { at } => {
                self.transition_merge(MergeState::Confirmed)?;
                self.merge_checked_at = Some(*at);
                self.updated_at = *at;
            }
            ReviewMutation::FailMerge { reason, at } => {
                self.transition_merge(MergeState::Failed)?;
                self.append_note(&format!("{MERGE_FAILURE_PREFIX}{}", reason.trim()));
                self.merge_checked_at = Some(*at);
                self.updated_at = *at;
            }
            ReviewMutation::RecordMergeCheck { at } => {
                self.transition_merge(MergeState::Requested)?;
                self.merge_checked_at = Some(*at);
                self.updated_at = *at;
            }
        }
        Ok(())
    }

    fn decide(&mut self, decision: &Decision) -> Result<(), ReviewDomainError> {
        let target = decision.action.target_status();
        if !self.status.can_transition_to(target) {
            return Err(ReviewDomainError::AlreadyDecided {
                review_id: self.id,
                status: self.status,
            });
        }

        self.status = target;
        self.decision_action = Some(decision.action);
        self.instructor_notes = decision.notes.clone();
        self.auto_merge_requested =
            decision.auto_merge && matches!(decision.action, DecisionAction::Approve);
        self.decided_at = Some(decision.decided_at);
        self.updated_at = decision.decided_at;
        Ok(())
    }

    fn transition_merge(&mut self, target: MergeState) -> Result<(), ReviewDomainError> {
        if !self.merge_state.can_transition_to(target) {
            return Err(ReviewDomainError::InvalidMergeTransition {
                review_id: self.id,
                from: self.merge_state,
                to: target,
            });
        }
        self.merge_state = target;
        Ok(())
    }

    fn append_note(&mut self, note: &str) {
        let combined = self.instructor_notes.take().map_or_else(
            || note.to_owned(),
            |existing| format!("{existing}\n\n{note}"),
        );
        self.instructor_notes = Some(combined);
    }
}

/// Instructor decision to record on a pending review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    action: DecisionAction,
    notes: Option<String>,
    auto_merge: bool,
    decided_at: DateTime<Utc>,
}

impl Decision {
    /// Creates a decision stamped with the current clock time.
    ///
    /// Blank notes are dropped.
    #[must_use]
    pub fn new(
        action: DecisionAction,
        notes: Option<String>,
        auto_merge: bool,
        clock: &impl Clock,
    ) -> Self {
        Self {
            action,
            notes: notes
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty()),
            auto_merge,
            decided_at: clock.utc(),
        }
    }

    /// Returns the decided action.
    #[must_use]
    pub const fn action(&self) -> DecisionAction {
        self.action
    }

    /// Returns the normalized notes.
    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// Returns whether an automatic merge was asked for.
    #[must_use]
    pub const fn auto_merge(&self) -> bool {
        self.auto_merge
    }

    /// Returns the decision timestamp.
    #[must_use]
    pub const fn decided_at(&self) -> DateTime<Utc> {
        self.decided_at
    }
}

/// The stored value a mutation expects to find before it applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReviewGuard {
    /// Review status must equal the given value.
    Status(ReviewStatus),
    /// Merge state must equal the given value.
    MergeState(MergeState),
}

impl ReviewGuard {
    /// Returns whether the guard holds for `review`.
    #[must_use]
    pub fn holds(self, review: &Review) -> bool {
        match self {
            Self::Status(expected) => review.status() == expected,
            Self::MergeState(expected) => review.merge_state() == expected,
        }
    }

    /// Returns the guarded field's current value on `review`, for diagnostics.
    #[must_use]
    pub fn observed(self, review: &Review) -> String {
        match self {
            Self::Status(_) => review.status().as_str().to_owned(),
            Self::MergeState(_) => review.merge_state().as_str().to_owned(),
        }
    }
}

impl fmt::Display for ReviewGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(status) => write!(f, "status = {status}"),
            Self::MergeState(state) => write!(f, "merge_state = {state}"),
        }
    }
}

/// A single compare-and-set mutation of a stored review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewMutation {
    /// Record the instructor decision; guarded on `status = pending`.
    Decide(Decision),
    /// Mark a merge as requested; guarded on `merge_state = not_requested`.
    RequestMerge {
        /// Mutation timestamp.
        at: DateTime<Utc>,
    },
    /// Mark a merge as confirmed; guarded on `merge_state = requested`.
    ConfirmMerge {
        /// Mutation timestamp.
        at: DateTime<Utc>,
    },
    /// Mark a merge as failed and append the reason to the notes; guarded on
    /// `merge_state = requested`.
    FailMerge {
        /// Failure reason reported by the code host.
        reason: String,
        /// Mutation timestamp.
        at: DateTime<Utc>,
    },
    /// Record that the remote state was checked without change; guarded on
    /// `merge_state = requested`.
    RecordMergeCheck {
        /// Mutation timestamp.
        at: DateTime<Utc>,
    },
}

impl ReviewMutation {
    /// Returns the guard this mutation is conditioned on.
    #[must_use]
    pub const fn guard(&self) -> ReviewGuard {
        match self {
            Self::Decide(_) => ReviewGuard::Status(ReviewStatus::Pending),
            Self::RequestMerge { .. } => ReviewGuard::MergeState(MergeState::NotRequested),
            Self::ConfirmMerge { .. } | Self::FailMerge { .. } | Self::RecordMergeCheck { .. } => {
                ReviewGuard::MergeState(MergeState::Requested)
            }
        }
    }
}
