//! Review status, decision action, and merge state enumerations.

use super::{ParseDecisionActionError, ParseMergeStateError, ParseReviewStatusError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Review lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    /// Review awaits an instructor decision.
    Pending,
    /// Review was approved and posted to the code host.
    Posted,
    /// Review was rejected by the instructor.
    Rejected,
}

impl ReviewStatus {
    /// All statuses in canonical order.
    pub const ALL: [Self; 3] = [Self::Pending, Self::Posted, Self::Rejected];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Posted => "posted",
            Self::Rejected => "rejected",
        }
    }

    /// Returns whether transition to `target` is allowed.
    ///
    /// Status only moves forward out of `pending`.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::Posted | Self::Rejected)
        )
    }

    /// Returns whether a decision has been recorded.
    #[must_use]
    pub const fn is_decided(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ReviewStatus {
    type Error = ParseReviewStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "pending" => Ok(Self::Pending),
            "posted" => Ok(Self::Posted),
            "rejected" => Ok(Self::Rejected),
            _ => Err(ParseReviewStatusError(value.to_owned())),
        }
    }
}

/// Instructor decision on a pending review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionAction {
    /// Post the review to the code host.
    Approve,
    /// Discard the review.
    Reject,
}

impl DecisionAction {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }

    /// Returns the status a pending review moves to under this action.
    #[must_use]
    pub const fn target_status(self) -> ReviewStatus {
        match self {
            Self::Approve => ReviewStatus::Posted,
            Self::Reject => ReviewStatus::Rejected,
        }
    }
}

impl fmt::Display for DecisionAction {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for DecisionAction {
    type Error = ParseDecisionActionError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            _ => Err(ParseDecisionActionError(value.to_owned())),
        }
    }
}

/// Reconciled merge state of the pull request behind a posted review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeState {
    /// No merge has been requested.
    NotRequested,
    /// A merge was requested and is awaiting confirmation.
    Requested,
    /// The code host reports the pull request as merged.
    Confirmed,
    /// The merge was rejected or the pull request closed unmerged.
    Failed,
}

impl MergeState {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotRequested => "not_requested",
            Self::Requested => "requested",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
        }
    }

    /// Returns whether no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Confirmed | Self::Failed)
    }

    /// Returns whether transition to `target` is allowed.
    ///
    /// `requested -> requested` is permitted so the poller can record a check
    /// that observed no change.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::NotRequested, Self::Requested)
                | (
                    Self::Requested,
                    Self::Requested | Self::Confirmed | Self::Failed
                )
        )
    }
}

impl fmt::Display for MergeState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for MergeState {
    type Error = ParseMergeStateError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "not_requested" => Ok(Self::NotRequested),
            "requested" => Ok(Self::Requested),
            "confirmed" => Ok(Self::Confirmed),
            "failed" => Ok(Self::Failed),
            _ => Err(ParseMergeStateError(value.to_owned())),
        }
    }
}
