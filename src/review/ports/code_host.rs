//! Outbound code host port for comments, merges, and merge-state queries.

use crate::review::domain::PullRequestTarget;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Result type for code host operations.
pub type CodeHostResult<T> = Result<T, CodeHostError>;

/// Merge strategy requested from the code host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeMethod {
    /// Merge commit.
    #[default]
    Merge,
    /// Squash and merge.
    Squash,
    /// Rebase and merge.
    Rebase,
}

impl MergeMethod {
    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Squash => "squash",
            Self::Rebase => "rebase",
        }
    }
}

impl fmt::Display for MergeMethod {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Error returned while parsing a merge method.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown merge method: {0}")]
pub struct ParseMergeMethodError(pub String);

impl FromStr for MergeMethod {
    type Err = ParseMergeMethodError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "merge" => Ok(Self::Merge),
            "squash" => Ok(Self::Squash),
            "rebase" => Ok(Self::Rebase),
            _ => Err(ParseMergeMethodError(value.to_owned())),
        }
    }
}

/// Parameters of a merge request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRequest {
    /// Merge strategy.
    pub method: MergeMethod,
    /// Title of the resulting merge commit.
    pub commit_title: String,
}

/// Code host answer to a merge request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeResponse {
    /// The host accepted the merge; completion is confirmed by polling.
    Accepted,
    /// The host refused the merge.
    Rejected {
        /// Reason reported by the host.
        reason: String,
    },
}

/// Merge state of a pull request as the code host reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemotePullRequestState {
    /// Open, merge not yet complete.
    Open,
    /// Merged.
    Merged,
    /// Closed without being merged.
    ClosedUnmerged,
    /// Open but cannot be merged.
    NotMergeable,
}

/// Code host contract used by the decision and merge workflows.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CodeHost: Send + Sync {
    /// Posts a review comment on the pull request.
    async fn post_review_comment(
        &self,
        target: &PullRequestTarget,
        body: &str,
    ) -> CodeHostResult<()>;

    /// Asks the host to merge the pull request.
    async fn request_merge(
        &self,
        target: &PullRequestTarget,
        request: &MergeRequest,
    ) -> CodeHostResult<MergeResponse>;

    /// Reads the current merge state of the pull request.
    async fn pull_request_state(
        &self,
        target: &PullRequestTarget,
    ) -> CodeHostResult<RemotePullRequestState>;
}

/// Errors returned by code host adapters.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodeHostError {
    /// Temporary failure; the call may succeed if retried.
    #[error("transient code host failure: {0}")]
    Transient(String),

    /// The call did not complete within the allowed time.
    #[error("code host call timed out after {0:?}")]
    Timeout(Duration),

    /// Failure that retrying will not fix.
    #[error("code host failure: {0}")]
    Permanent(String),
}

impl CodeHostError {
    /// Returns whether the failed call may be retried.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Timeout(_))
    }
}
