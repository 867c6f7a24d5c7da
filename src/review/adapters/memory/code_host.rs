//! Scripted code host adapter for workflow tests and local runs.

use crate::review::{
    domain::{PullRequestNumber, PullRequestTarget, RepositoryFullName},
    ports::{
        CodeHost, CodeHostError, CodeHostResult, MergeRequest, MergeResponse,
        RemotePullRequestState,
    },
};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock, RwLockWriteGuard};

/// Comment recorded by [`ScriptedCodeHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedComment {
    /// Pull request the comment was posted on.
    pub target: PullRequestTarget,
    /// Comment body.
    pub body: String,
}

/// Merge request recorded by [`ScriptedCodeHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedMergeRequest {
    /// Pull request the merge was requested for.
    pub target: PullRequestTarget,
    /// Request parameters.
    pub request: MergeRequest,
}

/// In-memory code host that replays queued responses.
///
/// Queued comment and merge results are consumed in order; once a queue is
/// empty, comments succeed and merges are accepted. Remote pull request
/// states default to [`RemotePullRequestState::Open`].
#[derive(Debug, Clone, Default)]
pub struct ScriptedCodeHost {
    state: Arc<RwLock<ScriptedHostState>>,
}

type PullRequestKey = (RepositoryFullName, PullRequestNumber);

#[derive(Debug, Default)]
struct ScriptedHostState {
    comment_results: VecDeque<CodeHostResult<()>>,
    merge_results: VecDeque<CodeHostResult<MergeResponse>>,
    remote_states: HashMap<PullRequestKey, CodeHostResult<RemotePullRequestState>>,
    posted_comments: Vec<PostedComment>,
    merge_requests: Vec<RecordedMergeRequest>,
    state_queries: usize,
}

fn key_of(target: &PullRequestTarget) -> PullRequestKey {
    (target.repository.clone(), target.number)
}

impl ScriptedCodeHost {
    /// Creates a host with empty scripts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> CodeHostResult<RwLockWriteGuard<'_, ScriptedHostState>> {
        self.state
            .write()
            .map_err(|err| CodeHostError::Permanent(err.to_string()))
    }

    /// Queues the result of the next comment post.
    ///
    /// # Errors
    ///
    /// Returns [`CodeHostError::Permanent`] when lock acquisition fails.
    pub fn push_comment_result(&self, result: CodeHostResult<()>) -> CodeHostResult<()> {
        self.lock()?.comment_results.push_back(result);
        Ok(())
    }

    /// Queues the result of the next merge request.
    ///
    /// # Errors
    ///
    /// Returns [`CodeHostError::Permanent`] when lock acquisition fails.
    pub fn push_merge_result(&self, result: CodeHostResult<MergeResponse>) -> CodeHostResult<()> {
        self.lock()?.merge_results.push_back(result);
        Ok(())
    }

    /// Sets the state reported for a pull request until changed.
    ///
    /// # Errors
    ///
    /// Returns [`CodeHostError::Permanent`] when lock acquisition fails.
    pub fn set_remote_state(
        &self,
        target: &PullRequestTarget,
        remote_state: RemotePullRequestState,
    ) -> CodeHostResult<()> {
        self.lock()?
            .remote_states
            .insert(key_of(target), Ok(remote_state));
        Ok(())
    }

    /// Makes state queries for a pull request fail until changed.
    ///
    /// # Errors
    ///
    /// Returns [`CodeHostError::Permanent`] when lock acquisition fails.
    pub fn fail_remote_state(
        &self,
        target: &PullRequestTarget,
        error: CodeHostError,
    ) -> CodeHostResult<()> {
        self.lock()?.remote_states.insert(key_of(target), Err(error));
        Ok(())
    }

    /// Returns comments posted so far.
    ///
    /// # Errors
    ///
    /// Returns [`CodeHostError::Permanent`] when lock acquisition fails.
    pub fn posted_comments(&self) -> CodeHostResult<Vec<PostedComment>> {
        Ok(self.lock()?.posted_comments.clone())
    }

    /// Returns merge requests received so far, including failed attempts.
    ///
    /// # Errors
    ///
    /// Returns [`CodeHostError::Permanent`] when lock acquisition fails.
    pub fn merge_requests(&self) -> CodeHostResult<Vec<RecordedMergeRequest>> {
        Ok(self.lock()?.merge_requests.clone())
    }

    /// Returns how many state queries were answered.
    ///
    /// # Errors
    ///
    /// Returns [`CodeHostError::Permanent`] when lock acquisition fails.
    pub fn state_query_count(&self) -> CodeHostResult<usize> {
        Ok(self.lock()?.state_queries)
    }
}

#[async_trait]
impl CodeHost for ScriptedCodeHost {
    async fn post_review_comment(
        &self,
        target: &PullRequestTarget,
        body: &str,
    ) -> CodeHostResult<()> {
        let mut state = self.lock()?;
        let result = state.comment_results.pop_front().unwrap_or(Ok(()));
        if result.is_ok() {
            state.posted_comments.push(PostedComment {
                target: target.clone(),
                body: body.to_owned(),
            });
        }
        result
    }

    async fn request_merge(
        &self,
        target: &PullRequestTarget,
        request: &MergeRequest,
    ) -> CodeHostResult<MergeResponse> {
        let mut state = self.lock()?;
        state.merge_requests.push(RecordedMergeRequest {
            target: target.clone(),
            request: request.clone(),
        });
        state
            .merge_results
            .pop_front()
            .unwrap_or(Ok(MergeResponse::Accepted))
    }

    async fn pull_request_state(
        &self,
        target: &PullRequestTarget,
    ) -> CodeHostResult<RemotePullRequestState> {
        let mut state = self.lock()?;
        state.state_queries += 1;
        state
            .remote_states
            .get(&key_of(target))
            .cloned()
            .unwrap_or(Ok(RemotePullRequestState::Open))
    }
}
