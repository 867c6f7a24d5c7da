//! Port contracts for review persistence and the code host.

mod code_host;
mod repository;

#[cfg(test)]
pub use code_host::MockCodeHost;
pub use code_host::{
    CodeHost, CodeHostError, CodeHostResult, MergeMethod, MergeRequest, MergeResponse,
    ParseMergeMethodError, RemotePullRequestState,
};
pub use repository::{ReviewFilter, ReviewRepository, ReviewRepositoryError, ReviewRepositoryResult};
