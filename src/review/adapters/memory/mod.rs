//! In-memory adapters for review persistence and the code host.

mod code_host;
mod review;

pub use code_host::{PostedComment, RecordedMergeRequest, ScriptedCodeHost};
pub use review::InMemoryReviewRepository;
