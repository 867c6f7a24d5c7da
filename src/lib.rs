//! Review gate: instructor approval for generated pull request reviews.
//!
//! Generated reviews are held until an instructor approves or rejects them.
//! Approved reviews are posted to the code host as a comment and, when
//! requested, the pull request is handed to a merge coordinator. A background
//! poller reconciles outstanding merge requests with the code host.
//!
//! # Architecture
//!
//! The crate follows hexagonal architecture principles:
//!
//! - **Domain**: Review state machine and value types with no I/O
//! - **Ports**: Repository and code host traits
//! - **Adapters**: In-memory and `PostgreSQL` repositories plus a scripted
//!   code host
//! - **Services**: Intake, decisions, merge coordination, reconciliation,
//!   and queries
//!
//! # Modules
//!
//! - [`config`]: Workflow settings loaded from the environment
//! - [`review`]: Review gating, merge coordination, and reconciliation

pub mod config;
pub mod review;
