//! Instructor-gated review decisions with merge reconciliation.
//!
//! Generated pull request reviews wait in `pending` until an instructor
//! approves or rejects them. Approval posts the review comment and may hand
//! the pull request to the merge coordinator; a poller later reconciles the
//! stored merge state with the code host. The module follows hexagonal
//! architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
