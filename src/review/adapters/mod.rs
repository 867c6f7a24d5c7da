//! Adapter implementations for review persistence and the code host.

pub mod memory;
pub mod postgres;
