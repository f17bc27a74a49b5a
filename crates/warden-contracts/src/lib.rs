//! # warden-contracts
//!
//! Shared rule types, storage limits and error contracts for the warden
//! policy storage adapter.
//!
//! All crates in the workspace import from here. No storage logic lives in
//! this crate, only data definitions and error types.

pub mod error;
pub mod rule;
