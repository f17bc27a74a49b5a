//! # warden-model
//!
//! A reference, in-memory implementation of the
//! [`PolicyModel`](warden_core::traits::PolicyModel) contract.
//!
//! Policy engines bring their own model; this one backs the `warden` CLI
//! and the storage tests, and shows the minimum a model must provide.

pub mod memory;

pub use memory::MemoryModel;

// ── Tests ─────────────────────────────────────────────────────────────────────
