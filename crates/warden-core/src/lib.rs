//! # warden-core
//!
//! The contracts between a policy engine and its durable storage.
//!
//! This crate provides:
//! - The two traits (`PolicyModel`, `Adapter`) that define the storage boundary
//! - The policy line format both sides agree on
//!
//! ## Usage
//!
//! ```rust,ignore
//! use warden_core::traits::{Adapter, PolicyModel};
//!
//! adapter.load_policy(&mut model)?;
//! adapter.add_policy("p", "p", &["alice".into(), "data1".into(), "read".into()])?;
//! ```

pub mod line;
pub mod traits;

pub use line::{parse_policy_line, LINE_SEPARATOR};
pub use traits::{Adapter, PolicyModel};

// ── Tests ─────────────────────────────────────────────────────────────────────
