//! # warden-sqlite
//!
//! SQLite storage for policy rules, implementing the
//! [`Adapter`](warden_core::traits::Adapter) contract.
//!
//! ## Overview
//!
//! Rules live in one table of seven string columns (`p_type`, `v0`..`v5`).
//! [`SqliteAdapter`] opens one connection, ensures the table, and serves
//! every operation on that connection until it is closed.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use warden_sqlite::{SqliteAdapter, StoreConfig};
//! use warden_core::traits::Adapter;
//!
//! let adapter = SqliteAdapter::open(&StoreConfig::at("policy.db"))?;
//! adapter.save_policy(&model)?;
//! adapter.load_policy(&mut fresh_model)?;
//! adapter.close()?;
//! ```
//!
//! ## Saving
//!
//! `save_policy` is a full rewrite: drop, recreate and insert run in one
//! IMMEDIATE transaction, so a failed save leaves the previous rules in
//! place and readers never see a half-written table.

pub mod adapter;
pub mod config;
pub mod schema;

pub use adapter::SqliteAdapter;
pub use config::StoreConfig;
pub use schema::DEFAULT_TABLE;

// ── Tests ─────────────────────────────────────────────────────────────────────
