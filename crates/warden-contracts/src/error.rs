//! Error types for the warden storage pipeline.
//!
//! All fallible operations return `AdapterResult<T>`. Variants carry enough
//! context for the host process to decide whether to abort or retry.

use thiserror::Error;

/// The unified error type for rule encoding, model loading and storage.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The database could not be opened or closed.
    #[error("database connection error: {reason}")]
    Connection { reason: String },

    /// Creating or dropping the policy table failed.
    ///
    /// Returned instead of aborting; the caller decides whether the process
    /// can continue without a usable table.
    #[error("schema error: {reason}")]
    Schema { reason: String },

    /// A select, insert, delete or transaction statement failed.
    #[error("{operation} failed: {reason}")]
    Query { operation: String, reason: String },

    /// The rule does not fit the fixed seven-column row.
    #[error("rule exceeds storage capacity: {reason}")]
    Capacity { reason: String },

    /// A filtered removal addressed columns outside v0..v5.
    #[error("invalid field filter: {reason}")]
    InvalidFilter { reason: String },

    /// The rule itself is malformed (e.g. an empty policy type).
    #[error("invalid rule: {reason}")]
    InvalidRule { reason: String },

    /// A policy text line could not be loaded into the model.
    #[error("invalid policy line: '{line}'")]
    InvalidLine { line: String },

    /// The operation hit its deadline or was cancelled through an interrupt handle.
    #[error("{operation} interrupted before completion")]
    Interrupted { operation: String },

    /// A configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    Config { reason: String },
}

/// Convenience alias used throughout the warden crates.
pub type AdapterResult<T> = Result<T, AdapterError>;
