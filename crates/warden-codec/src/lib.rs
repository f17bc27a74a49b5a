//! # warden-codec
//!
//! Pure, stateless mapping between policy rules and the fixed seven-column
//! row they are stored as, and between rows and policy lines.
//!
//! ## Overview
//!
//! ```text
//! PolicyRule ("p", [alice, data1, read])
//!     │ encode
//!     ▼
//! PolicyRow  p_type=p v0=alice v1=data1 v2=read v3="" v4="" v5=""
//!     │ decode
//!     ▼
//! "p, alice, data1, read"  ──► PolicyModel::load_policy_line
//! ```
//!
//! The codec knows nothing about databases. A backend with native
//! variable-length columns can store `PolicyRule` directly and skip it.

pub mod filter;
pub mod row;

pub use filter::{encode_filter, RowFilter};
pub use row::{decode, decode_rule, encode, encode_rule, PolicyRow, PTYPE_COLUMN, VALUE_COLUMNS};

// ── Tests ─────────────────────────────────────────────────────────────────────
