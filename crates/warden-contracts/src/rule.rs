//! Policy rule types and storage limits.
//!
//! A `PolicyRule` is the in-memory form of one rule tuple: a policy type tag
//! plus an ordered list of string fields whose meaning belongs to the policy
//! engine. The storage limits here describe the fixed relational row every
//! rule is flattened into.

use std::{borrow::Cow, fmt};

use serde::{Deserialize, Serialize};

/// Number of positional value columns (`v0`..`v5`) in a stored row.
pub const MAX_FIELDS: usize = 6;

/// Maximum length, in characters, of the `p_type` column.
pub const MAX_PTYPE_LEN: usize = 10;

/// Maximum length, in characters, of each value column.
pub const MAX_VALUE_LEN: usize = 256;

/// Section holding permission rules.
pub const SECTION_POLICY: &str = "p";

/// Section holding grouping (role) rules.
pub const SECTION_GROUPING: &str = "g";

/// Sections persisted by a full save, in write order.
pub const PERSISTED_SECTIONS: [&str; 2] = [SECTION_POLICY, SECTION_GROUPING];

/// Separator written between tokens of a policy line.
pub const LINE_SEPARATOR: &str = ", ";

/// One rule tuple tagged with its policy type.
///
/// Field order is significant. Trailing fields that are absent are simply
/// not present in `fields`; they are never represented as empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PolicyRule {
    /// The policy type tag, e.g. `"p"`, `"g"`, `"g2"`.
    pub ptype: String,
    /// Ordered rule fields (subject, object, action, ...).
    pub fields: Vec<String>,
}

impl PolicyRule {
    /// Construct a rule from a type tag and any iterable of string-like fields.
    pub fn new<I, S>(ptype: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ptype: ptype.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// The section this rule belongs to: the first character of its type tag.
    ///
    /// Returns an empty string for a rule with an empty type.
    pub fn section(&self) -> &str {
        section_of(&self.ptype)
    }
}

impl fmt::Display for PolicyRule {
    /// Renders the rule as a comma-joined policy line (`p, alice, data1, read`).
    ///
    /// Tokens that would not survive the line format are quoted, see
    /// [`quote_token`].
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&quote_token(&self.ptype))?;
        for field in &self.fields {
            f.write_str(LINE_SEPARATOR)?;
            f.write_str(&quote_token(field))?;
        }
        Ok(())
    }
}

/// Render one token of a policy line.
///
/// Tokens containing `,` or `"`, starting with `#`, or carrying leading or
/// trailing whitespace are wrapped in double quotes with inner quotes
/// doubled (`a,b` → `"a,b"`, `say "hi"` → `"say ""hi"""`). Everything else
/// is written as-is.
pub fn quote_token(token: &str) -> Cow<'_, str> {
    let needs_quotes = token.contains([',', '"'])
        || token.starts_with('#')
        || token.trim() != token;
    if needs_quotes {
        Cow::Owned(format!("\"{}\"", token.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(token)
    }
}

/// Return the section a policy type belongs to (`"p2"` → `"p"`).
pub fn section_of(ptype: &str) -> &str {
    match ptype.char_indices().nth(1) {
        Some((idx, _)) => &ptype[..idx],
        None => ptype,
    }
}
