//! The policy line format shared by storage and policy models.
//!
//! A policy line is the comma-joined text form of one rule:
//!
//! ```text
//! p, alice, data1, read
//! g, alice, admin
//! p, bob, "data1,data2", "say ""hi"""
//! ```
//!
//! The first token is the policy type; the remaining tokens are the rule
//! fields in order. Blank lines and lines starting with `#` carry no rule.
//! A token wrapped in double quotes is taken verbatim, with `""` standing
//! for one `"`; this is how fields holding commas or surrounding whitespace
//! are carried (see [`quote_token`](warden_contracts::rule::quote_token)).

use std::{iter::Peekable, str::Chars};

use warden_contracts::{
    error::{AdapterError, AdapterResult},
    rule::PolicyRule,
};

pub use warden_contracts::rule::LINE_SEPARATOR;

/// Parse one policy line into a rule.
///
/// Returns `Ok(None)` for blank and comment lines. Unquoted tokens are split
/// on `,` and trimmed, so both `p,alice` and `p, alice` parse the same way.
///
/// Returns `AdapterError::InvalidLine` when the policy type token is empty,
/// a quoted token is never closed, or text follows a closing quote.
pub fn parse_policy_line(line: &str) -> AdapterResult<Option<PolicyRule>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let invalid = || AdapterError::InvalidLine {
        line: line.to_string(),
    };
    let mut tokens = split_tokens(trimmed).ok_or_else(invalid)?.into_iter();
    match tokens.next() {
        Some(ptype) if !ptype.is_empty() => Ok(Some(PolicyRule::new(ptype, tokens))),
        _ => Err(invalid()),
    }
}

/// Split a line into unquoted tokens. `None` on malformed quoting.
fn split_tokens(line: &str) -> Option<Vec<String>> {
    let mut chars = line.chars().peekable();
    let mut tokens = Vec::new();
    loop {
        skip_whitespace(&mut chars);
        if chars.next_if_eq(&'"').is_some() {
            tokens.push(quoted_token(&mut chars)?);
            skip_whitespace(&mut chars);
            match chars.next() {
                None => return Some(tokens),
                Some(',') => continue,
                Some(_) => return None,
            }
        }

        let mut token = String::new();
        loop {
            match chars.next() {
                None => {
                    tokens.push(token.trim_end().to_string());
                    return Some(tokens);
                }
                Some(',') => break,
                Some(c) => token.push(c),
            }
        }
        tokens.push(token.trim_end().to_string());
    }
}

/// Read a quoted token after its opening quote, consuming the closing one.
fn quoted_token(chars: &mut Peekable<Chars<'_>>) -> Option<String> {
    let mut token = String::new();
    loop {
        match chars.next()? {
            '"' if chars.next_if_eq(&'"').is_some() => token.push('"'),
            '"' => return Some(token),
            c => token.push(c),
        }
    }
}

fn skip_whitespace(chars: &mut Peekable<Chars<'_>>) {
    while chars.next_if(|c| c.is_whitespace()).is_some() {}
}
