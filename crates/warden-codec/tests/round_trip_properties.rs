//! Property tests for the rule ⇄ row ⇄ line mapping.
//!
//! For every rule with at most six non-empty fields, whatever characters
//! they hold:
//! 1. encode → decode → line loader reproduces the rule exactly.
//! 2. encode → decode_rule reproduces the rule exactly.
//! 3. more than six fields never encodes.

use proptest::prelude::*;

use warden_codec::{decode, decode_rule, encode};
use warden_contracts::rule::{PolicyRule, MAX_FIELDS};
use warden_core::parse_policy_line;

// =============================================================================
// Strategy helpers
// =============================================================================

/// Any non-empty field value: plain identifiers, plus text with commas,
/// quotes, `#` and edge whitespace that the line format has to quote.
fn field_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9_:/.*-]{1,24}",
        "[ ,\"#a-z]{1,12}",
        "\\PC{1,24}",
    ]
}

fn ptype_strategy() -> impl Strategy<Value = String> {
    "[pg][0-9]?"
}

fn rule_strategy(max_fields: usize) -> impl Strategy<Value = PolicyRule> {
    (
        ptype_strategy(),
        prop::collection::vec(field_strategy(), 0..=max_fields),
    )
        .prop_map(|(ptype, fields)| PolicyRule { ptype, fields })
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn line_round_trip_reconstructs_rule(rule in rule_strategy(MAX_FIELDS)) {
        let row = encode(&rule.ptype, &rule.fields).unwrap();
        let line = decode(&row);
        let parsed = parse_policy_line(&line).unwrap().unwrap();
        prop_assert_eq!(parsed, rule);
    }

    #[test]
    fn structured_round_trip_reconstructs_rule(rule in rule_strategy(MAX_FIELDS)) {
        let row = encode(&rule.ptype, &rule.fields).unwrap();
        prop_assert_eq!(decode_rule(&row), rule);
    }

    #[test]
    fn over_capacity_never_encodes(
        ptype in ptype_strategy(),
        fields in prop::collection::vec(field_strategy(), (MAX_FIELDS + 1)..12),
    ) {
        prop_assert!(encode(&ptype, &fields).is_err());
    }
}
