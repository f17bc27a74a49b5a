//! Core trait definitions for the warden storage pipeline.
//!
//! - `PolicyModel` — the policy engine's in-memory model, owned by the caller.
//!   The adapter only iterates it on save and appends lines to it on load.
//! - `Adapter`     — the storage contract the policy engine drives to keep
//!   durable storage in sync with in-memory changes.

use warden_contracts::{
    error::AdapterResult,
    rule::{section_of, PolicyRule},
};

use crate::line::parse_policy_line;

/// The minimal view of a policy model the adapter needs.
///
/// Models map a section (`"p"`, `"g"`) to policy types, and each policy type
/// to an ordered collection of rules. Implementations own rule semantics;
/// the adapter never interprets fields.
pub trait PolicyModel {
    /// Policy types present in `sec`, in the model's iteration order.
    fn policy_types(&self, sec: &str) -> Vec<String>;

    /// Rules stored under `sec` / `ptype`, in the model's iteration order.
    fn policies(&self, sec: &str, ptype: &str) -> Vec<Vec<String>>;

    /// Append one rule to the model.
    fn add_policy(&mut self, sec: &str, ptype: &str, rule: Vec<String>);

    /// Parse a comma-joined policy line and append the rule it describes.
    ///
    /// The section is the first character of the line's policy type. Blank
    /// and comment lines are ignored.
    fn load_policy_line(&mut self, line: &str) -> AdapterResult<()> {
        if let Some(PolicyRule { ptype, fields }) = parse_policy_line(line)? {
            let sec = section_of(&ptype).to_string();
            self.add_policy(&sec, &ptype, fields);
        }
        Ok(())
    }
}

/// Durable storage for a policy model.
///
/// Every method is synchronous and performs its database work before
/// returning. Implementations are expected to be shareable across threads;
/// concurrent calls serialize on the underlying connection.
pub trait Adapter: Send + Sync {
    /// Append every stored rule to `model` through its line-loading contract.
    fn load_policy(&self, model: &mut dyn PolicyModel) -> AdapterResult<()>;

    /// Replace all stored rules with the `"p"` and `"g"` sections of `model`.
    ///
    /// The replacement is all-or-nothing.
    fn save_policy(&self, model: &dyn PolicyModel) -> AdapterResult<()>;

    /// Store one rule. Duplicates are not rejected.
    fn add_policy(&self, sec: &str, ptype: &str, rule: &[String]) -> AdapterResult<()>;

    /// Delete every stored row equal to this rule. Deleting an absent rule
    /// succeeds.
    fn remove_policy(&self, sec: &str, ptype: &str, rule: &[String]) -> AdapterResult<()>;

    /// Delete every rule of `ptype` whose fields starting at `field_index`
    /// match `field_values`. Empty values and columns outside the given
    /// range are not constrained.
    fn remove_filtered_policy(
        &self,
        sec: &str,
        ptype: &str,
        field_index: usize,
        field_values: &[String],
    ) -> AdapterResult<()>;

    /// Store several rules of one policy type.
    ///
    /// The default implementation stores them one at a time and is therefore
    /// not atomic; storage backends with transactions should override it.
    fn add_policies(&self, sec: &str, ptype: &str, rules: &[Vec<String>]) -> AdapterResult<()> {
        for rule in rules {
            self.add_policy(sec, ptype, rule)?;
        }
        Ok(())
    }

    /// Delete several rules of one policy type.
    ///
    /// Same atomicity caveat as `add_policies`.
    fn remove_policies(&self, sec: &str, ptype: &str, rules: &[Vec<String>]) -> AdapterResult<()> {
        for rule in rules {
            self.remove_policy(sec, ptype, rule)?;
        }
        Ok(())
    }
}
