//! In-memory policy model.
//!
//! `MemoryModel` stores rules as section → policy type → ordered rules,
//! backed by `BTreeMap`s so iteration (and therefore save order and text
//! export) is deterministic. Duplicate rules are kept; deduplication is a
//! policy-engine concern.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use warden_contracts::{error::AdapterResult, rule::PolicyRule};
use warden_core::traits::PolicyModel;

type TypeMap = BTreeMap<String, Vec<Vec<String>>>;

/// A `PolicyModel` held entirely in memory.
///
/// ```rust,ignore
/// use warden_model::MemoryModel;
///
/// let model = MemoryModel::from_policy_text("p, alice, data1, read\ng, alice, admin")?;
/// adapter.save_policy(&model)?;
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryModel {
    sections: BTreeMap<String, TypeMap>,
}

impl MemoryModel {
    /// Create an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a model from policy text, one comma-joined rule per line.
    ///
    /// Blank lines and `#` comments are ignored. Returns
    /// `AdapterError::InvalidLine` for the first line that cannot be parsed.
    pub fn from_policy_text(text: &str) -> AdapterResult<Self> {
        let mut model = Self::new();
        for line in text.lines() {
            model.load_policy_line(line)?;
        }
        debug!(rules = model.len(), "policy text loaded");
        Ok(model)
    }

    /// Render every rule as a policy line, sections and types in key order.
    pub fn to_policy_text(&self) -> String {
        let mut out = String::new();
        for rule in self.iter() {
            out.push_str(&rule.to_string());
            out.push('\n');
        }
        out
    }

    /// Rules under `sec` / `ptype`, or an empty slice.
    pub fn rules(&self, sec: &str, ptype: &str) -> &[Vec<String>] {
        self.sections
            .get(sec)
            .and_then(|types| types.get(ptype))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Iterate every rule in the model.
    pub fn iter(&self) -> impl Iterator<Item = PolicyRule> + '_ {
        self.sections.values().flat_map(|types| {
            types.iter().flat_map(|(ptype, rules)| {
                rules
                    .iter()
                    .map(move |fields| PolicyRule::new(ptype.clone(), fields.clone()))
            })
        })
    }

    /// Total number of rules across all sections.
    pub fn len(&self) -> usize {
        self.sections
            .values()
            .flat_map(|types| types.values())
            .map(Vec::len)
            .sum()
    }

    /// True when the model holds no rules.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every rule.
    pub fn clear(&mut self) {
        self.sections.clear();
    }
}

impl PolicyModel for MemoryModel {
    fn policy_types(&self, sec: &str) -> Vec<String> {
        self.sections
            .get(sec)
            .map(|types| types.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn policies(&self, sec: &str, ptype: &str) -> Vec<Vec<String>> {
        self.rules(sec, ptype).to_vec()
    }

    fn add_policy(&mut self, sec: &str, ptype: &str, rule: Vec<String>) {
        self.sections
            .entry(sec.to_string())
            .or_default()
            .entry(ptype.to_string())
            .or_default()
            .push(rule);
    }
}
