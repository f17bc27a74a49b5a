//! Rule ⇄ row encoding.
//!
//! Every rule is stored as one row of seven string columns: `p_type` plus the
//! positional value columns `v0`..`v5`. An empty column means "field absent",
//! so decoding drops empty columns. A genuine empty-string field therefore
//! cannot be told apart from a missing one; that ambiguity belongs to the
//! schema and is kept as-is.

use warden_contracts::{
    error::{AdapterError, AdapterResult},
    rule::{quote_token, PolicyRule, LINE_SEPARATOR, MAX_FIELDS, MAX_PTYPE_LEN, MAX_VALUE_LEN},
};

/// Name of the policy type column.
pub const PTYPE_COLUMN: &str = "p_type";

/// Names of the positional value columns, in slot order.
pub const VALUE_COLUMNS: [&str; MAX_FIELDS] = ["v0", "v1", "v2", "v3", "v4", "v5"];

/// One stored row: the policy type and six value slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyRow {
    pub ptype: String,
    pub values: [String; MAX_FIELDS],
}

impl PolicyRow {
    /// Build a row from raw column values. `None` (SQL NULL) reads as absent.
    pub fn from_columns(ptype: Option<String>, values: [Option<String>; MAX_FIELDS]) -> Self {
        Self {
            ptype: ptype.unwrap_or_default(),
            values: values.map(Option::unwrap_or_default),
        }
    }

    /// Non-empty value columns in slot order.
    pub fn present_values(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(String::as_str).filter(|v| !v.is_empty())
    }
}

/// Encode a rule into a row.
///
/// Fields fill `v0`, `v1`, ... in order; the remaining slots are left empty.
///
/// # Errors
///
/// - `InvalidRule` when `ptype` is empty.
/// - `Capacity` when there are more than six fields, or when `ptype` or any
///   field is longer than its column allows. Nothing is ever truncated.
pub fn encode<S: AsRef<str>>(ptype: &str, fields: &[S]) -> AdapterResult<PolicyRow> {
    check_ptype(ptype)?;

    if fields.len() > MAX_FIELDS {
        return Err(AdapterError::Capacity {
            reason: format!(
                "rule '{}' has {} fields, at most {} can be stored",
                ptype,
                fields.len(),
                MAX_FIELDS
            ),
        });
    }

    let mut row = PolicyRow {
        ptype: ptype.to_string(),
        ..Default::default()
    };
    for (slot, field) in fields.iter().enumerate() {
        let field = field.as_ref();
        check_value(VALUE_COLUMNS[slot], field)?;
        row.values[slot] = field.to_string();
    }
    Ok(row)
}

/// Encode an in-memory rule into a row.
pub fn encode_rule(rule: &PolicyRule) -> AdapterResult<PolicyRow> {
    encode(&rule.ptype, &rule.fields)
}

/// Decode a row into the comma-joined policy line the model loader expects.
///
/// Produces `ptype[, v0][, v1]...[, v5]`, skipping empty columns. Values
/// holding commas, quotes or edge whitespace are quoted so the line loader
/// reads them back unchanged.
pub fn decode(row: &PolicyRow) -> String {
    let mut line = quote_token(&row.ptype).into_owned();
    for value in row.present_values() {
        line.push_str(LINE_SEPARATOR);
        line.push_str(&quote_token(value));
    }
    line
}

/// Decode a row into a structured rule, skipping empty columns.
pub fn decode_rule(row: &PolicyRow) -> PolicyRule {
    PolicyRule::new(row.ptype.clone(), row.present_values())
}

pub(crate) fn check_ptype(ptype: &str) -> AdapterResult<()> {
    if ptype.is_empty() {
        return Err(AdapterError::InvalidRule {
            reason: "policy type must not be empty".to_string(),
        });
    }
    let len = ptype.chars().count();
    if len > MAX_PTYPE_LEN {
        return Err(AdapterError::Capacity {
            reason: format!(
                "policy type '{}' is {} characters, column {} holds {}",
                ptype, len, PTYPE_COLUMN, MAX_PTYPE_LEN
            ),
        });
    }
    Ok(())
}

pub(crate) fn check_value(column: &str, value: &str) -> AdapterResult<()> {
    let len = value.chars().count();
    if len > MAX_VALUE_LEN {
        return Err(AdapterError::Capacity {
            reason: format!(
                "value for column {} is {} characters, at most {} can be stored",
                column, len, MAX_VALUE_LEN
            ),
        });
    }
    Ok(())
}
