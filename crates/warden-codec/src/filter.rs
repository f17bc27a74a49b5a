//! Partial-match patterns for filtered removal.
//!
//! A filter constrains the policy type plus a contiguous run of value
//! columns starting at `field_index`. Columns outside that run, and columns
//! whose supplied value is empty, stay unconstrained.

use warden_contracts::{
    error::{AdapterError, AdapterResult},
    rule::MAX_FIELDS,
};

use crate::row::{check_ptype, check_value, VALUE_COLUMNS};

/// A row pattern: `Some(value)` slots must match exactly, `None` slots match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowFilter {
    pub ptype: String,
    pub values: [Option<String>; MAX_FIELDS],
}

impl RowFilter {
    /// Constrained slots as `(column name, value)`, in slot order.
    pub fn constraints(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(slot, v)| v.as_deref().map(|v| (VALUE_COLUMNS[slot], v)))
    }

    /// True when no value column is constrained (every rule of the type matches).
    pub fn is_type_only(&self) -> bool {
        self.values.iter().all(Option::is_none)
    }
}

/// Build the pattern for `remove_filtered_policy`.
///
/// `field_values[k]` constrains column `v{field_index + k}`.
///
/// # Errors
///
/// `InvalidFilter` when `field_index + field_values.len()` exceeds six, so
/// the values would run past `v5`; the same checks as `encode` for the
/// policy type and value lengths. A `field_index` of six with no values is
/// accepted and matches every rule of the type.
pub fn encode_filter<S: AsRef<str>>(
    ptype: &str,
    field_index: usize,
    field_values: &[S],
) -> AdapterResult<RowFilter> {
    check_ptype(ptype)?;

    let end = field_index.checked_add(field_values.len());
    if !matches!(end, Some(end) if end <= MAX_FIELDS) {
        return Err(AdapterError::InvalidFilter {
            reason: format!(
                "{} values starting at field_index {} run past v{}",
                field_values.len(),
                field_index,
                MAX_FIELDS - 1
            ),
        });
    }

    let mut filter = RowFilter {
        ptype: ptype.to_string(),
        ..Default::default()
    };
    for (offset, value) in field_values.iter().enumerate() {
        let value = value.as_ref();
        if value.is_empty() {
            continue;
        }
        let slot = field_index + offset;
        check_value(VALUE_COLUMNS[slot], value)?;
        filter.values[slot] = Some(value.to_string());
    }
    Ok(filter)
}
