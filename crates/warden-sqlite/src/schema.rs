//! Policy table schema and the SQL built from it.
//!
//! One table, seven columns, no primary key:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS policy_rule (
//!     p_type VARCHAR(10),
//!     v0 VARCHAR(256), v1 VARCHAR(256), v2 VARCHAR(256),
//!     v3 VARCHAR(256), v4 VARCHAR(256), v5 VARCHAR(256)
//! )
//! ```
//!
//! The table name is configurable, so it is validated as a plain identifier
//! before it is ever spliced into SQL.

use rusqlite::Connection;

use warden_codec::{PTYPE_COLUMN, VALUE_COLUMNS};
use warden_contracts::{
    error::{AdapterError, AdapterResult},
    rule::{MAX_PTYPE_LEN, MAX_VALUE_LEN},
};

use crate::adapter::is_interrupt;

/// Table used when the configuration does not name one.
pub const DEFAULT_TABLE: &str = "policy_rule";

const MAX_TABLE_NAME_LEN: usize = 64;

/// Accept `[A-Za-z_][A-Za-z0-9_]*`, at most 64 characters.
pub fn validate_table_name(name: &str) -> AdapterResult<()> {
    let mut chars = name.chars();
    let valid_start = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if !valid_start || !valid_rest || name.len() > MAX_TABLE_NAME_LEN {
        return Err(AdapterError::Config {
            reason: format!(
                "table name '{}' must match [A-Za-z_][A-Za-z0-9_]* and be at most {} characters",
                name, MAX_TABLE_NAME_LEN
            ),
        });
    }
    Ok(())
}

/// SQL statements for one policy table, built once per adapter.
#[derive(Debug, Clone)]
pub(crate) struct TableSql {
    pub(crate) table: String,
    pub(crate) create: String,
    pub(crate) drop: String,
    pub(crate) select: String,
    pub(crate) insert: String,
    pub(crate) delete_exact: String,
    pub(crate) count: String,
}

impl TableSql {
    /// `table` must already have passed `validate_table_name`.
    pub(crate) fn new(table: &str) -> Self {
        let value_defs: Vec<String> = VALUE_COLUMNS
            .iter()
            .map(|c| format!("{} VARCHAR({})", c, MAX_VALUE_LEN))
            .collect();
        let all_columns = std::iter::once(PTYPE_COLUMN)
            .chain(VALUE_COLUMNS)
            .collect::<Vec<_>>()
            .join(", ");
        let value_matches: Vec<String> = VALUE_COLUMNS
            .iter()
            .enumerate()
            .map(|(i, c)| format!("IFNULL({}, '') = ?{}", c, i + 2))
            .collect();

        Self {
            table: table.to_string(),
            create: format!(
                "CREATE TABLE IF NOT EXISTS {} ({} VARCHAR({}), {})",
                table,
                PTYPE_COLUMN,
                MAX_PTYPE_LEN,
                value_defs.join(", ")
            ),
            drop: format!("DROP TABLE IF EXISTS {}", table),
            select: format!("SELECT {} FROM {}", all_columns, table),
            insert: format!(
                "INSERT INTO {} ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                table, all_columns
            ),
            delete_exact: format!(
                "DELETE FROM {} WHERE {} = ?1 AND {}",
                table,
                PTYPE_COLUMN,
                value_matches.join(" AND ")
            ),
            count: format!("SELECT COUNT(*) FROM {}", table),
        }
    }

    /// `DELETE` constrained on `p_type` plus the named value columns, in order.
    pub(crate) fn delete_matching(&self, columns: &[&str]) -> String {
        let mut sql = format!("DELETE FROM {} WHERE {} = ?1", self.table, PTYPE_COLUMN);
        for (i, column) in columns.iter().enumerate() {
            sql.push_str(&format!(" AND IFNULL({}, '') = ?{}", column, i + 2));
        }
        sql
    }
}

/// Create the policy table if it does not exist.
pub(crate) fn create_table(conn: &Connection, sql: &TableSql) -> AdapterResult<()> {
    conn.execute_batch(&sql.create)
        .map_err(|e| schema_error("create", &sql.table, e))
}

/// Drop the policy table if it exists.
pub(crate) fn drop_table(conn: &Connection, sql: &TableSql) -> AdapterResult<()> {
    conn.execute_batch(&sql.drop)
        .map_err(|e| schema_error("drop", &sql.table, e))
}

fn schema_error(action: &str, table: &str, err: rusqlite::Error) -> AdapterError {
    if is_interrupt(&err) {
        return AdapterError::Interrupted {
            operation: format!("{} table", action),
        };
    }
    AdapterError::Schema {
        reason: format!("failed to {} table '{}': {}", action, table, err),
    }
}
