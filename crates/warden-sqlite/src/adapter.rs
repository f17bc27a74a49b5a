//! SQLite implementation of the `Adapter` contract.
//!
//! `SqliteAdapter` owns exactly one connection for its whole lifetime. The
//! connection is opened and the table ensured in `open`, every operation
//! reuses it, and `close` (or drop) releases it.
//!
//! Each operation runs under the configured deadline: a progress handler is
//! installed for the duration of the call and aborts the running statement
//! once the deadline passes. The same abort can be triggered from another
//! thread through `interrupt_handle`.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use rusqlite::{params_from_iter, Connection, ErrorCode, InterruptHandle, TransactionBehavior};
use tracing::{debug, info, warn};

use warden_codec::{decode, encode, encode_filter, PolicyRow};
use warden_contracts::{
    error::{AdapterError, AdapterResult},
    rule::PERSISTED_SECTIONS,
};
use warden_core::{
    parse_policy_line,
    traits::{Adapter, PolicyModel},
};

use crate::{
    config::StoreConfig,
    schema::{create_table, drop_table, validate_table_name, TableSql},
};

/// SQLite virtual-machine instructions between deadline checks.
const PROGRESS_CHECK_OPS: i32 = 1_000;

/// A policy adapter backed by one SQLite table.
///
/// # Thread safety
///
/// The connection sits behind a `Mutex`; concurrent callers serialize.
/// `save_policy` runs inside a single write transaction, so other
/// connections never observe the table half-rewritten.
pub struct SqliteAdapter {
    conn: Mutex<Connection>,
    sql: TableSql,
    operation_timeout: Option<Duration>,
    interrupt: Arc<InterruptHandle>,
}

impl SqliteAdapter {
    /// Open the database described by `config` and ensure the policy table exists.
    ///
    /// Returns `Config` for an invalid configuration, `Connection` if the
    /// database cannot be opened or configured, and `Schema` if the table
    /// cannot be created.
    pub fn open(config: &StoreConfig) -> AdapterResult<Self> {
        config.validate()?;

        let conn = Connection::open(&config.path).map_err(|e| AdapterError::Connection {
            reason: format!("failed to open '{}': {}", config.path.display(), e),
        })?;
        configure_connection(&conn, config.busy_timeout())?;

        let adapter = Self::from_connection(conn, &config.table, config.operation_timeout())?;
        info!(
            path = %config.path.display(),
            table = %config.table,
            "policy store opened"
        );
        Ok(adapter)
    }

    /// Open a private in-memory database. Used by tests and embedders that
    /// only need the adapter for the lifetime of the process.
    pub fn open_in_memory(table: &str) -> AdapterResult<Self> {
        validate_table_name(table)?;
        let conn = Connection::open_in_memory().map_err(|e| AdapterError::Connection {
            reason: format!("failed to open in-memory database: {}", e),
        })?;
        Self::from_connection(conn, table, StoreConfig::default().operation_timeout())
    }

    fn from_connection(
        conn: Connection,
        table: &str,
        operation_timeout: Option<Duration>,
    ) -> AdapterResult<Self> {
        let sql = TableSql::new(table);
        create_table(&conn, &sql)?;
        let interrupt = Arc::new(conn.get_interrupt_handle());

        Ok(Self {
            conn: Mutex::new(conn),
            sql,
            operation_timeout,
            interrupt,
        })
    }

    /// The policy table this adapter reads and writes.
    pub fn table(&self) -> &str {
        &self.sql.table
    }

    /// A handle that aborts the statement currently running on this
    /// adapter's connection. The interrupted operation returns
    /// `AdapterError::Interrupted` and any open transaction rolls back.
    pub fn interrupt_handle(&self) -> Arc<InterruptHandle> {
        Arc::clone(&self.interrupt)
    }

    /// Create the policy table if it does not exist.
    pub fn ensure_schema(&self) -> AdapterResult<()> {
        self.with_conn("ensure_schema", |conn| create_table(conn, &self.sql))
    }

    /// Drop the policy table. Every stored rule is lost.
    pub fn drop_schema(&self) -> AdapterResult<()> {
        self.with_conn("drop_schema", |conn| drop_table(conn, &self.sql))?;
        warn!(table = %self.sql.table, "policy table dropped");
        Ok(())
    }

    /// Number of rows currently stored.
    pub fn row_count(&self) -> AdapterResult<u64> {
        let count: i64 = self.with_conn("row_count", |conn| {
            conn.query_row(&self.sql.count, [], |row| row.get(0))
                .map_err(|e| db_error("row_count", e))
        })?;
        Ok(count.max(0) as u64)
    }

    /// Close the connection, reporting any error SQLite raises while doing so.
    pub fn close(self) -> AdapterResult<()> {
        let table = self.sql.table;
        let conn = self
            .conn
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        conn.close().map_err(|(_, e)| AdapterError::Connection {
            reason: format!("failed to close database: {}", e),
        })?;
        info!(table = %table, "policy store closed");
        Ok(())
    }

    // ── Internals ────────────────────────────────────────────────────────────

    fn lock(&self) -> AdapterResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| AdapterError::Connection {
            reason: format!("connection lock poisoned: {}", e),
        })
    }

    /// Run `f` on the connection under the operation deadline.
    fn with_conn<F, T>(&self, operation: &str, f: F) -> AdapterResult<T>
    where
        F: FnOnce(&mut Connection) -> AdapterResult<T>,
    {
        let mut conn = self.lock()?;

        if let Some(timeout) = self.operation_timeout {
            let deadline = Instant::now() + timeout;
            conn.progress_handler(PROGRESS_CHECK_OPS, Some(move || Instant::now() >= deadline));
        }

        let result = f(&mut *conn);

        if self.operation_timeout.is_some() {
            conn.progress_handler(0, None::<fn() -> bool>);
        }

        if let Err(AdapterError::Interrupted { .. }) = &result {
            warn!(
                operation = %operation,
                table = %self.sql.table,
                "operation interrupted; changes rolled back"
            );
        }
        result
    }

    fn insert_rows(&self, conn: &Connection, rows: &[PolicyRow]) -> AdapterResult<()> {
        let mut stmt = conn
            .prepare_cached(&self.sql.insert)
            .map_err(|e| db_error("insert", e))?;
        for row in rows {
            stmt.execute(row_params(row))
                .map_err(|e| db_error("insert", e))?;
        }
        Ok(())
    }

    fn delete_rows(&self, conn: &Connection, rows: &[PolicyRow]) -> AdapterResult<usize> {
        let mut stmt = conn
            .prepare_cached(&self.sql.delete_exact)
            .map_err(|e| db_error("delete", e))?;
        let mut deleted = 0;
        for row in rows {
            deleted += stmt
                .execute(row_params(row))
                .map_err(|e| db_error("delete", e))?;
        }
        Ok(deleted)
    }

    /// Run `f` inside one IMMEDIATE transaction; commit only if it succeeds.
    fn in_transaction<F, T>(&self, operation: &str, f: F) -> AdapterResult<T>
    where
        F: FnOnce(&Connection) -> AdapterResult<T>,
    {
        self.with_conn(operation, |conn| {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(|e| db_error(operation, e))?;
            // Dropping `tx` on the error path rolls back.
            let value = f(&tx)?;
            tx.commit().map_err(|e| db_error(operation, e))?;
            Ok(value)
        })
    }
}

impl Adapter for SqliteAdapter {
    /// Select every row, decode it, and feed the line to `model`.
    ///
    /// Rows are applied in the order SQLite returns them; no ordering is
    /// promised. Every line is parsed before the first one reaches `model`,
    /// so a malformed row leaves the model untouched. A model whose own
    /// `load_policy_line` fails part-way keeps the lines it already took.
    fn load_policy(&self, model: &mut dyn PolicyModel) -> AdapterResult<()> {
        let rows = self.with_conn("load_policy", |conn| {
            let mut stmt = conn
                .prepare_cached(&self.sql.select)
                .map_err(|e| db_error("load_policy", e))?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(PolicyRow::from_columns(
                        row.get(0)?,
                        [
                            row.get(1)?,
                            row.get(2)?,
                            row.get(3)?,
                            row.get(4)?,
                            row.get(5)?,
                            row.get(6)?,
                        ],
                    ))
                })
                .map_err(|e| db_error("load_policy", e))?;
            rows.collect::<Result<Vec<_>, _>>()
                .map_err(|e| db_error("load_policy", e))
        })?;

        let lines: Vec<String> = rows.iter().map(decode).collect();
        for line in &lines {
            parse_policy_line(line)?;
        }
        for line in &lines {
            model.load_policy_line(line)?;
        }

        info!(table = %self.sql.table, rows = rows.len(), "policy loaded");
        Ok(())
    }

    /// Replace the table contents with the `"p"` then `"g"` sections of `model`.
    ///
    /// Every rule is encoded before the database is touched, so a rule that
    /// does not fit leaves storage unchanged. Drop, recreate and insert then
    /// run in one transaction; any failure rolls the whole rewrite back.
    fn save_policy(&self, model: &dyn PolicyModel) -> AdapterResult<()> {
        let mut rows = Vec::new();
        for sec in PERSISTED_SECTIONS {
            for ptype in model.policy_types(sec) {
                for rule in model.policies(sec, &ptype) {
                    rows.push(encode(&ptype, &rule)?);
                }
            }
        }

        let result = self.in_transaction("save_policy", |conn| {
            drop_table(conn, &self.sql)?;
            create_table(conn, &self.sql)?;
            self.insert_rows(conn, &rows)
        });

        match &result {
            Ok(()) => info!(table = %self.sql.table, rows = rows.len(), "policy saved"),
            Err(e) => warn!(
                table = %self.sql.table,
                error = %e,
                "policy save rolled back; previous rules kept"
            ),
        }
        result
    }

    fn add_policy(&self, sec: &str, ptype: &str, rule: &[String]) -> AdapterResult<()> {
        debug!(sec, ptype, fields = rule.len(), "adding policy");
        let row = encode(ptype, rule)?;
        self.with_conn("add_policy", |conn| {
            self.insert_rows(conn, std::slice::from_ref(&row))
        })
    }

    fn remove_policy(&self, sec: &str, ptype: &str, rule: &[String]) -> AdapterResult<()> {
        let row = encode(ptype, rule)?;
        let deleted = self.with_conn("remove_policy", |conn| {
            self.delete_rows(conn, std::slice::from_ref(&row))
        })?;
        debug!(sec, ptype, deleted, "removed policy");
        Ok(())
    }

    /// Delete every rule of `ptype` matching `field_values` from `field_index` on.
    ///
    /// The range is validated before any SQL runs: the values must not run
    /// past v5.
    fn remove_filtered_policy(
        &self,
        sec: &str,
        ptype: &str,
        field_index: usize,
        field_values: &[String],
    ) -> AdapterResult<()> {
        let filter = encode_filter(ptype, field_index, field_values)?;
        let (columns, values): (Vec<&str>, Vec<&str>) = filter.constraints().unzip();
        let sql = self.sql.delete_matching(&columns);

        let deleted = self.with_conn("remove_filtered_policy", |conn| {
            let params = std::iter::once(filter.ptype.as_str()).chain(values.iter().copied());
            conn.execute(&sql, params_from_iter(params))
                .map_err(|e| db_error("remove_filtered_policy", e))
        })?;

        debug!(sec, ptype, field_index, deleted, "removed filtered policy");
        Ok(())
    }

    /// Store several rules atomically: all are inserted or none are.
    fn add_policies(&self, sec: &str, ptype: &str, rules: &[Vec<String>]) -> AdapterResult<()> {
        let rows = rules
            .iter()
            .map(|rule| encode(ptype, rule))
            .collect::<AdapterResult<Vec<_>>>()?;

        self.in_transaction("add_policies", |conn| self.insert_rows(conn, &rows))?;
        debug!(sec, ptype, added = rows.len(), "added policies");
        Ok(())
    }

    /// Delete several rules atomically.
    fn remove_policies(&self, sec: &str, ptype: &str, rules: &[Vec<String>]) -> AdapterResult<()> {
        let rows = rules
            .iter()
            .map(|rule| encode(ptype, rule))
            .collect::<AdapterResult<Vec<_>>>()?;

        let deleted = self.in_transaction("remove_policies", |conn| self.delete_rows(conn, &rows))?;
        debug!(sec, ptype, deleted, "removed policies");
        Ok(())
    }
}

/// Apply connection-level settings right after opening a file database.
///
/// WAL lets readers on other connections keep reading the last committed
/// table while a save is in progress.
fn configure_connection(conn: &Connection, busy_timeout: Duration) -> AdapterResult<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        ",
    )
    .map_err(|e| AdapterError::Connection {
        reason: format!("failed to configure connection: {}", e),
    })?;
    conn.busy_timeout(busy_timeout)
        .map_err(|e| AdapterError::Connection {
            reason: format!("failed to set busy timeout: {}", e),
        })
}

fn row_params(row: &PolicyRow) -> rusqlite::ParamsFromIter<impl Iterator<Item = &str>> {
    params_from_iter(std::iter::once(row.ptype.as_str()).chain(row.values.iter().map(String::as_str)))
}

pub(crate) fn is_interrupt(err: &rusqlite::Error) -> bool {
    err.sqlite_error_code() == Some(ErrorCode::OperationInterrupted)
}

fn db_error(operation: &str, err: rusqlite::Error) -> AdapterError {
    if is_interrupt(&err) {
        AdapterError::Interrupted {
            operation: operation.to_string(),
        }
    } else {
        AdapterError::Query {
            operation: operation.to_string(),
            reason: err.to_string(),
        }
    }
}
