//! File-backed adapter tests.
//!
//! These open real database files in temp directories so several
//! connections (and threads) can observe the same table, which an in-memory
//! database cannot offer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use tempfile::TempDir;

use warden_contracts::error::AdapterError;
use warden_core::traits::{Adapter, PolicyModel};
use warden_model::MemoryModel;
use warden_sqlite::{SqliteAdapter, StoreConfig};

fn temp_config() -> (TempDir, StoreConfig) {
    let dir = TempDir::new().unwrap();
    let config = StoreConfig::at(dir.path().join("policy.db"));
    (dir, config)
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn load(adapter: &SqliteAdapter) -> MemoryModel {
    let mut model = MemoryModel::new();
    adapter.load_policy(&mut model).unwrap();
    model
}

/// All rules of a model, sorted, as policy lines.
fn lines(model: &MemoryModel) -> Vec<String> {
    let mut lines: Vec<String> = model.iter().map(|r| r.to_string()).collect();
    lines.sort();
    lines
}

fn model_with_users(count: usize) -> MemoryModel {
    let mut model = MemoryModel::new();
    for i in 0..count {
        model.add_policy("p", "p", strings(&[format!("user{i}").as_str(), "data1", "read"]));
    }
    model.add_policy("g", "g", strings(&["user0", "admin"]));
    model
}

/// Enough rules that a save runs for a noticeable time.
const BULK_USERS: usize = 50_000;

/// Save a small model through a short-lived adapter; return its lines.
fn seed(config: &StoreConfig) -> Vec<String> {
    let adapter = SqliteAdapter::open(config).unwrap();
    adapter.save_policy(&model_with_users(3)).unwrap();
    let saved = lines(&load(&adapter));
    adapter.close().unwrap();
    saved
}

/// Rules saved through one connection are loaded through a fresh one, from
/// the same table.
#[test]
fn save_close_reopen_load() {
    let (_dir, config) = temp_config();
    let original = MemoryModel::from_policy_text(
        "p, alice, data1, read\n\
         p, bob, data2, write\n\
         g, alice, admin",
    )
    .unwrap();

    let writer = SqliteAdapter::open(&config).unwrap();
    writer.save_policy(&original).unwrap();
    writer.close().unwrap();

    let reader = SqliteAdapter::open(&config).unwrap();
    assert_eq!(lines(&load(&reader)), lines(&original));
    reader.close().unwrap();
}

/// Load and save agree on the table name, including a configured one.
#[test]
fn load_after_save_uses_configured_table() {
    let (_dir, mut config) = temp_config();
    config.table = "casbin_rule".to_string();

    let adapter = SqliteAdapter::open(&config).unwrap();
    adapter.save_policy(&model_with_users(3)).unwrap();

    assert_eq!(adapter.table(), "casbin_rule");
    assert_eq!(load(&adapter).len(), 4);

    // A second adapter on the default table sees nothing.
    let other = SqliteAdapter::open(&StoreConfig::at(&config.path)).unwrap();
    assert!(load(&other).is_empty());
}

/// A load issued after a save completes sees exactly that save, and a
/// reader on another connection never sees a half-written table.
#[test]
fn concurrent_save_isolation() {
    let (_dir, config) = temp_config();
    let small = model_with_users(2);
    let large = model_with_users(300);
    let small_lines = lines(&small);
    let large_lines = lines(&large);

    let writer = SqliteAdapter::open(&config).unwrap();
    writer.save_policy(&small).unwrap();
    let reader = SqliteAdapter::open(&config).unwrap();

    let handle = thread::spawn(move || {
        for round in 0..20 {
            let model = if round % 2 == 0 { &large } else { &small };
            writer.save_policy(model).unwrap();
        }
        writer
    });

    for _ in 0..50 {
        let observed = lines(&load(&reader));
        assert!(
            observed == small_lines || observed == large_lines,
            "reader observed a partial table with {} rules",
            observed.len()
        );
    }

    let writer = handle.join().unwrap();
    // Round 19 saved `small`; everything after that point must see it.
    assert_eq!(lines(&load(&writer)), small_lines);
    assert_eq!(lines(&load(&reader)), small_lines);
}

/// The adapter can be shared behind the `Adapter` trait object across threads.
#[test]
fn shared_adapter_serializes_concurrent_adds() {
    let (_dir, config) = temp_config();
    let adapter = Arc::new(SqliteAdapter::open(&config).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let adapter: Arc<dyn Adapter> = adapter.clone();
            thread::spawn(move || {
                for i in 0..25 {
                    let rule = strings(&[format!("user{t}-{i}").as_str(), "data1", "read"]);
                    adapter.add_policy("p", "p", &rule).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(adapter.row_count().unwrap(), 100);
}

#[test]
fn open_in_missing_directory_is_connection_error() {
    let dir = TempDir::new().unwrap();
    let config = StoreConfig::at(dir.path().join("missing").join("policy.db"));

    assert!(matches!(
        SqliteAdapter::open(&config),
        Err(AdapterError::Connection { .. })
    ));
}

/// A file that is not a database is reported, not a panic.
#[test]
fn open_non_database_file_is_typed_error() {
    let (dir, config) = temp_config();
    std::fs::write(dir.path().join("policy.db"), vec![b'x'; 4096]).unwrap();

    assert!(matches!(
        SqliteAdapter::open(&config),
        Err(AdapterError::Connection { .. }) | Err(AdapterError::Schema { .. })
    ));
}

#[test]
fn config_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("from-file.db");
    let config_path = dir.path().join("warden.toml");
    std::fs::write(
        &config_path,
        format!(
            "path = {:?}\ntable = \"rules\"\nbusy_timeout_ms = 250\n",
            db_path.to_str().unwrap()
        ),
    )
    .unwrap();

    let config = StoreConfig::from_file(&config_path).unwrap();
    assert_eq!(config.path, db_path);
    assert_eq!(config.busy_timeout_ms, 250);

    let adapter = SqliteAdapter::open(&config).unwrap();
    adapter.add_policy("g", "g", &strings(&["alice", "admin"])).unwrap();
    assert_eq!(adapter.table(), "rules");
    assert_eq!(load(&adapter).rules("g", "g"), &[strings(&["alice", "admin"])]);

    assert!(matches!(
        StoreConfig::from_file(&dir.path().join("absent.toml")),
        Err(AdapterError::Config { .. })
    ));
}

// ── Deadlines and cancellation ───────────────────────────────────────────────

/// A save that outlives `operation_timeout_ms` is aborted and rolled back.
#[test]
fn save_past_operation_timeout_keeps_previous_rules() {
    let (_dir, config) = temp_config();
    let before = seed(&config);
    assert_eq!(before.len(), 4);

    let hasty = SqliteAdapter::open(&StoreConfig {
        operation_timeout_ms: 1,
        ..config.clone()
    })
    .unwrap();
    let result = hasty.save_policy(&model_with_users(BULK_USERS));
    assert!(
        matches!(result, Err(AdapterError::Interrupted { .. })),
        "expected Interrupted, got {:?}",
        result
    );
    hasty.close().unwrap();

    let reader = SqliteAdapter::open(&config).unwrap();
    assert_eq!(lines(&load(&reader)), before);
    assert_eq!(reader.row_count().unwrap(), 4);
}

/// Cancelling through the interrupt handle from another thread aborts a
/// running save and leaves the previous rules in place.
#[test]
fn interrupt_handle_aborts_running_save() {
    let (_dir, config) = temp_config();
    let before = seed(&config);

    let adapter = SqliteAdapter::open(&config).unwrap();
    let handle = adapter.interrupt_handle();
    let done = Arc::new(AtomicBool::new(false));
    let canceller = {
        let done = Arc::clone(&done);
        thread::spawn(move || {
            while !done.load(Ordering::Acquire) {
                handle.interrupt();
                thread::yield_now();
            }
        })
    };

    let result = adapter.save_policy(&model_with_users(BULK_USERS));
    done.store(true, Ordering::Release);
    canceller.join().unwrap();

    assert!(
        matches!(result, Err(AdapterError::Interrupted { .. })),
        "expected Interrupted, got {:?}",
        result
    );
    adapter.close().unwrap();

    let reader = SqliteAdapter::open(&config).unwrap();
    assert_eq!(lines(&load(&reader)), before);
}

// ── Foreign rows ─────────────────────────────────────────────────────────────

/// A row written by another tool that no policy line can express fails the
/// load before any rule reaches the model.
#[test]
fn load_with_malformed_row_leaves_model_untouched() {
    let (_dir, config) = temp_config();
    let adapter = SqliteAdapter::open(&config).unwrap();
    adapter.add_policy("p", "p", &strings(&["alice", "data1", "read"])).unwrap();

    let foreign = rusqlite::Connection::open(&config.path).unwrap();
    foreign
        .execute("INSERT INTO policy_rule (p_type, v0) VALUES (NULL, 'bob')", [])
        .unwrap();
    drop(foreign);
    adapter.add_policy("g", "g", &strings(&["alice", "admin"])).unwrap();

    let mut model = MemoryModel::new();
    assert!(matches!(
        adapter.load_policy(&mut model),
        Err(AdapterError::InvalidLine { .. })
    ));
    assert!(model.is_empty());
}
