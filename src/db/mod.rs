pub mod queries;

use anyhow::{Context, Result};
use chrono::Local;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One generation attempt. `code` holds either the snippet or the error text
/// shown in its place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnippetRecord {
    pub id: i64,
    pub task: String,
    pub code: String,
    pub timestamp: String,
}

impl SnippetRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            task: row.get(1)?,
            code: row.get(2)?,
            timestamp: row.get(3)?,
        })
    }
}

/// Append-only snippet log. Every operation opens its own connection and
/// drops it before returning.
#[derive(Debug, Clone)]
pub struct SnippetStore {
    path: PathBuf,
}

impl SnippetStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `path` with the schema already in place.
    pub fn open(path: &Path) -> Result<Self> {
        let store = Self::new(path);
        store.initialize()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn initialize(&self) -> Result<()> {
        let conn = self.connect()?;

        queries::schema_statements()
            .iter()
            .try_for_each(|statement| {
                conn.execute(statement, [])
                    .context("Failed to initialize schema")
                    .map(|_| ())
            })?;

        info!(path = %self.path.display(), "snippet store ready");
        Ok(())
    }

    pub fn insert(&self, task: &str, code: &str) -> Result<i64> {
        let conn = self.connect()?;
        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();

        conn.execute(queries::INSERT_SNIPPET, params![task, code, timestamp])
            .context("Failed to insert snippet")?;

        let id = conn.last_insert_rowid();
        debug!(id, "snippet stored");

        Ok(id)
    }

    pub fn list_all(&self) -> Result<Vec<SnippetRecord>> {
        let conn = self.connect()?;
        let mut statement = conn
            .prepare(queries::SELECT_ALL_SNIPPETS)
            .context("Failed to prepare snippet query")?;

        let rows = statement
            .query_map([], SnippetRecord::from_row)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query snippets")?;

        Ok(rows)
    }

    pub fn latest(&self) -> Result<Option<SnippetRecord>> {
        let conn = self.connect()?;
        conn.query_row(queries::SELECT_LATEST_SNIPPET, [], SnippetRecord::from_row)
            .optional()
            .context("Failed to query latest snippet")
    }

    pub fn count(&self) -> Result<i64> {
        let conn = self.connect()?;
        conn.query_row(queries::COUNT_SNIPPETS, [], |row| row.get(0))
            .context("Failed to count snippets")
    }

    fn connect(&self) -> Result<Connection> {
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create DB directory: {}", parent.display()))?;
        }

        Connection::open(&self.path)
            .with_context(|| format!("Failed to open SQLite DB: {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::SnippetStore;
    use regex::Regex;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, SnippetStore) {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = SnippetStore::open(&dir.path().join("db").join("snippets.db"))
            .expect("store initialized");
        (dir, store)
    }

    fn column_names(store: &SnippetStore) -> Vec<String> {
        let conn = store.connect().expect("connection");
        let mut statement = conn
            .prepare("SELECT name FROM pragma_table_info('snippets')")
            .expect("pragma query");
        statement
            .query_map([], |row| row.get::<_, String>(0))
            .expect("pragma rows")
            .collect::<Result<Vec<_>, _>>()
            .expect("column names")
    }

    #[test]
    fn initialize_is_idempotent() {
        let (_dir, store) = temp_store();
        store.insert("reverse a string", "s[::-1]").expect("insert");

        store.initialize().expect("second initialize");
        store.initialize().expect("third initialize");

        let conn = store.connect().expect("connection");
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'snippets'",
                [],
                |row| row.get(0),
            )
            .expect("table count");

        assert_eq!(tables, 1);
        assert_eq!(column_names(&store), ["id", "task", "code", "timestamp"]);
        assert_eq!(store.count().expect("count"), 1);
    }

    #[test]
    fn empty_store_lists_nothing() {
        let (_dir, store) = temp_store();

        assert!(store.list_all().expect("list").is_empty());
        assert!(store.latest().expect("latest").is_none());
        assert_eq!(store.count().expect("count"), 0);
    }

    #[test]
    fn insert_then_list_round_trips_every_record() {
        let (_dir, store) = temp_store();
        let timestamp_pattern =
            Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}$").expect("pattern");

        let inputs = [
            ("reverse a string", "def reverse(s): return s[::-1]"),
            ("sum a list", "sum(xs)"),
            ("broken", "Error generating code: 401 Unauthorized"),
            ("multi-line", "def f():\n    return 1\n"),
        ];

        let ids = inputs
            .iter()
            .map(|(task, code)| store.insert(task, code).expect("insert"))
            .collect::<Vec<_>>();

        let records = store.list_all().expect("list");
        assert_eq!(records.len(), inputs.len());

        for ((record, (task, code)), id) in records.iter().zip(inputs.iter()).zip(ids.iter()) {
            assert_eq!(record.id, *id);
            assert_eq!(record.task, *task);
            assert_eq!(record.code, *code);
            assert!(
                timestamp_pattern.is_match(&record.timestamp),
                "unexpected timestamp: {}",
                record.timestamp
            );
        }
    }

    #[test]
    fn ids_increase_in_insertion_order() {
        let (_dir, store) = temp_store();

        let ids = (0..5)
            .map(|index| store.insert(&format!("task {index}"), "code").expect("insert"))
            .collect::<Vec<_>>();

        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn listing_preserves_insertion_order() {
        let (_dir, store) = temp_store();
        for task in ["A", "B", "C"] {
            store.insert(task, "code").expect("insert");
        }

        let tasks = store
            .list_all()
            .expect("list")
            .into_iter()
            .map(|record| record.task)
            .collect::<Vec<_>>();

        assert_eq!(tasks, ["A", "B", "C"]);
        assert_eq!(store.latest().expect("latest").map(|r| r.task).as_deref(), Some("C"));
    }

    #[test]
    fn records_survive_reopening_the_file() {
        let (dir, store) = temp_store();
        store.insert("persist me", "print('hi')").expect("insert");

        let reopened = SnippetStore::open(&dir.path().join("db").join("snippets.db"))
            .expect("reopen");
        let records = reopened.list_all().expect("list");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].task, "persist me");
    }
}
