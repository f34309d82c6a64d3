pub const CREATE_SNIPPETS: &str = r#"
CREATE TABLE IF NOT EXISTS snippets (
  id        INTEGER PRIMARY KEY AUTOINCREMENT,
  task      TEXT NOT NULL,
  code      TEXT NOT NULL,
  timestamp TEXT NOT NULL
);
"#;

pub const INSERT_SNIPPET: &str =
    "INSERT INTO snippets (task, code, timestamp) VALUES (?1, ?2, ?3)";

pub const SELECT_ALL_SNIPPETS: &str =
    "SELECT id, task, code, timestamp FROM snippets ORDER BY id ASC";

pub const SELECT_LATEST_SNIPPET: &str =
    "SELECT id, task, code, timestamp FROM snippets ORDER BY id DESC LIMIT 1";

pub const COUNT_SNIPPETS: &str = "SELECT COUNT(*) FROM snippets";

pub fn schema_statements() -> Vec<&'static str> {
    vec![CREATE_SNIPPETS]
}
