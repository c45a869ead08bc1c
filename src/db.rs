use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

use crate::storage::KeyValueStore;

pub const DB_FILE: &str = "coursebook.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)
        .with_context(|| format!("failed to create workspace {}", workspace.to_string_lossy()))?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.to_string_lossy()))?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv_store(
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT
        )",
        [],
    )?;

    Ok(conn)
}

/// Key-value storage in the workspace SQLite file.
pub struct SqliteKv {
    conn: Connection,
}

impl SqliteKv {
    pub fn open(workspace: &Path) -> anyhow::Result<Self> {
        Ok(SqliteKv {
            conn: open_db(workspace)?,
        })
    }
}

impl KeyValueStore for SqliteKv {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        self.conn
            .query_row("SELECT value FROM kv_store WHERE key = ?", [key], |r| {
                r.get::<_, String>(0)
            })
            .optional()
            .with_context(|| format!("failed to read key {key}"))
    }

    fn set_many(&mut self, entries: &[(String, String)]) -> anyhow::Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let tx = self.conn.transaction().context("failed to begin write")?;
        for (key, value) in entries {
            tx.execute(
                "INSERT INTO kv_store(key, value, updated_at)
                 VALUES(?, ?, ?)
                 ON CONFLICT(key) DO UPDATE SET
                   value = excluded.value,
                   updated_at = excluded.updated_at",
                (key, value, &now),
            )
            .with_context(|| format!("failed to write key {key}"))?;
        }
        tx.commit().context("failed to commit write")?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        self.conn
            .execute("DELETE FROM kv_store WHERE key = ?", [key])
            .with_context(|| format!("failed to delete key {key}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(prefix: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!(
            "{}-{}",
            prefix,
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("clock")
                .as_nanos()
        ))
    }

    #[test]
    fn values_survive_reopen() {
        let dir = temp_dir("coursebook-kv");
        {
            let mut kv = SqliteKv::open(&dir).expect("open");
            kv.set_many(&[
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "2".to_string()),
            ])
            .expect("write");
            kv.set("a", "3".to_string()).expect("overwrite");
            kv.remove("b").expect("remove");
        }
        let kv = SqliteKv::open(&dir).expect("reopen");
        assert_eq!(kv.get("a").expect("get").as_deref(), Some("3"));
        assert_eq!(kv.get("b").expect("get"), None);
        assert!(dir.join(DB_FILE).is_file());
    }
}
