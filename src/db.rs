use crate::persist::RecordStore;
use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

pub const DB_FILE: &str = "markgrid.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)
        .with_context(|| format!("failed to create workspace {}", workspace.to_string_lossy()))?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open database {}", db_path.to_string_lossy()))?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS records(
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT
        )",
        [],
    )?;

    Ok(conn)
}

/// Record store backed by the workspace SQLite database.
pub struct SqliteRecords {
    conn: Connection,
}

impl SqliteRecords {
    pub fn open(workspace: &Path) -> anyhow::Result<Self> {
        Ok(Self {
            conn: open_db(workspace)?,
        })
    }
}

impl RecordStore for SqliteRecords {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM records WHERE key = ?", [key], |r| {
                r.get(0)
            })
            .optional()
            .with_context(|| format!("failed to read record {key}"))?;
        Ok(value)
    }

    fn put(&self, key: &str, value: &str) -> anyhow::Result<()> {
        upsert_record(&self.conn, key, value)
    }

    fn put_all(&self, records: &[(&str, &str)]) -> anyhow::Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        for (key, value) in records {
            upsert_record(&tx, key, value)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.conn
            .execute("DELETE FROM records WHERE key = ?", [key])
            .with_context(|| format!("failed to delete record {key}"))?;
        Ok(())
    }
}

fn upsert_record(conn: &Connection, key: &str, value: &str) -> anyhow::Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO records(key, value, updated_at) VALUES(?, ?, ?)
         ON CONFLICT(key) DO UPDATE SET
           value = excluded.value,
           updated_at = excluded.updated_at",
        (key, value, &now),
    )
    .with_context(|| format!("failed to write record {key}"))?;
    Ok(())
}
