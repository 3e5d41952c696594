//! Storage and metadata collaborators.
//!
//! Both sit at the system boundary: the storage sink accepts one finalized
//! output media object and returns a public URL (fire-once, no retry), and
//! the metadata store persists the boundary report record. The coordinator
//! logs their failures without surfacing them; reporting success is
//! deliberately decoupled from persistence success.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection};

use crate::report::BoundaryReport;

/// Accepts one finalized output media object, returns a public URL.
pub trait StorageSink: Send {
    fn upload(&mut self, media_path: &Path) -> Result<String>;
}

/// Persists boundary report records. Must tolerate concurrent append-only
/// writes from independent sessions.
pub trait MetadataStore: Send {
    fn persist_report(&mut self, report: &BoundaryReport) -> Result<()>;
}

// ----------------------------------------------------------------------------
// Local filesystem storage
// ----------------------------------------------------------------------------

/// Storage sink that copies media into a local root and returns `file://`
/// URLs. Stands in for a cloud bucket with the same one-shot contract.
pub struct LocalStorageSink {
    root: PathBuf,
}

impl LocalStorageSink {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("failed to create storage root {}", root.display()))?;
        Ok(Self { root })
    }
}

impl StorageSink for LocalStorageSink {
    fn upload(&mut self, media_path: &Path) -> Result<String> {
        let name = media_path
            .file_name()
            .ok_or_else(|| anyhow!("media path {} has no file name", media_path.display()))?;
        let dest = self.root.join(name);

        if media_path.is_dir() {
            // Frame-sequence output: copy the directory contents.
            std::fs::create_dir_all(&dest)?;
            for entry in std::fs::read_dir(media_path)? {
                let entry = entry?;
                if entry.path().is_file() {
                    std::fs::copy(entry.path(), dest.join(entry.file_name()))?;
                }
            }
        } else {
            std::fs::copy(media_path, &dest)
                .with_context(|| format!("failed to copy {} into storage", media_path.display()))?;
        }

        let absolute = dest.canonicalize().unwrap_or(dest);
        Ok(format!("file://{}", absolute.display()))
    }
}

// ----------------------------------------------------------------------------
// Sqlite metadata store
// ----------------------------------------------------------------------------

/// Metadata store backed by sqlite. Reports are appended as JSON rows.
pub struct SqliteMetadataStore {
    conn: Connection,
}

impl SqliteMetadataStore {
    pub fn open(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        let store = Self { conn };
        store.ensure_schema()?;
        Ok(store)
    }

    fn ensure_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;

            CREATE TABLE IF NOT EXISTS media_reports (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              created_at INTEGER NOT NULL,
              payload_json TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_reports_created ON media_reports(created_at);
            "#,
        )?;
        Ok(())
    }

    /// Read back the most recent reports, newest first.
    pub fn list_reports(&self, limit: usize) -> Result<Vec<StoredReport>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, created_at, payload_json FROM media_reports ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut reports = Vec::new();
        for row in rows {
            let (id, created_at, payload_json) = row?;
            let payload: serde_json::Value = serde_json::from_str(&payload_json)
                .with_context(|| format!("corrupt report payload in row {}", id))?;
            reports.push(StoredReport {
                id,
                created_at,
                payload,
            });
        }
        Ok(reports)
    }
}

impl MetadataStore for SqliteMetadataStore {
    fn persist_report(&mut self, report: &BoundaryReport) -> Result<()> {
        let payload = serde_json::to_string(report)?;
        let created_at = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)?
            .as_secs() as i64;
        self.conn.execute(
            "INSERT INTO media_reports (created_at, payload_json) VALUES (?1, ?2)",
            params![created_at, payload],
        )?;
        Ok(())
    }
}

/// One persisted report row.
#[derive(Clone, Debug)]
pub struct StoredReport {
    pub id: i64,
    pub created_at: i64,
    pub payload: serde_json::Value,
}

// ----------------------------------------------------------------------------
// In-memory metadata store for tests
// ----------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryMetadataStore {
    pub records: Vec<serde_json::Value>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetadataStore for InMemoryMetadataStore {
    fn persist_report(&mut self, report: &BoundaryReport) -> Result<()> {
        self.records.push(serde_json::to_value(report)?);
        Ok(())
    }
}
