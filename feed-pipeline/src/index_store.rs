use crate::types::{BackendError, IndexEntry, IndexStore, Item, ProcessedIndex};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Index kept in a single JSON object file.
///
/// Every write goes to a sibling temp file that is then renamed over the
/// original, so readers never observe a half-written index. Writes merge with
/// what is on disk; two concurrent runs keep both of their entries.
pub struct JsonFileIndexStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl JsonFileIndexStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "index.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn read(&self) -> Result<ProcessedIndex, BackendError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No index at {}, starting empty", self.path.display());
                return Ok(ProcessedIndex::new());
            }
            Err(e) => {
                return Err(BackendError::Storage(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        if contents.trim().is_empty() {
            return Ok(ProcessedIndex::new());
        }

        serde_json::from_str(&contents).map_err(|e| {
            BackendError::Storage(format!("Corrupt index {}: {}", self.path.display(), e))
        })
    }

    async fn write(&self, index: &ProcessedIndex) -> Result<(), BackendError> {
        let json = serde_json::to_string_pretty(index)
            .map_err(|e| BackendError::Storage(format!("Failed to encode index: {}", e)))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BackendError::Storage(format!("Failed to create {}: {}", parent.display(), e)))?;
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, json)
            .await
            .map_err(|e| BackendError::Storage(format!("Failed to write {}: {}", temp.display(), e)))?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| BackendError::Storage(format!("Failed to replace {}: {}", self.path.display(), e)))
    }
}

#[async_trait]
impl IndexStore for JsonFileIndexStore {
    async fn load(&self) -> Result<ProcessedIndex, BackendError> {
        let index = self.read().await?;
        info!("Loaded {} index entries from {}", index.len(), self.path.display());
        Ok(index)
    }

    async fn save_entry(&self, key: &str, entry: &IndexEntry) -> Result<(), BackendError> {
        let _guard = self.write_lock.lock().await;
        let mut index = self.read().await?;
        if index.insert(key.to_string(), entry.clone()) {
            self.write(&index).await?;
        }
        Ok(())
    }

    async fn persist(&self, snapshot: &ProcessedIndex) -> Result<(), BackendError> {
        let _guard = self.write_lock.lock().await;
        let mut index = self.read().await?;
        let added = index.merge(snapshot);
        self.write(&index).await?;
        debug!("Persisted index ({} entries, {} new)", index.len(), added);
        Ok(())
    }
}

/// Index kept in a Postgres table.
pub struct PgIndexStore {
    db: PgPool,
}

impl PgIndexStore {
    pub async fn connect(database_url: &str) -> Result<Self, BackendError> {
        let db = PgPool::connect(database_url).await.map_err(storage_error)?;
        let store = Self::from_pool(db);
        store.ensure_schema().await?;
        Ok(store)
    }

    pub fn from_pool(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn ensure_schema(&self) -> Result<(), BackendError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS processed_items (
                key TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                url TEXT NOT NULL,
                source TEXT NOT NULL,
                processed_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.db)
        .await
        .map_err(storage_error)?;
        Ok(())
    }
}

fn storage_error(e: sqlx::Error) -> BackendError {
    BackendError::Storage(e.to_string())
}

const INSERT_ENTRY: &str = r#"
    INSERT INTO processed_items (key, title, url, source, processed_at)
    VALUES ($1, $2, $3, $4, $5)
    ON CONFLICT (key) DO NOTHING
"#;

#[async_trait]
impl IndexStore for PgIndexStore {
    async fn load(&self) -> Result<ProcessedIndex, BackendError> {
        let rows = sqlx::query("SELECT key, title, url, source, processed_at FROM processed_items")
            .fetch_all(&self.db)
            .await
            .map_err(storage_error)?;

        let mut index = ProcessedIndex::new();
        for row in rows {
            let processed_at: DateTime<Utc> = row.try_get("processed_at").map_err(storage_error)?;
            let entry = IndexEntry {
                title: row.try_get("title").map_err(storage_error)?,
                url: row.try_get("url").map_err(storage_error)?,
                source: row.try_get("source").map_err(storage_error)?,
                processed_at,
            };
            index.insert(row.try_get("key").map_err(storage_error)?, entry);
        }

        info!("Loaded {} index entries from Postgres", index.len());
        Ok(index)
    }

    async fn save_entry(&self, key: &str, entry: &IndexEntry) -> Result<(), BackendError> {
        sqlx::query(INSERT_ENTRY)
            .bind(key)
            .bind(&entry.title)
            .bind(&entry.url)
            .bind(&entry.source)
            .bind(entry.processed_at)
            .execute(&self.db)
            .await
            .map_err(storage_error)?;
        Ok(())
    }

    async fn persist(&self, index: &ProcessedIndex) -> Result<(), BackendError> {
        let mut tx = self.db.begin().await.map_err(storage_error)?;
        for (key, entry) in index.iter() {
            sqlx::query(INSERT_ENTRY)
                .bind(key)
                .bind(&entry.title)
                .bind(&entry.url)
                .bind(&entry.source)
                .bind(entry.processed_at)
                .execute(&mut *tx)
                .await
                .map_err(storage_error)?;
        }
        tx.commit().await.map_err(storage_error)?;
        debug!("Persisted {} index entries to Postgres", index.len());
        Ok(())
    }
}

/// One run's view of the index: loaded once, marked per item, persisted once.
pub struct IndexHandle {
    store: Arc<dyn IndexStore>,
    index: ProcessedIndex,
    marked: usize,
}

impl IndexHandle {
    pub async fn open(store: Arc<dyn IndexStore>) -> Result<Self, BackendError> {
        let index = store.load().await?;
        Ok(Self {
            store,
            index,
            marked: 0,
        })
    }

    pub fn snapshot(&self) -> &ProcessedIndex {
        &self.index
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains(key)
    }

    /// Durably record `item` under `key`. The in-memory view only changes
    /// once the store has accepted the entry.
    pub async fn mark(&mut self, key: &str, item: &Item) -> Result<(), BackendError> {
        let entry = IndexEntry::from_item(item, Utc::now());
        self.store.save_entry(key, &entry).await?;
        if self.index.insert(key.to_string(), entry) {
            self.marked += 1;
        }
        Ok(())
    }

    pub async fn persist(&self) -> Result<(), BackendError> {
        self.store.persist(&self.index).await
    }

    /// Entries added during this run.
    pub fn marked(&self) -> usize {
        self.marked
    }
}
