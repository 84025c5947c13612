//! LocalStore is a [`BlobStore`] backed by SQLite for metadata and local disk
//! for payloads.
//!
//! Used for development without a cloud account. Payloads are sharded beneath
//! `base_path/{shard}/{shard}/{key}`; writes go through a temp file, fsync and
//! rename so a reader never sees a partial object.

use crate::{
    models::stored::StoredObject,
    services::blob_store::{BlobStore, StorageError, StorageResult},
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use sqlx::{
    FromRow, SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::{debug, info};
use uuid::Uuid;

const MAX_OBJECT_KEY_LEN: usize = 1024;
const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

#[derive(Debug, FromRow)]
struct ObjectRow {
    key: String,
    size_bytes: i64,
    last_modified: DateTime<Utc>,
}

impl From<ObjectRow> for StoredObject {
    fn from(row: ObjectRow) -> Self {
        Self {
            key: row.key,
            size: row.size_bytes.max(0) as u64,
            last_modified: row.last_modified,
        }
    }
}

#[derive(Clone)]
pub struct LocalStore {
    /// Shared SQLite connection pool used for metadata operations.
    pub db: Arc<SqlitePool>,

    /// Base directory on disk where object payloads are stored.
    pub base_path: PathBuf,
}

impl LocalStore {
    pub fn new(db: Arc<SqlitePool>, base_path: impl Into<PathBuf>) -> Self {
        Self {
            db,
            base_path: base_path.into(),
        }
    }

    /// Open (creating if needed) the SQLite database at `database_url` and
    /// the payload directory at `storage_dir`.
    pub async fn connect(database_url: &str, storage_dir: &str) -> StorageResult<Self> {
        fs::create_dir_all(storage_dir).await?;

        let db_path = database_url
            .trim_start_matches("sqlite://")
            .trim_start_matches("file:");
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await?;
                info!("Created missing directory {:?}", parent);
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(Self::new(Arc::new(pool), storage_dir))
    }

    /// Apply the embedded schema. Idempotent.
    pub async fn migrate(&self) -> StorageResult<()> {
        let statements = SCHEMA
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        debug!("Running {} migration statements", statements.len());
        for stmt in statements {
            sqlx::query(stmt).execute(&*self.db).await?;
        }
        Ok(())
    }

    /// Rejects empty or oversized keys, absolute paths, `..` and control bytes.
    fn ensure_key_safe(key: &str) -> StorageResult<()> {
        let unsafe_key = key.is_empty()
            || key.len() > MAX_OBJECT_KEY_LEN
            || key.starts_with('/')
            || key.contains("..")
            || key
                .bytes()
                .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0');
        if unsafe_key {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(())
    }

    /// First two bytes of MD5(key) as lowercase hex, one per directory level.
    fn object_shards(key: &str) -> (String, String) {
        let digest = md5::compute(key);
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    fn object_path(&self, key: &str) -> PathBuf {
        let (shard_a, shard_b) = Self::object_shards(key);
        let mut path = self.base_path.clone();
        path.push(shard_a);
        path.push(shard_b);
        path.push(key);
        path
    }

    async fn fetch_row(&self, key: &str) -> StorageResult<ObjectRow> {
        sqlx::query_as::<_, ObjectRow>(
            "SELECT key, size_bytes, last_modified FROM objects WHERE key = ?",
        )
        .bind(key)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => StorageError::NotFound(key.to_string()),
            other => StorageError::Sqlx(other),
        })
    }

    /// Write `body` to a synced temp file beside `file_path`. The caller
    /// renames it into place once the metadata row is written.
    async fn stage_payload(&self, file_path: &Path, body: &[u8]) -> StorageResult<PathBuf> {
        let parent = file_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            StorageError::Io(io::Error::new(
                ErrorKind::Other,
                "object path missing parent directory",
            ))
        })?;
        fs::create_dir_all(&parent).await?;

        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        let written = async {
            let mut file = File::create(&tmp_path).await?;
            file.write_all(body).await?;
            file.flush().await?;
            file.sync_all().await
        }
        .await;

        if let Err(err) = written {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::Io(err));
        }
        Ok(tmp_path)
    }
}

#[async_trait]
impl BlobStore for LocalStore {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> StorageResult<()> {
        Self::ensure_key_safe(key)?;

        let file_path = self.object_path(key);
        let tmp_path = self.stage_payload(&file_path, &body).await?;

        // Row and payload change together: the upsert stays uncommitted
        // until the rename has replaced the previous payload.
        let committed = async {
            let etag = format!("{:x}", md5::compute(&body));
            let mut tx = self.db.begin().await?;
            sqlx::query(
                r#"
                INSERT INTO objects (key, size_bytes, etag, content_type, last_modified)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(key) DO UPDATE SET
                    size_bytes = excluded.size_bytes,
                    etag = excluded.etag,
                    content_type = excluded.content_type,
                    last_modified = excluded.last_modified
                "#,
            )
            .bind(key)
            .bind(body.len() as i64)
            .bind(&etag)
            .bind(content_type)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

            fs::rename(&tmp_path, &file_path).await?;
            tx.commit().await?;
            Ok::<_, StorageError>(())
        }
        .await;

        if let Err(err) = committed {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(err);
        }

        debug!("stored {} at {}", key, file_path.display());
        Ok(())
    }

    async fn list(&self) -> StorageResult<Vec<StoredObject>> {
        let rows = sqlx::query_as::<_, ObjectRow>(
            "SELECT key, size_bytes, last_modified FROM objects ORDER BY key ASC",
        )
        .fetch_all(&*self.db)
        .await?;

        Ok(rows.into_iter().map(StoredObject::from).collect())
    }

    /// Returns NotFound if the metadata row or the payload file is missing.
    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        Self::ensure_key_safe(key)?;
        let row = self.fetch_row(key).await?;

        let file_path = self.object_path(&row.key);
        match fs::read(&file_path).await {
            Ok(bytes) => Ok(Bytes::from(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    fn backend(&self) -> &'static str {
        "local"
    }
}
