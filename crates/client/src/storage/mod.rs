//! Client-side persistent storage.
//!
//! # Partitions
//!
//! - `user` - The signed-in user (singleton)
//! - `designs` - Saved designs keyed by normalized id
//! - `cache` - Arbitrary keyed payloads tagged with their write time
//!
//! Values are stored as JSON in SQLite through `sqlx`. The pool is opened
//! lazily on first use, the schema is migrated at the same time, and the pool
//! is shared by every clone of the [`ClientStore`] handle.
//!
//! Every successful write is announced on a broadcast channel so that other
//! handles on the same store can refresh their view (see [`ClientStore::subscribe`]).

pub mod cache;
pub mod designs;
pub mod users;

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::sync::{OnceCell, broadcast};
use tracing::{debug, instrument};

pub use cache::{CacheEntry, CachePartition};
pub use designs::DesignPartition;
pub use users::UserPartition;

/// Capacity of the change-notification channel.
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Errors from the client store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failed.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored value could not be encoded or decoded.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        Self::DataCorruption(e.to_string())
    }
}

/// The named partitions of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    User,
    Designs,
    Cache,
}

/// A write to the store, published to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageChange {
    /// Partition that was written.
    pub partition: Partition,
    /// Record key, if the write touched a single record.
    pub key: Option<String>,
}

/// Handle to the client store. Cheap to clone.
#[derive(Clone)]
pub struct ClientStore {
    inner: Arc<ClientStoreInner>,
}

struct ClientStoreInner {
    url: String,
    pool: OnceCell<SqlitePool>,
    changes: broadcast::Sender<StorageChange>,
}

impl ClientStore {
    /// Create a store handle for an SQLite URL. Nothing is opened yet.
    ///
    /// `sqlite::memory:` gives a private in-memory store.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(ClientStoreInner {
                url: url.into(),
                pool: OnceCell::new(),
                changes,
            }),
        }
    }

    /// A private in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new("sqlite::memory:")
    }

    /// The user partition.
    #[must_use]
    pub const fn users(&self) -> UserPartition<'_> {
        UserPartition::new(self)
    }

    /// The designs partition.
    #[must_use]
    pub const fn designs(&self) -> DesignPartition<'_> {
        DesignPartition::new(self)
    }

    /// The cache partition.
    #[must_use]
    pub const fn cache(&self) -> CachePartition<'_> {
        CachePartition::new(self)
    }

    /// Subscribe to writes made through any handle on this store.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.inner.changes.subscribe()
    }

    /// Open the pool on first use and reuse it afterwards.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the database cannot be opened or migrated.
    /// A failed open is retried on the next call.
    pub async fn pool(&self) -> Result<&SqlitePool, StorageError> {
        self.inner
            .pool
            .get_or_try_init(|| open_pool(&self.inner.url))
            .await
    }

    pub(crate) fn notify(&self, partition: Partition, key: Option<&str>) {
        // No receivers is fine; nobody is listening yet.
        let _ = self.inner.changes.send(StorageChange {
            partition,
            key: key.map(ToOwned::to_owned),
        });
    }
}

impl std::fmt::Debug for ClientStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientStore")
            .field("url", &self.inner.url)
            .field("open", &self.inner.pool.initialized())
            .finish()
    }
}

#[instrument]
async fn open_pool(url: &str) -> Result<SqlitePool, StorageError> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

    // Every connection to `:memory:` is its own database, so keep exactly one
    // connection alive for the lifetime of the pool.
    let in_memory = url.contains(":memory:") || url.contains("mode=memory");
    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(4)
    };

    let pool = pool_options
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    debug!("client store opened");
    Ok(pool)
}

/// Current time as epoch milliseconds.
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
