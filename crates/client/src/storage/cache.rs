//! The `cache` partition: keyed payloads tagged with their write time.
//!
//! The store never expires entries on its own. Callers that want expiry check
//! [`CacheEntry::is_older_than`] after reading.

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::instrument;

use super::{ClientStore, Partition, StorageError, now_millis};

/// A cached payload and when it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry<T> {
    pub payload: T,
    pub written_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    /// Whether the entry was written more than `max_age` ago.
    #[must_use]
    pub fn is_older_than(&self, max_age: chrono::Duration) -> bool {
        Utc::now() - self.written_at > max_age
    }
}

/// Access to the cache partition.
pub struct CachePartition<'a> {
    store: &'a ClientStore,
}

impl<'a> CachePartition<'a> {
    pub(super) const fn new(store: &'a ClientStore) -> Self {
        Self { store }
    }

    /// Write a payload under `key`, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the payload cannot be encoded or the write
    /// fails.
    #[instrument(skip(self, payload))]
    pub async fn save<T: Serialize + Sync>(
        &self,
        key: &str,
        payload: &T,
    ) -> Result<DateTime<Utc>, StorageError> {
        let value = serde_json::to_string(payload)?;
        let written_at = now_millis();
        sqlx::query(
            r"
            INSERT INTO cache_entry (key, value, written_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (key) DO UPDATE SET value = excluded.value, written_at = excluded.written_at
            ",
        )
        .bind(key)
        .bind(&value)
        .bind(written_at)
        .execute(self.store.pool().await?)
        .await?;

        self.store.notify(Partition::Cache, Some(key));
        Ok(millis_to_datetime(written_at))
    }

    /// Read the entry under `key`, regardless of its age.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails or the payload does not
    /// decode as `T`.
    pub async fn get<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<CacheEntry<T>>, StorageError> {
        let row: Option<(String, i64)> =
            sqlx::query_as("SELECT value, written_at FROM cache_entry WHERE key = ?1")
                .bind(key)
                .fetch_optional(self.store.pool().await?)
                .await?;

        row.map(|(value, written_at)| {
            Ok::<_, StorageError>(CacheEntry {
                payload: serde_json::from_str(&value)?,
                written_at: millis_to_datetime(written_at),
            })
        })
        .transpose()
    }

    /// Remove the entry under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the delete fails.
    #[instrument(skip(self))]
    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM cache_entry WHERE key = ?1")
            .bind(key)
            .execute(self.store.pool().await?)
            .await?;

        self.store.notify(Partition::Cache, Some(key));
        Ok(())
    }
}

fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
