//! The `designs` partition.

use kickforge_core::{Design, DesignId, UserId};
use tracing::instrument;

use super::{ClientStore, Partition, StorageError};

/// Access to locally saved designs.
pub struct DesignPartition<'a> {
    store: &'a ClientStore,
}

impl<'a> DesignPartition<'a> {
    pub(super) const fn new(store: &'a ClientStore) -> Self {
        Self { store }
    }

    /// Insert or replace a design by its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    #[instrument(skip(self, design), fields(design_id = %design.id))]
    pub async fn save(&self, design: &Design) -> Result<(), StorageError> {
        let value = serde_json::to_string(design)?;
        sqlx::query(
            r"
            INSERT INTO design (id, owner_id, created_at, value)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (id) DO UPDATE SET
                owner_id = excluded.owner_id,
                created_at = excluded.created_at,
                value = excluded.value
            ",
        )
        .bind(design.id.as_str())
        .bind(design.owner.as_ref().map(UserId::as_str))
        .bind(design.created_at.timestamp_millis())
        .bind(&value)
        .execute(self.store.pool().await?)
        .await?;

        self.store.notify(Partition::Designs, Some(design.id.as_str()));
        Ok(())
    }

    /// All designs, optionally only those owned by `owner`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails or a record is corrupt.
    pub async fn list(&self, owner: Option<&UserId>) -> Result<Vec<Design>, StorageError> {
        let pool = self.store.pool().await?;
        let rows: Vec<(String,)> = match owner {
            Some(owner) => {
                sqlx::query_as(
                    "SELECT value FROM design WHERE owner_id = ?1 ORDER BY created_at DESC, id",
                )
                .bind(owner.as_str())
                .fetch_all(pool)
                .await?
            }
            None => {
                sqlx::query_as("SELECT value FROM design ORDER BY created_at DESC, id")
                    .fetch_all(pool)
                    .await?
            }
        };

        rows.into_iter()
            .map(|(value,)| serde_json::from_str(&value).map_err(StorageError::from))
            .collect()
    }

    /// Get one design by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails or the record is corrupt.
    pub async fn get(&self, id: &DesignId) -> Result<Option<Design>, StorageError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM design WHERE id = ?1")
            .bind(id.as_str())
            .fetch_optional(self.store.pool().await?)
            .await?;

        row.map(|(value,)| serde_json::from_str(&value).map_err(StorageError::from))
            .transpose()
    }

    /// Delete one design. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the delete fails.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &DesignId) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM design WHERE id = ?1")
            .bind(id.as_str())
            .execute(self.store.pool().await?)
            .await?;

        self.store.notify(Partition::Designs, Some(id.as_str()));
        Ok(result.rows_affected() > 0)
    }

    /// Delete every stored design.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the delete fails.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<u64, StorageError> {
        let result = sqlx::query("DELETE FROM design")
            .execute(self.store.pool().await?)
            .await?;

        self.store.notify(Partition::Designs, None);
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use kickforge_core::ColorMap;

    use super::*;

    fn design(id: &str, owner: Option<&str>, millis: i64) -> Design {
        let mut d = Design::new(format!("Design {id}"), ColorMap::new(), owner.map(UserId::new));
        d.id = DesignId::new(id);
        d.created_at = Utc.timestamp_millis_opt(millis).unwrap();
        d
    }

    #[tokio::test]
    async fn test_list_sorted_newest_first() {
        let store = ClientStore::in_memory();
        let designs = store.designs();
        designs.save(&design("old", None, 1_000)).await.unwrap();
        designs.save(&design("new", None, 3_000)).await.unwrap();
        designs.save(&design("mid", None, 2_000)).await.unwrap();

        let ids: Vec<String> = designs
            .list(None)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id.to_string())
            .collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }

    #[tokio::test]
    async fn test_list_filters_by_owner() {
        let store = ClientStore::in_memory();
        let designs = store.designs();
        designs.save(&design("a", Some("u1"), 1)).await.unwrap();
        designs.save(&design("b", Some("u2"), 2)).await.unwrap();
        designs.save(&design("c", None, 3)).await.unwrap();

        let mine = designs.list(Some(&UserId::new("u1"))).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine.first().unwrap().id.as_str(), "a");
        assert_eq!(designs.list(None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_save_upserts_by_id() {
        let store = ClientStore::in_memory();
        let designs = store.designs();
        let mut d = design("a", None, 1);
        designs.save(&d).await.unwrap();
        d.name = "Renamed".to_owned();
        designs.save(&d).await.unwrap();

        assert_eq!(designs.list(None).await.unwrap().len(), 1);
        let stored = designs.get(&DesignId::new("a")).await.unwrap().unwrap();
        assert_eq!(stored.name, "Renamed");
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let store = ClientStore::in_memory();
        let designs = store.designs();
        designs.save(&design("a", None, 1)).await.unwrap();
        designs.save(&design("b", None, 2)).await.unwrap();

        assert!(designs.delete(&DesignId::new("a")).await.unwrap());
        assert!(!designs.delete(&DesignId::new("a")).await.unwrap());
        assert!(designs.get(&DesignId::new("a")).await.unwrap().is_none());

        assert_eq!(designs.clear().await.unwrap(), 1);
        assert!(designs.list(None).await.unwrap().is_empty());
    }
}
