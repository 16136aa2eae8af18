//! The `user` partition: a single current-user record.

use kickforge_core::User;
use tracing::instrument;

use super::{ClientStore, Partition, StorageError, now_millis};

/// The only key the user partition ever holds.
const CURRENT_SLOT: &str = "current";

/// Access to the stored current user.
pub struct UserPartition<'a> {
    store: &'a ClientStore,
}

impl<'a> UserPartition<'a> {
    pub(super) const fn new(store: &'a ClientStore) -> Self {
        Self { store }
    }

    /// Overwrite the stored user and return the stored value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn save(&self, user: &User) -> Result<User, StorageError> {
        let value = serde_json::to_string(user)?;
        sqlx::query(
            r"
            INSERT INTO user_record (slot, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (slot) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            ",
        )
        .bind(CURRENT_SLOT)
        .bind(&value)
        .bind(now_millis())
        .execute(self.store.pool().await?)
        .await?;

        self.store.notify(Partition::User, Some(CURRENT_SLOT));
        Ok(user.clone())
    }

    /// Get the stored user, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::DataCorruption` if the stored record cannot be
    /// decoded.
    pub async fn get(&self) -> Result<Option<User>, StorageError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM user_record WHERE slot = ?1")
            .bind(CURRENT_SLOT)
            .fetch_optional(self.store.pool().await?)
            .await?;

        row.map(|(value,)| serde_json::from_str(&value).map_err(StorageError::from))
            .transpose()
    }

    /// Remove the stored user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the delete fails.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM user_record WHERE slot = ?1")
            .bind(CURRENT_SLOT)
            .execute(self.store.pool().await?)
            .await?;

        self.store.notify(Partition::User, Some(CURRENT_SLOT));
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use kickforge_core::{Email, UserId};

    use super::*;

    fn user(name: &str) -> User {
        User {
            id: UserId::new("65f1c0ffee"),
            name: name.to_owned(),
            email: Email::parse("asha@kickforge.in").unwrap(),
            profile_image_url: Some("https://cdn.kickforge.in/u/65f1.png".to_owned()),
            phone: None,
            verified: true,
        }
    }

    #[tokio::test]
    async fn test_save_then_get_roundtrip() {
        let store = ClientStore::in_memory();
        let saved = store.users().save(&user("Asha")).await.unwrap();
        assert_eq!(saved, user("Asha"));
        assert_eq!(store.users().get().await.unwrap(), Some(user("Asha")));
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let store = ClientStore::in_memory();
        store.users().save(&user("Asha")).await.unwrap();
        store.users().save(&user("Asha Rao")).await.unwrap();
        assert_eq!(store.users().get().await.unwrap().unwrap().name, "Asha Rao");
    }

    #[tokio::test]
    async fn test_clear_then_get_is_none() {
        let store = ClientStore::in_memory();
        assert_eq!(store.users().get().await.unwrap(), None);
        store.users().save(&user("Asha")).await.unwrap();
        store.users().clear().await.unwrap();
        assert_eq!(store.users().get().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_corrupt_record_is_reported() {
        let store = ClientStore::in_memory();
        sqlx::query("INSERT INTO user_record (slot, value, updated_at) VALUES ('current', '{', 0)")
            .execute(store.pool().await.unwrap())
            .await
            .unwrap();
        assert!(matches!(
            store.users().get().await,
            Err(StorageError::DataCorruption(_))
        ));
    }

    #[tokio::test]
    async fn test_writes_are_announced() {
        let store = ClientStore::in_memory();
        let mut changes = store.subscribe();
        store.users().save(&user("Asha")).await.unwrap();
        let change = changes.recv().await.unwrap();
        assert_eq!(change.partition, Partition::User);
    }
}
