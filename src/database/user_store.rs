//! User Storage
//!
//! The auth flows only ever need three things from account storage: look a
//! user up by username, look a user up by id, and create a user. [`UserStore`]
//! captures exactly that. [`PgUserStore`] is the production backend;
//! [`MemoryUserStore`] serves deployments without a database and the tests.

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::{DashMap, mapref::entry::Entry};
use tokio_postgres::error::SqlState;
use uuid::Uuid;

use crate::database::connection::DatabaseConnection;
use crate::database::models::{FromRow, NewUser, User};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("username is already taken")]
    UsernameTaken,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;

    /// Insert a user. Fails with [`StoreError::UsernameTaken`] if the username
    /// exists, even when another request won the race after a lookup.
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError>;
}

/// Postgres-backed user store
#[derive(Debug, Clone)]
pub struct PgUserStore {
    db: DatabaseConnection,
}

impl PgUserStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let client = self.db.pool().get().await.context("Failed to get DB connection")?;
        let row = client
            .query_opt(
                "SELECT id, username, password_hash, nickname, created_at \
                 FROM users WHERE username = $1",
                &[&username],
            )
            .await
            .context("Failed to query user by username")?;
        row.map(|r| User::from_row(&r))
            .transpose()
            .context("Failed to decode user row")
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let client = self.db.pool().get().await.context("Failed to get DB connection")?;
        let row = client
            .query_opt(
                "SELECT id, username, password_hash, nickname, created_at \
                 FROM users WHERE id = $1",
                &[&id],
            )
            .await
            .context("Failed to query user by id")?;
        row.map(|r| User::from_row(&r))
            .transpose()
            .context("Failed to decode user row")
    }

    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        let client = self.db.pool().get().await.context("Failed to get DB connection")?;
        let id = Uuid::new_v4();
        let row = client
            .query_one(
                "INSERT INTO users (id, username, password_hash, nickname) \
                 VALUES ($1, $2, $3, $4) \
                 RETURNING id, username, password_hash, nickname, created_at",
                &[
                    &id,
                    &new_user.username,
                    &new_user.password_hash,
                    &new_user.nickname,
                ],
            )
            .await
            .map_err(|e| {
                if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
                    StoreError::UsernameTaken
                } else {
                    StoreError::Backend(anyhow::Error::new(e).context("Failed to insert user"))
                }
            })?;

        let user = User::from_row(&row).context("Failed to decode inserted user")?;
        tracing::info!("Created user {} ({})", user.username, user.id);
        Ok(user)
    }
}

/// In-process user store keyed by username with an id index
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    by_username: DashMap<String, User>,
    username_by_id: DashMap<Uuid, String>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn remove(&self, id: Uuid) -> Option<User> {
        let (_, username) = self.username_by_id.remove(&id)?;
        self.by_username.remove(&username).map(|(_, user)| user)
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        Ok(self.by_username.get(username).map(|entry| entry.clone()))
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let Some(username) = self.username_by_id.get(&id).map(|entry| entry.clone()) else {
            return Ok(None);
        };
        Ok(self.by_username.get(&username).map(|entry| entry.clone()))
    }

    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        match self.by_username.entry(new_user.username.clone()) {
            Entry::Occupied(_) => Err(StoreError::UsernameTaken),
            Entry::Vacant(slot) => {
                let user = User {
                    id: Uuid::new_v4(),
                    username: new_user.username,
                    password_hash: new_user.password_hash,
                    nickname: new_user.nickname,
                    created_at: Utc::now(),
                };
                slot.insert(user.clone());
                self.username_by_id.insert(user.id, user.username.clone());
                Ok(user)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn new_user(username: &str, nickname: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            password_hash: "hash".to_string(),
            nickname: nickname.to_string(),
        }
    }

    #[tokio::test]
    async fn created_user_is_found_by_username_and_id() {
        let store = MemoryUserStore::new();
        let user = store.create(new_user("u1", "n1")).await.unwrap();

        let by_name = store.find_by_username("u1").await.unwrap().unwrap();
        let by_id = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(by_name, user);
        assert_eq!(by_id, user);
    }

    #[tokio::test]
    async fn unknown_lookups_return_none() {
        let store = MemoryUserStore::new();
        assert!(store.find_by_username("nobody").await.unwrap().is_none());
        assert!(store.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected_and_original_kept() {
        let store = MemoryUserStore::new();
        let original = store.create(new_user("u1", "n1")).await.unwrap();

        let err = store.create(new_user("u1", "n2")).await.unwrap_err();
        assert!(matches!(err, StoreError::UsernameTaken));

        let kept = store.find_by_username("u1").await.unwrap().unwrap();
        assert_eq!(kept.id, original.id);
        assert_eq!(kept.nickname, "n1");
    }

    #[tokio::test]
    async fn concurrent_creates_admit_exactly_one() {
        let store = Arc::new(MemoryUserStore::new());
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.create(new_user("race", &format!("n{i}"))).await })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
    }

    #[tokio::test]
    async fn removed_user_is_gone_from_both_indexes() {
        let store = MemoryUserStore::new();
        let user = store.create(new_user("u1", "n1")).await.unwrap();

        assert!(store.remove(user.id).is_some());
        assert!(store.find_by_id(user.id).await.unwrap().is_none());
        assert!(store.find_by_username("u1").await.unwrap().is_none());
    }
}
