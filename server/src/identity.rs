//! Identity records: who may log in, by key or by name.
//!
//! Uniqueness of `public_key` and `username` is a `UNIQUE` constraint in the
//! table. Writers never check-then-insert; they insert and map the
//! constraint violation to [`StoreError::Conflict`].

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use thiserror::Error;

use crate::challenge::unix_now;

#[derive(Clone)]
pub struct IdentityRecord {
    pub id: i64,
    /// Lowercase hex x-only key.
    pub public_key: Option<String>,
    pub username: Option<String>,
    /// Argon2id PHC string.
    pub secret_hash: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl fmt::Debug for IdentityRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityRecord")
            .field("id", &self.id)
            .field("public_key", &self.public_key)
            .field("username", &self.username)
            .field("secret_hash", &"<redacted>")
            .finish()
    }
}

#[derive(Clone)]
pub struct NewIdentity {
    pub public_key: Option<String>,
    pub username: Option<String>,
    pub secret_hash: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    PublicKey,
    Username,
}

impl fmt::Display for UniqueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UniqueField::PublicKey => f.write_str("public key"),
            UniqueField::Username => f.write_str("username"),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} already registered")]
    Conflict(UniqueField),

    #[error("identity not found")]
    NotFound,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Lookup and write access to identity records.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_by_public_key(
        &self,
        public_key: &str,
    ) -> Result<Option<IdentityRecord>, StoreError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<IdentityRecord>, StoreError>;

    /// Insert a record. Fails with `Conflict` if either key is taken.
    async fn insert(&self, identity: NewIdentity) -> Result<IdentityRecord, StoreError>;

    /// Set the username and secret of an existing record.
    async fn update_credentials(
        &self,
        id: i64,
        username: &str,
        secret_hash: &str,
    ) -> Result<IdentityRecord, StoreError>;

    /// Returns whether a record was removed.
    async fn delete_by_public_key(&self, public_key: &str) -> Result<bool, StoreError>;
}

pub struct SqliteIdentityStore {
    pool: SqlitePool,
}

impl SqliteIdentityStore {
    /// Open (or create) the database at `url` and ensure the schema exists.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let in_memory = url.contains(":memory:");

        // Every connection to an in-memory database sees its own empty
        // database, so pin the pool to a single long-lived connection.
        let pool = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(8)
                .connect_with(options)
                .await?
        };

        Self::new(pool).await
    }

    pub async fn new(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS identities (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                public_key TEXT UNIQUE,
                username TEXT UNIQUE,
                secret_hash TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<IdentityRecord>, StoreError> {
        let row = sqlx::query(SELECT_BY_ID)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(record_from_row).transpose()
    }
}

const SELECT_BY_ID: &str = "SELECT id, public_key, username, secret_hash, created_at, \
     updated_at FROM identities WHERE id = ?";
const SELECT_BY_PUBLIC_KEY: &str = "SELECT id, public_key, username, secret_hash, created_at, \
     updated_at FROM identities WHERE public_key = ?";
const SELECT_BY_USERNAME: &str = "SELECT id, public_key, username, secret_hash, created_at, \
     updated_at FROM identities WHERE username = ?";

#[async_trait]
impl IdentityStore for SqliteIdentityStore {
    async fn find_by_public_key(
        &self,
        public_key: &str,
    ) -> Result<Option<IdentityRecord>, StoreError> {
        let row = sqlx::query(SELECT_BY_PUBLIC_KEY)
            .bind(public_key)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(record_from_row).transpose()
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<IdentityRecord>, StoreError> {
        let row = sqlx::query(SELECT_BY_USERNAME)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(record_from_row).transpose()
    }

    async fn insert(&self, identity: NewIdentity) -> Result<IdentityRecord, StoreError> {
        let now = unix_now();
        let result = sqlx::query(
            r#"
            INSERT INTO identities (public_key, username, secret_hash, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&identity.public_key)
        .bind(&identity.username)
        .bind(&identity.secret_hash)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        self.find_by_id(result.last_insert_rowid())
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn update_credentials(
        &self,
        id: i64,
        username: &str,
        secret_hash: &str,
    ) -> Result<IdentityRecord, StoreError> {
        let result = sqlx::query(
            "UPDATE identities SET username = ?, secret_hash = ?, updated_at = ? WHERE id = ?",
        )
        .bind(username)
        .bind(secret_hash)
        .bind(unix_now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        self.find_by_id(id).await?.ok_or(StoreError::NotFound)
    }

    async fn delete_by_public_key(&self, public_key: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM identities WHERE public_key = ?")
            .bind(public_key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn record_from_row(row: &SqliteRow) -> Result<IdentityRecord, StoreError> {
    Ok(IdentityRecord {
        id: row.try_get("id")?,
        public_key: row.try_get("public_key")?,
        username: row.try_get("username")?,
        secret_hash: row.try_get("secret_hash")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// SQLite reports `UNIQUE constraint failed: identities.<column>`.
fn map_unique_violation(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let field = if db_err.message().contains("identities.username") {
                UniqueField::Username
            } else {
                UniqueField::PublicKey
            };
            return StoreError::Conflict(field);
        }
    }
    StoreError::Database(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const PK: &str = "f9308a019258c31049344f85f89d5229b531c845836f99b08601f113bce036f9";

    async fn store() -> SqliteIdentityStore {
        SqliteIdentityStore::connect("sqlite::memory:").await.unwrap()
    }

    fn by_key(pk: &str) -> NewIdentity {
        NewIdentity {
            public_key: Some(pk.into()),
            username: None,
            secret_hash: "hash".into(),
        }
    }

    fn by_name(name: &str) -> NewIdentity {
        NewIdentity {
            public_key: None,
            username: Some(name.into()),
            secret_hash: "hash".into(),
        }
    }

    #[tokio::test]
    async fn insert_and_lookup() {
        let store = store().await;
        let rec = store.insert(by_key(PK)).await.unwrap();
        assert_eq!(rec.public_key.as_deref(), Some(PK));
        assert!(rec.username.is_none());

        let found = store.find_by_public_key(PK).await.unwrap().unwrap();
        assert_eq!(found.id, rec.id);
        assert!(store.find_by_username("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_public_key_conflicts() {
        let store = store().await;
        store.insert(by_key(PK)).await.unwrap();
        let err = store.insert(by_key(PK)).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(UniqueField::PublicKey)));
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let store = store().await;
        store.insert(by_name("alice")).await.unwrap();
        let err = store.insert(by_name("alice")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(UniqueField::Username)));
    }

    #[tokio::test]
    async fn many_records_without_username_coexist() {
        let store = store().await;
        store.insert(by_key(PK)).await.unwrap();
        store
            .insert(by_key("79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn concurrent_registration_has_one_winner() {
        let store = Arc::new(store().await);
        let a = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.insert(by_key(PK)).await })
        };
        let b = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.insert(by_key(PK)).await })
        };
        let results = [a.await.unwrap(), b.await.unwrap()];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(StoreError::Conflict(UniqueField::PublicKey)))));
    }

    #[tokio::test]
    async fn update_credentials_sets_username() {
        let store = store().await;
        let rec = store.insert(by_key(PK)).await.unwrap();
        let updated = store.update_credentials(rec.id, "alice", "newhash").await.unwrap();
        assert_eq!(updated.username.as_deref(), Some("alice"));
        assert_eq!(updated.secret_hash, "newhash");
        assert_eq!(
            store.find_by_username("alice").await.unwrap().unwrap().id,
            rec.id
        );
    }

    #[tokio::test]
    async fn update_credentials_respects_username_uniqueness() {
        let store = store().await;
        store.insert(by_name("alice")).await.unwrap();
        let rec = store.insert(by_key(PK)).await.unwrap();
        let err = store.update_credentials(rec.id, "alice", "h").await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(UniqueField::Username)));
    }

    #[tokio::test]
    async fn update_missing_record_is_not_found() {
        let store = store().await;
        let err = store.update_credentials(42, "alice", "h").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn delete_by_public_key() {
        let store = store().await;
        store.insert(by_key(PK)).await.unwrap();
        assert!(store.delete_by_public_key(PK).await.unwrap());
        assert!(!store.delete_by_public_key(PK).await.unwrap());
        assert!(store.find_by_public_key(PK).await.unwrap().is_none());
    }

    #[test]
    fn debug_redacts_secret_hash() {
        let rec = IdentityRecord {
            id: 1,
            public_key: None,
            username: Some("alice".into()),
            secret_hash: "$argon2id$secret".into(),
            created_at: 0,
            updated_at: 0,
        };
        let shown = format!("{rec:?}");
        assert!(!shown.contains("argon2id"));
        assert!(shown.contains("<redacted>"));
    }
}
