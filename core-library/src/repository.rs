//! Title index repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::CacheEntry;
use async_trait::async_trait;
use sqlx::{query, query_as, SqlitePool};
use tracing::debug;

/// Title index interface for data access operations
#[async_trait]
pub trait TitleIndexRepository: Send + Sync {
    /// All entries in id order.
    async fn find_all(&self) -> Result<Vec<CacheEntry>>;

    /// Find an entry by its source page id
    ///
    /// # Returns
    /// - `Ok(Some(entry))` if found
    /// - `Ok(None)` if not found
    async fn find_by_id(&self, id: i64) -> Result<Option<CacheEntry>>;

    /// Insert or replace an entry keyed by id
    ///
    /// # Errors
    /// Returns error if validation fails or a database error occurs
    async fn insert(&self, entry: &CacheEntry) -> Result<()>;

    /// Insert or replace many entries in one transaction.
    ///
    /// Returns the number of rows written.
    async fn insert_many(&self, entries: &[CacheEntry]) -> Result<u64>;

    /// Delete an entry by id
    ///
    /// # Returns
    /// - `Ok(true)` if the entry was deleted
    /// - `Ok(false)` if it was not found
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Remove every entry, returning how many were removed.
    async fn delete_all(&self) -> Result<u64>;

    async fn count(&self) -> Result<i64>;
}

/// SQLite implementation of TitleIndexRepository
pub struct SqliteTitleIndexRepository {
    pool: SqlitePool,
}

impl SqliteTitleIndexRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const UPSERT: &str = r#"
    INSERT INTO wikipages (id, title, pinyin_full, pinyin_first)
    VALUES (?, ?, ?, ?)
    ON CONFLICT(id) DO UPDATE SET
        title = excluded.title,
        pinyin_full = excluded.pinyin_full,
        pinyin_first = excluded.pinyin_first
"#;

fn validated(entry: &CacheEntry) -> Result<()> {
    entry.validate().map_err(|e| LibraryError::InvalidInput {
        field: "CacheEntry".to_string(),
        message: e,
    })
}

#[async_trait]
impl TitleIndexRepository for SqliteTitleIndexRepository {
    async fn find_all(&self) -> Result<Vec<CacheEntry>> {
        let entries = query_as::<_, CacheEntry>(
            "SELECT id, title, pinyin_full, pinyin_first FROM wikipages ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<CacheEntry>> {
        let entry = query_as::<_, CacheEntry>(
            "SELECT id, title, pinyin_full, pinyin_first FROM wikipages WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    async fn insert(&self, entry: &CacheEntry) -> Result<()> {
        validated(entry)?;

        query(UPSERT)
            .bind(entry.id)
            .bind(&entry.title)
            .bind(&entry.pinyin_full)
            .bind(&entry.pinyin_initials)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn insert_many(&self, entries: &[CacheEntry]) -> Result<u64> {
        for entry in entries {
            validated(entry)?;
        }

        let mut tx = self.pool.begin().await?;
        let mut written = 0;
        for entry in entries {
            written += query(UPSERT)
                .bind(entry.id)
                .bind(&entry.title)
                .bind(&entry.pinyin_full)
                .bind(&entry.pinyin_initials)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }
        tx.commit().await?;

        debug!(rows = written, "Title index rows upserted");
        Ok(written)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = query("DELETE FROM wikipages WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_all(&self) -> Result<u64> {
        let result = query("DELETE FROM wikipages").execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = query_as("SELECT COUNT(*) as count FROM wikipages")
            .fetch_one(&self.pool)
            .await
            .map(|row: (i64,)| row.0)?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    async fn setup_repo() -> SqliteTitleIndexRepository {
        SqliteTitleIndexRepository::new(create_test_pool().await.unwrap())
    }

    #[tokio::test]
    async fn test_insert_and_find_entry() {
        let repo = setup_repo().await;
        repo.insert(&CacheEntry::new(1, "水藻箱")).await.unwrap();

        let found = repo.find_by_id(1).await.unwrap().unwrap();
        assert_eq!(found.title, "水藻箱");
        assert_eq!(found.pinyin_full, "shuizaoxiang");
        assert_eq!(found.pinyin_initials, "szx");
        assert!(repo.find_by_id(2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_replaces_existing_id() {
        let repo = setup_repo().await;
        repo.insert(&CacheEntry::new(7, "Old")).await.unwrap();
        repo.insert(&CacheEntry::new(7, "电解水箱")).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 1);
        let found = repo.find_by_id(7).await.unwrap().unwrap();
        assert_eq!(found.title, "电解水箱");
    }

    #[tokio::test]
    async fn test_find_all_is_id_ordered() {
        let repo = setup_repo().await;
        let written = repo
            .insert_many(&[
                CacheEntry::new(3, "C"),
                CacheEntry::new(1, "A"),
                CacheEntry::new(2, "B"),
            ])
            .await
            .unwrap();
        assert_eq!(written, 3);

        let ids: Vec<i64> = repo.find_all().await.unwrap().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_insert_many_rejects_invalid_batch() {
        let repo = setup_repo().await;
        let result = repo
            .insert_many(&[CacheEntry::new(1, "A"), CacheEntry::new(2, "")])
            .await;

        assert!(matches!(result, Err(LibraryError::InvalidInput { .. })));
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_and_delete_all() {
        let repo = setup_repo().await;
        repo.insert_many(&[CacheEntry::new(1, "A"), CacheEntry::new(2, "B")])
            .await
            .unwrap();

        assert!(repo.delete(1).await.unwrap());
        assert!(!repo.delete(1).await.unwrap());
        assert_eq!(repo.delete_all().await.unwrap(), 1);
        assert_eq!(repo.count().await.unwrap(), 0);
    }
}
