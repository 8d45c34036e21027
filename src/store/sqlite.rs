use crate::store::error::StoreResult;
use crate::store::kv::{KvStore, ListPage, ListRequest};
use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};

/// SQLite-backed key-value namespace.
///
/// Several namespaces share one pool and one table; each `SqliteKv` only
/// sees the rows of its own namespace.
#[derive(Clone)]
pub struct SqliteKv {
    pool: SqlitePool,
    namespace: String,
}

impl SqliteKv {
    /// Connect and make sure the schema exists.
    pub async fn connect(db_url: &str) -> StoreResult<SqlitePool> {
        let pool = SqlitePool::connect(db_url).await?;
        Self::init_schema(&pool).await?;
        Ok(pool)
    }

    /// In-memory database (for testing). Pinned to one long-lived connection
    /// so every namespace sees the same database.
    pub async fn connect_in_memory() -> StoreResult<SqlitePool> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::init_schema(&pool).await?;
        Ok(pool)
    }

    async fn init_schema(pool: &SqlitePool) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                namespace TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (namespace, key)
            )
            "#,
        )
        .execute(pool)
        .await?;
        Ok(())
    }

    pub fn new(pool: SqlitePool, namespace: impl Into<String>) -> Self {
        Self {
            pool,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub async fn count(&self) -> StoreResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM kv WHERE namespace = ?")
            .bind(&self.namespace)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("count")?)
    }
}

#[async_trait]
impl KvStore for SqliteKv {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let row = sqlx::query("SELECT value FROM kv WHERE namespace = ? AND key = ?")
            .bind(&self.namespace)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(row.try_get("value")?)),
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: &str) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO kv (namespace, key, value, updated_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&self.namespace)
        .bind(key)
        .bind(value)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM kv WHERE namespace = ? AND key = ?")
            .bind(&self.namespace)
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn put_if_absent(&self, key: &str, value: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO kv (namespace, key, value, updated_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&self.namespace)
        .bind(key)
        .bind(value)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn list(&self, request: ListRequest) -> StoreResult<ListPage> {
        let limit = request.limit.max(1);
        // Fetch one extra row to learn whether another page exists.
        let rows = sqlx::query(
            r#"
            SELECT key FROM kv
            WHERE namespace = ?
              AND substr(key, 1, length(?)) = ?
              AND key > ?
            ORDER BY key
            LIMIT ?
            "#,
        )
        .bind(&self.namespace)
        .bind(&request.prefix)
        .bind(&request.prefix)
        .bind(request.cursor.as_deref().unwrap_or(""))
        .bind((limit + 1) as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut keys = Vec::with_capacity(rows.len());
        for row in rows {
            keys.push(row.try_get::<String, _>("key")?);
        }

        let complete = keys.len() <= limit;
        keys.truncate(limit);
        let cursor = if complete { None } else { keys.last().cloned() };

        Ok(ListPage {
            keys,
            cursor,
            complete,
        })
    }
}
