//! Key-value store interface
//!
//! The backing store lists keys by prefix in bounded pages. Each page hands
//! back an opaque cursor for the next one. The store is only eventually
//! consistent: a key modified during a scan can show up on more than one
//! page, and a key deleted during a scan may or may not show up at all.

use crate::store::error::StoreResult;
use async_trait::async_trait;

pub const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRequest {
    pub prefix: String,
    pub cursor: Option<String>,
    pub limit: usize,
}

impl ListRequest {
    pub fn new(prefix: impl Into<String>, limit: usize) -> Self {
        Self {
            prefix: prefix.into(),
            cursor: None,
            limit,
        }
    }

    pub fn after(mut self, cursor: Option<String>) -> Self {
        self.cursor = cursor;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub keys: Vec<String>,
    /// Opaque continuation token; `None` once the listing is complete.
    pub cursor: Option<String>,
    pub complete: bool,
}

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    async fn put(&self, key: &str, value: &str) -> StoreResult<()>;

    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Write `value` only when `key` is absent. Returns whether it was written.
    ///
    /// The fallback is a read followed by a write; backends that can insert
    /// atomically override it.
    async fn put_if_absent(&self, key: &str, value: &str) -> StoreResult<bool> {
        if self.get(key).await?.is_some() {
            return Ok(false);
        }
        self.put(key, value).await?;
        Ok(true)
    }

    async fn list(&self, request: ListRequest) -> StoreResult<ListPage>;
}
