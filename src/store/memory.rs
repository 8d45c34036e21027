//! In-memory key-value store
//!
//! Ordered map behind a lock, paging by key order. Used by tests and by the
//! `memory` backend.

use crate::store::error::StoreResult;
use crate::store::kv::{KvStore, ListPage, ListRequest};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Bound;

#[derive(Default)]
pub struct MemoryKv {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> StoreResult<()> {
        self.entries
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    async fn put_if_absent(&self, key: &str, value: &str) -> StoreResult<bool> {
        let mut entries = self.entries.write();
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(true)
    }

    async fn list(&self, request: ListRequest) -> StoreResult<ListPage> {
        let limit = request.limit.max(1);
        let entries = self.entries.read();

        // The cursor is the last key handed out; resume strictly after it.
        let start = match &request.cursor {
            Some(cursor) => Bound::Excluded(cursor.clone()),
            None => Bound::Included(request.prefix.clone()),
        };

        let mut matching = entries
            .range((start, Bound::Unbounded))
            .map(|(k, _)| k)
            .skip_while(|k| k.as_str() < request.prefix.as_str())
            .take_while(|k| k.starts_with(&request.prefix));

        let keys: Vec<String> = matching.by_ref().take(limit).cloned().collect();
        let complete = matching.next().is_none();
        let cursor = if complete { None } else { keys.last().cloned() };

        Ok(ListPage {
            keys,
            cursor,
            complete,
        })
    }
}
