//! Object store accessor
//!
//! Typed reads and writes of object records, replica lists and owner
//! records over three key-value namespaces.
//!
//! Listing hides pagination. [`ObjectStore::list`] returns a lazy stream that
//! follows the cursor chain page by page. Within a page, value fetches fan
//! out up to `fetch_concurrency` at a time.
//!
//! # Consistency
//!
//! The backing store is eventually consistent and cursors are taken against
//! a moving target. A record modified during a scan may be yielded twice,
//! and a record deleted during a scan may or may not be yielded. The
//! accessor does not compensate. Callers that count must deduplicate by key
//! (see [`ListedObject::key`]), never by position in the stream.

use crate::lifecycle::ReplicaSet;
use crate::metrics::recorder;
use crate::record::{ObjectPatch, ObjectRecord, ReplicaRecord};
use crate::store::error::{StoreError, StoreResult};
use crate::store::kv::{KvStore, ListRequest, DEFAULT_PAGE_SIZE};
use crate::store::memory::MemoryKv;
use crate::store::sqlite::SqliteKv;
use chrono::{DateTime, Utc};
use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::fmt;
use std::sync::Arc;

pub const DEFAULT_FETCH_CONCURRENCY: usize = 16;

const KEY_SEPARATOR: char = ':';

/// The three namespaces the service reads and writes.
#[derive(Clone)]
pub struct Stores {
    /// Object records keyed by `owner:object_id`.
    pub objects: Arc<dyn KvStore>,
    /// Replica lists keyed by bare `object_id`.
    pub replicas: Arc<dyn KvStore>,
    /// Owner records keyed by owner id.
    pub users: Arc<dyn KvStore>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            objects: Arc::new(MemoryKv::new()),
            replicas: Arc::new(MemoryKv::new()),
            users: Arc::new(MemoryKv::new()),
        }
    }

    pub fn sqlite(pool: SqlitePool) -> Self {
        Self {
            objects: Arc::new(SqliteKv::new(pool.clone(), "objects")),
            replicas: Arc::new(SqliteKv::new(pool.clone(), "replicas")),
            users: Arc::new(SqliteKv::new(pool, "users")),
        }
    }
}

/// Paging and fan-out limits for scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanConfig {
    pub page_size: usize,
    pub fetch_concurrency: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
        }
    }
}

/// Per-owner key of an object record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    pub owner: String,
    pub object_id: String,
}

impl ObjectKey {
    pub fn new(owner: impl Into<String>, object_id: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            object_id: object_id.into(),
        }
    }

    /// Prefix selecting every object of one owner.
    pub fn owner_prefix(owner: &str) -> String {
        format!("{owner}{KEY_SEPARATOR}")
    }

    /// Owners may contain the separator; object ids never do. This keeps
    /// `owner:id` unambiguous, so one owner's prefix cannot reach into
    /// another owner whose id extends it.
    pub fn validate(&self) -> StoreResult<()> {
        if self.owner.is_empty() {
            return Err(StoreError::InvalidKey("owner is empty".into()));
        }
        if self.object_id.is_empty() {
            return Err(StoreError::InvalidKey("object id is empty".into()));
        }
        if self.object_id.contains(KEY_SEPARATOR) {
            return Err(StoreError::InvalidKey(format!(
                "object id {:?} contains '{KEY_SEPARATOR}'",
                self.object_id
            )));
        }
        Ok(())
    }

    /// Whether `encoded` is a key of exactly this owner's namespace.
    fn belongs_to(owner_prefix: &str, encoded: &str) -> bool {
        encoded
            .strip_prefix(owner_prefix)
            .is_some_and(|id| !id.is_empty() && !id.contains(KEY_SEPARATOR))
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{KEY_SEPARATOR}{}", self.owner, self.object_id)
    }
}

/// An object record together with the raw key it was listed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedObject {
    pub key: String,
    pub record: ObjectRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OwnerRecord {
    pub sub: String,
    pub created: DateTime<Utc>,
}

/// Lazily page through every key under `prefix`.
///
/// Each item is one page of keys. The next page is requested only once the
/// previous page's cursor is known, and only when the consumer polls for it.
pub fn list_keys(
    kv: Arc<dyn KvStore>,
    prefix: String,
    page_size: usize,
) -> impl Stream<Item = StoreResult<Vec<String>>> + Send + 'static {
    // State: `None` once done, otherwise the cursor to resume from.
    stream::try_unfold(Some(None::<String>), move |state| {
        let kv = kv.clone();
        let prefix = prefix.clone();
        async move {
            match state {
                None => Ok(None),
                Some(cursor) => fetch_page(kv, prefix, page_size, cursor).await.map(Some),
            }
        }
    })
}

async fn fetch_page(
    kv: Arc<dyn KvStore>,
    prefix: String,
    page_size: usize,
    cursor: Option<String>,
) -> StoreResult<(Vec<String>, Option<Option<String>>)> {
    let page = kv
        .list(ListRequest::new(prefix.clone(), page_size).after(cursor))
        .await?;
    tracing::debug!(
        prefix = %prefix,
        keys = page.keys.len(),
        complete = page.complete,
        "Fetched key page"
    );

    let next = match (page.complete, page.cursor) {
        (false, Some(cursor)) => Some(Some(cursor)),
        (false, None) => {
            tracing::warn!(prefix = %prefix, "Incomplete page without cursor, ending scan");
            None
        }
        (true, _) => None,
    };
    Ok((page.keys, next))
}

async fn fetch_listed(kv: Arc<dyn KvStore>, key: String) -> StoreResult<Option<ListedObject>> {
    let Some(value) = kv.get(&key).await? else {
        // Deleted between list and get.
        tracing::debug!(key = %key, "Listed key no longer present");
        return Ok(None);
    };

    match serde_json::from_str::<ObjectRecord>(&value) {
        Ok(record) => Ok(Some(ListedObject { key, record })),
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Skipping malformed object record");
            recorder::record_malformed("object");
            Ok(None)
        }
    }
}

/// Typed access to object records, replica lists and owners.
#[derive(Clone)]
pub struct ObjectStore {
    stores: Stores,
    scan: ScanConfig,
}

impl ObjectStore {
    pub fn new(stores: Stores, scan: ScanConfig) -> Self {
        Self { stores, scan }
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    pub fn scan_config(&self) -> ScanConfig {
        self.scan
    }

    /// Load one object record.
    pub async fn get(&self, key: &ObjectKey) -> StoreResult<Option<ObjectRecord>> {
        key.validate()?;
        match self.stores.objects.get(&key.to_string()).await? {
            Some(value) => Ok(Some(serde_json::from_str(&value)?)),
            None => Ok(None),
        }
    }

    /// Merge `patch` into the stored record (or create it) and return the
    /// record as written. Single-key, last write wins.
    pub async fn put(&self, key: &ObjectKey, patch: &ObjectPatch) -> StoreResult<ObjectRecord> {
        key.validate()?;
        let record = match self.get(key).await? {
            Some(mut existing) => {
                existing.apply(patch);
                existing
            }
            None => ObjectRecord::from_patch(&key.owner, &key.object_id, patch)?,
        };

        let value = serde_json::to_string(&record)?;
        self.stores.objects.put(&key.to_string(), &value).await?;
        Ok(record)
    }

    /// Remove the owner's record. Replica lists are shared across owners and
    /// are left in place.
    pub async fn delete(&self, key: &ObjectKey) -> StoreResult<()> {
        key.validate()?;
        self.stores.objects.delete(&key.to_string()).await
    }

    /// Stream every object record whose key starts with `prefix`.
    ///
    /// Keys that vanish between listing and fetching are skipped, as are
    /// values that fail to parse (logged and counted). A failing store call
    /// ends the stream with that error. See the module docs for the
    /// consistency caveats.
    pub fn list_entries(
        &self,
        prefix: &str,
    ) -> impl Stream<Item = StoreResult<ListedObject>> + Send + 'static {
        let objects = self.stores.objects.clone();
        let concurrency = self.scan.fetch_concurrency.max(1);

        list_keys(objects.clone(), prefix.to_string(), self.scan.page_size)
            .map_ok(move |keys| {
                let objects = objects.clone();
                stream::iter(keys)
                    .map(move |key| fetch_listed(objects.clone(), key))
                    .buffered(concurrency)
            })
            .try_flatten()
            .try_filter_map(|listed| futures::future::ready(Ok(listed)))
    }

    pub fn list(&self, prefix: &str) -> impl Stream<Item = StoreResult<ObjectRecord>> + Send + 'static {
        self.list_entries(prefix).map_ok(|listed| listed.record)
    }

    /// Stream one owner's records. Keys of owners whose id merely starts
    /// with `owner:` share the prefix and are filtered out.
    pub fn list_owner(
        &self,
        owner: &str,
    ) -> impl Stream<Item = StoreResult<ObjectRecord>> + Send + 'static {
        let prefix = ObjectKey::owner_prefix(owner);
        self.list_entries(&prefix)
            .try_filter(move |listed| {
                futures::future::ready(ObjectKey::belongs_to(&prefix, &listed.key))
            })
            .map_ok(|listed| listed.record)
    }

    /// Side lookup of an object's replicas.
    ///
    /// Elements that fail to parse are counted in [`ReplicaSet::malformed`];
    /// a value that is not a list at all counts as one malformed element.
    pub async fn replicas(&self, object_id: &str) -> StoreResult<ReplicaSet> {
        let Some(value) = self.stores.replicas.get(object_id).await? else {
            return Ok(ReplicaSet::default());
        };

        let elements = match serde_json::from_str::<Vec<serde_json::Value>>(&value) {
            Ok(elements) => elements,
            Err(e) => {
                tracing::warn!(object_id, error = %e, "Replica list is not an array");
                recorder::record_malformed("replica");
                return Ok(ReplicaSet {
                    records: Vec::new(),
                    malformed: 1,
                });
            }
        };

        let mut set = ReplicaSet::default();
        for element in elements {
            match serde_json::from_value::<ReplicaRecord>(element) {
                Ok(record) => set.records.push(record),
                Err(e) => {
                    tracing::warn!(object_id, error = %e, "Skipping malformed replica record");
                    recorder::record_malformed("replica");
                    set.malformed += 1;
                }
            }
        }
        Ok(set)
    }

    /// Replace an object's replica list.
    pub async fn put_replicas(&self, object_id: &str, replicas: &[ReplicaRecord]) -> StoreResult<()> {
        let value = serde_json::to_string(replicas)?;
        self.stores.replicas.put(object_id, &value).await
    }

    /// Record an owner the first time they are seen.
    ///
    /// Returns true only for the call that created the owner record.
    pub async fn ensure_owner(&self, owner: &str) -> StoreResult<bool> {
        if self.stores.users.get(owner).await?.is_some() {
            return Ok(false);
        }
        let record = OwnerRecord {
            sub: owner.to_string(),
            created: Utc::now(),
        };
        self.stores
            .users
            .put_if_absent(owner, &serde_json::to_string(&record)?)
            .await
    }

    /// Count owner keys. Keys repeated across pages are counted once.
    pub async fn count_owners(&self) -> StoreResult<u64> {
        let mut seen = std::collections::HashSet::new();
        let mut pages = Box::pin(list_keys(
            self.stores.users.clone(),
            String::new(),
            self.scan.page_size,
        ));
        while let Some(keys) = pages.try_next().await? {
            seen.extend(keys);
        }
        Ok(seen.len() as u64)
    }
}
