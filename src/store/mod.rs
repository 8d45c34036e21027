//! Storage layer
//!
//! The key-value collaborator interface, its in-memory and SQLite backends,
//! and the typed object store accessor built on top of them.

pub mod accessor;
pub mod error;
pub mod kv;
pub mod memory;
pub mod sqlite;

pub use accessor::{
    list_keys, ListedObject, ObjectKey, ObjectStore, OwnerRecord, ScanConfig, Stores,
    DEFAULT_FETCH_CONCURRENCY,
};
pub use error::{StoreError, StoreResult};
pub use kv::{KvStore, ListPage, ListRequest, DEFAULT_PAGE_SIZE};
pub use memory::MemoryKv;
pub use sqlite::SqliteKv;
