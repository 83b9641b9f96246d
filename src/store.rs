//! Local key-value persistence using RocksDB.
//!
//! The client is allowed to persist exactly three kinds of state across
//! reloads: the last vote the viewer cast per reply, "already reported"
//! markers per query, and the cached session (identity, token, redirect
//! flag). Everything else is a disposable projection of server state and
//! is never written here.
//!
//! ## Storage Layout
//!
//! Uses column families for logical separation:
//! - `votes`: `vote_reply_{reply_id}:{viewer_id}` -> serialized VoteKind
//! - `reports`: `reported_query_{query_id}:{viewer_id}` -> marker byte
//! - `session`: fixed keys (`currentUser`, `token`, `redirectAfterLogin`)
//!
//! Keys are string-composed from entity id and viewer id; there is no
//! schema versioning.

use crate::error::{KlqError, Result};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, MultiThreaded, Options,
};
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, trace};

/// Column family for per-(reply, viewer) vote state.
pub const CF_VOTES: &str = "votes";
/// Column family for per-(query, viewer) report markers.
pub const CF_REPORTS: &str = "reports";
/// Column family for the cached session.
pub const CF_SESSION: &str = "session";

const COLUMN_FAMILIES: &[&str] = &[CF_VOTES, CF_REPORTS, CF_SESSION];

/// Creates a composite key from an entity id and a viewer id.
///
/// Format: `{prefix}{entity_id}:{viewer_id}`
pub fn viewer_key(prefix: &str, entity_id: &str, viewer_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + entity_id.len() + 1 + viewer_id.len());
    key.extend_from_slice(prefix.as_bytes());
    key.extend_from_slice(entity_id.as_bytes());
    key.push(b':');
    key.extend_from_slice(viewer_id.as_bytes());
    key
}

/// Client-local key-value store.
///
/// A thin wrapper over RocksDB with fixed column families. Values are
/// bincode-serialized for typed entries; markers are raw bytes.
pub struct ClientStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
}

impl ClientStore {
    /// Opens (or creates) the store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_max_open_files(64);
        opts.set_keep_log_file_num(2);
        opts.increase_parallelism(num_cpus::get() as i32);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        let cf_opts = Options::default();
        let cf_descriptors: Vec<_> = COLUMN_FAMILIES
            .iter()
            .map(|cf| ColumnFamilyDescriptor::new(*cf, cf_opts.clone()))
            .collect();

        let db = DBWithThreadMode::<MultiThreaded>::open_cf_descriptors(
            &opts,
            path.as_ref(),
            cf_descriptors,
        )
        .map_err(|e| KlqError::storage(format!("Failed to open store: {}", e)))?;

        debug!(path = %path.as_ref().display(), "opened client store");

        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| KlqError::storage(format!("Column family '{}' not found", name)))
    }

    /// Stores a serializable value at the given key.
    pub fn put<T: Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        let bytes = bincode::serialize(value)
            .map_err(|e| KlqError::serialization(format!("Failed to serialize: {}", e)))?;

        trace!(cf = cf_name, key_len = key.len(), "store_put");

        self.db
            .put_cf(&cf, key, &bytes)
            .map_err(|e| KlqError::storage(format!("Failed to write: {}", e)))?;
        Ok(())
    }

    /// Stores raw bytes at the given key.
    pub fn put_raw(&self, cf_name: &str, key: &[u8], value: &[u8]) -> Result<()> {
        let cf = self.cf(cf_name)?;
        self.db
            .put_cf(&cf, key, value)
            .map_err(|e| KlqError::storage(format!("Failed to write: {}", e)))?;
        Ok(())
    }

    /// Loads and deserializes a value from the given key.
    pub fn get<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_cf(&cf, key) {
            Ok(Some(bytes)) => {
                let value: T = bincode::deserialize(&bytes).map_err(|e| {
                    KlqError::serialization(format!("Failed to deserialize: {}", e))
                })?;
                Ok(Some(value))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(KlqError::storage(format!("Failed to read: {}", e))),
        }
    }

    /// Loads raw bytes from the given key.
    pub fn get_raw(&self, cf_name: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let cf = self.cf(cf_name)?;
        self.db
            .get_cf(&cf, key)
            .map_err(|e| KlqError::storage(format!("Failed to read: {}", e)))
    }

    /// Checks if a key exists.
    pub fn exists(&self, cf_name: &str, key: &[u8]) -> Result<bool> {
        Ok(self.get_raw(cf_name, key)?.is_some())
    }

    /// Deletes a key. Deleting an absent key is not an error.
    pub fn delete(&self, cf_name: &str, key: &[u8]) -> Result<()> {
        let cf = self.cf(cf_name)?;
        self.db
            .delete_cf(&cf, key)
            .map_err(|e| KlqError::storage(format!("Failed to delete: {}", e)))?;
        Ok(())
    }
}

impl std::fmt::Debug for ClientStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientStore").field("db", &"RocksDB").finish()
    }
}
