//! In-memory resource store
//!
//! One read-write lock guards three indices:
//!
//! - `data`: storage ID → resource
//! - `id_index`: external ID → storage ID (the alias table)
//! - `path_index`: normalized path → storage IDs in insertion order
//!
//! A resource has one canonical storage ID and any number of external ID
//! aliases; bodies are never duplicated per alias. Every mutating operation
//! takes the write lock once, so readers never observe a resource that is
//! only partially indexed.

use crate::pattern::normalize_path;
use crate::{Error, Result};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// One stored artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// Internal opaque key; never exposed to clients
    pub storage_id: String,
    /// Normalized path the resource was stored under (no trailing slash)
    pub path: String,
    /// Every identifier a client may use to address this resource
    pub external_ids: Vec<String>,
    /// Canonical URI: `path + "/" + external_ids[0]`
    pub location: String,
    /// Declared content type of the body
    pub content_type: String,
    /// Raw body bytes, preserved verbatim
    pub body: Vec<u8>,
}

/// Resource fields supplied by the caller; indexing fields are assigned by
/// the store.
#[derive(Debug, Clone, Default)]
pub struct ResourceDraft {
    /// Request path the resource is stored under
    pub path: String,
    /// Declared content type
    pub content_type: String,
    /// Raw body bytes
    pub body: Vec<u8>,
}

#[derive(Debug, Default)]
struct StoreInner {
    data: HashMap<String, Resource>,
    id_index: HashMap<String, String>,
    path_index: HashMap<String, Vec<String>>,
    created_order: HashMap<String, u64>,
    next_seq: u64,
}

impl StoreInner {
    /// Storage IDs under `path` or any deeper path, in insertion order.
    fn storage_ids_under(&self, path: &str) -> Vec<String> {
        let prefix = format!("{path}/");
        let mut seen = HashSet::new();
        let mut ids: Vec<String> = self
            .path_index
            .iter()
            .filter(|(bucket, _)| bucket.as_str() == path || bucket.starts_with(&prefix))
            .flat_map(|(_, ids)| ids.iter())
            .filter(|id| seen.insert((*id).clone()))
            .cloned()
            .collect();
        ids.sort_by_key(|id| self.created_order.get(id).copied().unwrap_or(u64::MAX));
        ids
    }

    /// Drop one resource from every index.
    fn evict(&mut self, storage_id: &str) -> Result<Resource> {
        let resource = self.data.remove(storage_id).ok_or_else(|| {
            Error::storage(format!("id index points at missing resource {storage_id}"))
        })?;
        for external_id in &resource.external_ids {
            self.id_index.remove(external_id);
        }
        if let Some(bucket) = self.path_index.get_mut(&resource.path) {
            bucket.retain(|id| id != storage_id);
            if bucket.is_empty() {
                self.path_index.remove(&resource.path);
            }
        }
        self.created_order.remove(storage_id);
        Ok(resource)
    }
}

/// The concurrent multi-index store
#[derive(Debug, Default)]
pub struct MockStore {
    inner: RwLock<StoreInner>,
}

impl MockStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new resource under the given external IDs. An empty ID list
    /// mints a single fresh UUID. Fails with a conflict naming the first
    /// offending ID when any supplied ID is already taken.
    pub async fn create(&self, ids: Vec<String>, draft: ResourceDraft) -> Result<Resource> {
        let ids = if ids.is_empty() {
            vec![Uuid::new_v4().to_string()]
        } else {
            ids
        };

        let mut inner = self.inner.write().await;
        for id in &ids {
            if inner.id_index.contains_key(id) {
                return Err(Error::conflict(id.clone()));
            }
        }

        let storage_id = Uuid::new_v4().to_string();
        let path = normalize_path(&draft.path).to_string();
        let resource = Resource {
            storage_id: storage_id.clone(),
            location: format!("{path}/{}", ids[0]),
            path: path.clone(),
            external_ids: ids.clone(),
            content_type: draft.content_type,
            body: draft.body,
        };

        for id in &ids {
            inner.id_index.insert(id.clone(), storage_id.clone());
        }
        inner.path_index.entry(path).or_default().push(storage_id.clone());
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.created_order.insert(storage_id.clone(), seq);
        inner.data.insert(storage_id.clone(), resource.clone());

        debug!(storage_id = %storage_id, location = %resource.location, "resource created");
        Ok(resource)
    }

    /// Replace the body, content type, and path of the resource aliased by
    /// `id`. External IDs are preserved; the location follows the path.
    pub async fn update(&self, id: &str, draft: ResourceDraft) -> Result<Resource> {
        let mut inner = self.inner.write().await;
        let storage_id = inner
            .id_index
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found(id.to_string()))?;

        let new_path = normalize_path(&draft.path).to_string();
        let old_path = inner
            .data
            .get(&storage_id)
            .map(|r| r.path.clone())
            .ok_or_else(|| Error::storage(format!("id index points at missing resource {storage_id}")))?;

        if new_path != old_path {
            if let Some(bucket) = inner.path_index.get_mut(&old_path) {
                bucket.retain(|sid| sid != &storage_id);
                if bucket.is_empty() {
                    inner.path_index.remove(&old_path);
                }
            }
            inner.path_index.entry(new_path.clone()).or_default().push(storage_id.clone());
        }

        let resource = inner
            .data
            .get_mut(&storage_id)
            .ok_or_else(|| Error::storage(format!("missing resource {storage_id}")))?;
        resource.body = draft.body;
        resource.content_type = draft.content_type;
        resource.location = format!("{new_path}/{}", resource.external_ids[0]);
        resource.path = new_path;

        debug!(storage_id = %storage_id, "resource updated");
        Ok(resource.clone())
    }

    /// Look up a resource by any of its external IDs.
    pub async fn get(&self, id: &str) -> Result<Resource> {
        let inner = self.inner.read().await;
        let storage_id = inner
            .id_index
            .get(id)
            .ok_or_else(|| Error::not_found(id.to_string()))?;
        inner
            .data
            .get(storage_id)
            .cloned()
            .ok_or_else(|| Error::storage(format!("id index points at missing resource {storage_id}")))
    }

    /// All resources stored at `path` or under `path + "/"`, in insertion
    /// order, deduplicated.
    pub async fn get_by_path(&self, path: &str) -> Vec<Resource> {
        let path = normalize_path(path);
        let inner = self.inner.read().await;
        inner
            .storage_ids_under(path)
            .iter()
            .filter_map(|id| inner.data.get(id).cloned())
            .collect()
    }

    /// Delete by external ID, or failing that, bulk-delete every resource
    /// whose path equals `id` or lies under it. Returns how many resources
    /// were removed; not-found when neither interpretation matches.
    pub async fn delete(&self, id: &str) -> Result<usize> {
        let mut inner = self.inner.write().await;
        if let Some(storage_id) = inner.id_index.get(id).cloned() {
            let resource = inner.evict(&storage_id)?;
            debug!(storage_id = %storage_id, location = %resource.location, "resource deleted");
            return Ok(1);
        }

        let path = normalize_path(id);
        let storage_ids = inner.storage_ids_under(path);
        if storage_ids.is_empty() {
            return Err(Error::not_found(id.to_string()));
        }
        for storage_id in &storage_ids {
            inner.evict(storage_id)?;
        }
        debug!(path = %path, count = storage_ids.len(), "path subtree deleted");
        Ok(storage_ids.len())
    }

    /// Number of stored resources.
    pub async fn resource_count(&self) -> usize {
        self.inner.read().await.data.len()
    }
}
