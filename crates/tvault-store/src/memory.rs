use std::collections::HashMap;
use std::sync::RwLock;

use tvault_types::ObjectId;

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::handle::{DataFlags, ObjectHandle, ObjectInfo};
use crate::open_table::OpenTable;
use crate::traits::ObjectStore;

/// In-memory, HashMap-based object store.
///
/// Intended for tests and embedding. All objects are held in memory behind a
/// `RwLock` for safe concurrent access. A quota in the [`StoreConfig`] makes
/// it a convenient way to simulate storage exhaustion.
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<ObjectId, Vec<u8>>>,
    handles: OpenTable,
    config: StoreConfig,
}

impl InMemoryObjectStore {
    /// Create a new empty, unlimited in-memory store.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::unlimited())
    }

    /// Create a new empty store with the given limits.
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            handles: OpenTable::default(),
            config,
        }
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// Total bytes across all stored objects.
    pub fn total_bytes(&self) -> u64 {
        let map = self.objects.read().expect("lock poisoned");
        used_bytes(&map)
    }

    /// Return a sorted list of all object IDs in the store.
    pub fn all_ids(&self) -> Vec<ObjectId> {
        let map = self.objects.read().expect("lock poisoned");
        let mut ids: Vec<ObjectId> = map.keys().cloned().collect();
        ids.sort();
        ids
    }
}

fn used_bytes(map: &HashMap<ObjectId, Vec<u8>>) -> u64 {
    map.values().map(|data| data.len() as u64).sum()
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn create(&self, id: &ObjectId, flags: DataFlags) -> StoreResult<ObjectHandle> {
        let lease = self.handles.acquire(id, flags)?;
        let mut map = self.objects.write().expect("lock poisoned");
        match map.get_mut(id) {
            Some(_) if !flags.contains(DataFlags::OVERWRITE) => {
                return Err(StoreError::AlreadyExists(id.clone()));
            }
            Some(data) => data.clear(),
            None => {
                map.insert(id.clone(), Vec::new());
            }
        }
        Ok(ObjectHandle::new(lease, flags))
    }

    fn open(&self, id: &ObjectId, flags: DataFlags) -> StoreResult<ObjectHandle> {
        let map = self.objects.read().expect("lock poisoned");
        if !map.contains_key(id) {
            return Err(StoreError::NotFound(id.clone()));
        }
        let lease = self.handles.acquire(id, flags)?;
        Ok(ObjectHandle::new(lease, flags))
    }

    fn write(&self, handle: &mut ObjectHandle, data: &[u8]) -> StoreResult<()> {
        handle.require(DataFlags::ACCESS_WRITE, "write access")?;
        let mut map = self.objects.write().expect("lock poisoned");
        let used = used_bytes(&map);
        let object = map
            .get_mut(handle.id())
            .ok_or_else(|| StoreError::NotFound(handle.id().clone()))?;
        self.config
            .admit_write(handle.id(), object.len() as u64, used, data.len() as u64)?;
        object.extend_from_slice(data);
        Ok(())
    }

    fn read(&self, handle: &mut ObjectHandle, buf: &mut [u8]) -> StoreResult<usize> {
        handle.require(DataFlags::ACCESS_READ, "read access")?;
        let map = self.objects.read().expect("lock poisoned");
        let object = map
            .get(handle.id())
            .ok_or_else(|| StoreError::NotFound(handle.id().clone()))?;
        let start = (handle.position() as usize).min(object.len());
        let n = buf.len().min(object.len() - start);
        buf[..n].copy_from_slice(&object[start..start + n]);
        handle.advance(n as u64);
        Ok(n)
    }

    fn info(&self, handle: &ObjectHandle) -> StoreResult<ObjectInfo> {
        let map = self.objects.read().expect("lock poisoned");
        let object = map
            .get(handle.id())
            .ok_or_else(|| StoreError::NotFound(handle.id().clone()))?;
        Ok(ObjectInfo {
            data_size: object.len() as u64,
            position: handle.position(),
            flags: handle.flags(),
        })
    }

    fn close(&self, _handle: ObjectHandle) -> StoreResult<()> {
        Ok(())
    }

    fn close_and_delete(&self, handle: ObjectHandle) -> StoreResult<()> {
        handle.require(DataFlags::ACCESS_WRITE_META, "write-meta access")?;
        let mut map = self.objects.write().expect("lock poisoned");
        map.remove(handle.id());
        Ok(())
    }

    fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.contains_key(id))
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len();
        f.debug_struct("InMemoryObjectStore")
            .field("object_count", &count)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> ObjectId {
        ObjectId::try_from(name).unwrap()
    }

    fn write_flags() -> DataFlags {
        DataFlags::ACCESS_WRITE | DataFlags::ACCESS_WRITE_META | DataFlags::OVERWRITE
    }

    fn read_all(store: &InMemoryObjectStore, name: &str) -> Vec<u8> {
        let mut handle = store
            .open(&id(name), DataFlags::ACCESS_READ | DataFlags::SHARE_READ)
            .unwrap();
        let size = store.info(&handle).unwrap().data_size as usize;
        let mut buf = vec![0u8; size];
        assert_eq!(store.read(&mut handle, &mut buf).unwrap(), size);
        buf
    }

    // -----------------------------------------------------------------------
    // Core CRUD
    // -----------------------------------------------------------------------

    #[test]
    fn create_write_read() {
        let store = InMemoryObjectStore::new();
        let mut handle = store.create(&id("a"), write_flags()).unwrap();
        store.write(&mut handle, b"hello ").unwrap();
        store.write(&mut handle, b"world").unwrap();
        store.close(handle).unwrap();
        assert_eq!(read_all(&store, "a"), b"hello world");
    }

    #[test]
    fn create_truncates_with_overwrite() {
        let store = InMemoryObjectStore::new();
        let mut handle = store.create(&id("a"), write_flags()).unwrap();
        store.write(&mut handle, b"long old content").unwrap();
        store.close(handle).unwrap();

        let mut handle = store.create(&id("a"), write_flags()).unwrap();
        store.write(&mut handle, b"new").unwrap();
        store.close(handle).unwrap();
        assert_eq!(read_all(&store, "a"), b"new");
        assert_eq!(store.total_bytes(), 3);
    }

    #[test]
    fn create_without_overwrite_conflicts() {
        let store = InMemoryObjectStore::new();
        store.create(&id("a"), write_flags()).unwrap();
        let err = store.create(&id("a"), DataFlags::ACCESS_WRITE).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[test]
    fn open_missing_is_not_found() {
        let store = InMemoryObjectStore::new();
        let err = store.open(&id("missing"), DataFlags::ACCESS_READ).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn read_advances_position() {
        let store = InMemoryObjectStore::new();
        let mut handle = store.create(&id("a"), write_flags()).unwrap();
        store.write(&mut handle, b"0123456789").unwrap();
        store.close(handle).unwrap();

        let mut reader = store.open(&id("a"), DataFlags::ACCESS_READ).unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(store.read(&mut reader, &mut buf).unwrap(), 4);
        assert_eq!(&buf, b"0123");
        assert_eq!(store.read(&mut reader, &mut buf).unwrap(), 4);
        assert_eq!(&buf, b"4567");
        assert_eq!(store.read(&mut reader, &mut buf).unwrap(), 2);
        assert_eq!(store.read(&mut reader, &mut buf).unwrap(), 0);
        assert_eq!(store.info(&reader).unwrap().position, 10);
    }

    // -----------------------------------------------------------------------
    // Access rights
    // -----------------------------------------------------------------------

    #[test]
    fn write_requires_write_access() {
        let store = InMemoryObjectStore::new();
        store.create(&id("a"), write_flags()).unwrap();
        let mut handle = store.open(&id("a"), DataFlags::ACCESS_READ).unwrap();
        let err = store.write(&mut handle, b"x").unwrap_err();
        assert!(matches!(err, StoreError::AccessDenied { .. }));
    }

    #[test]
    fn read_requires_read_access() {
        let store = InMemoryObjectStore::new();
        let mut handle = store.create(&id("a"), write_flags()).unwrap();
        let err = store.read(&mut handle, &mut [0u8; 1]).unwrap_err();
        assert!(matches!(err, StoreError::AccessDenied { .. }));
    }

    #[test]
    fn close_and_delete_requires_write_meta() {
        let store = InMemoryObjectStore::new();
        store.create(&id("a"), write_flags()).unwrap();
        let handle = store.open(&id("a"), DataFlags::ACCESS_READ).unwrap();
        assert!(store.close_and_delete(handle).is_err());
        assert!(store.exists(&id("a")).unwrap());
    }

    // -----------------------------------------------------------------------
    // Exists / Delete
    // -----------------------------------------------------------------------

    #[test]
    fn delete_present_object() {
        let store = InMemoryObjectStore::new();
        store.create(&id("a"), write_flags()).unwrap();
        assert!(store.delete(&id("a")).unwrap()); // was present
        assert!(!store.exists(&id("a")).unwrap()); // now gone
        assert!(!store.delete(&id("a")).unwrap()); // second delete = false
    }

    #[test]
    fn delete_missing_object() {
        let store = InMemoryObjectStore::new();
        assert!(!store.delete(&id("never-written")).unwrap());
    }

    #[test]
    fn delete_while_writer_open_conflicts() {
        let store = InMemoryObjectStore::new();
        let mut handle = store.create(&id("a"), write_flags()).unwrap();
        let err = store.delete(&id("a")).unwrap_err();
        assert!(matches!(err, StoreError::AccessConflict { .. }));
        assert_eq!(err.status(), tvault_types::StatusCode::AccessConflict);
        store.write(&mut handle, b"x").unwrap();
        store.close(handle).unwrap();
        assert!(store.delete(&id("a")).unwrap());
    }

    // -----------------------------------------------------------------------
    // Sharing
    // -----------------------------------------------------------------------

    #[test]
    fn open_writer_hides_partial_object() {
        let store = InMemoryObjectStore::new();
        let mut handle = store.create(&id("a"), write_flags()).unwrap();
        store.write(&mut handle, b"partial").unwrap();

        let read = DataFlags::ACCESS_READ | DataFlags::SHARE_READ;
        assert!(matches!(
            store.open(&id("a"), read),
            Err(StoreError::AccessConflict { .. })
        ));
        assert!(matches!(
            store.create(&id("a"), write_flags()),
            Err(StoreError::AccessConflict { .. })
        ));

        store.write(&mut handle, b" then whole").unwrap();
        store.close(handle).unwrap();
        assert_eq!(read_all(&store, "a"), b"partial then whole");
    }

    #[test]
    fn dropped_handle_releases_object() {
        let store = InMemoryObjectStore::new();
        let handle = store.create(&id("a"), write_flags()).unwrap();
        assert_eq!(store.handles.open_count(&id("a")), 1);
        drop(handle);
        assert_eq!(store.handles.open_count(&id("a")), 0);
        store.open(&id("a"), DataFlags::ACCESS_READ).unwrap();
    }

    #[test]
    fn shared_readers_coexist() {
        let store = InMemoryObjectStore::new();
        store.create(&id("a"), write_flags()).unwrap();
        let read = DataFlags::ACCESS_READ | DataFlags::SHARE_READ;
        let _first = store.open(&id("a"), read).unwrap();
        let _second = store.open(&id("a"), read).unwrap();
        assert!(store.create(&id("a"), write_flags()).is_err());
    }

    // -----------------------------------------------------------------------
    // Limits
    // -----------------------------------------------------------------------

    #[test]
    fn quota_rejects_write_without_partial_data() {
        let store = InMemoryObjectStore::with_config(StoreConfig::unlimited().with_quota(10));
        let mut handle = store.create(&id("a"), write_flags()).unwrap();
        store.write(&mut handle, b"12345678").unwrap();
        let err = store.write(&mut handle, b"abc").unwrap_err();
        assert!(matches!(err, StoreError::NoSpace { available: 2, .. }));
        assert_eq!(err.status(), tvault_types::StatusCode::StorageNoSpace);
        assert_eq!(store.total_bytes(), 8);
    }

    #[test]
    fn quota_is_shared_across_objects() {
        let store = InMemoryObjectStore::with_config(StoreConfig::unlimited().with_quota(8));
        let mut a = store.create(&id("a"), write_flags()).unwrap();
        store.write(&mut a, b"12345").unwrap();
        let mut b = store.create(&id("b"), write_flags()).unwrap();
        assert!(store.write(&mut b, b"1234").is_err());
        store.close_and_delete(a).unwrap();
        store.write(&mut b, b"1234").unwrap();
    }

    #[test]
    fn truncation_releases_quota() {
        let store = InMemoryObjectStore::with_config(StoreConfig::unlimited().with_quota(8));
        let mut a = store.create(&id("a"), write_flags()).unwrap();
        store.write(&mut a, b"12345678").unwrap();
        store.close(a).unwrap();
        let mut a = store.create(&id("a"), write_flags()).unwrap();
        store.write(&mut a, b"abcdefgh").unwrap();
    }

    // -----------------------------------------------------------------------
    // Utility methods
    // -----------------------------------------------------------------------

    #[test]
    fn len_and_all_ids() {
        let store = InMemoryObjectStore::default();
        assert!(store.is_empty());
        for name in ["c", "a", "b"] {
            store.create(&id(name), write_flags()).unwrap();
        }
        assert_eq!(store.len(), 3);
        assert_eq!(store.all_ids(), vec![id("a"), id("b"), id("c")]);
    }

    #[test]
    fn concurrent_reads_are_safe() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(InMemoryObjectStore::new());
        let mut handle = store.create(&id("shared"), write_flags()).unwrap();
        store.write(&mut handle, b"shared data").unwrap();
        store.close(handle).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    assert_eq!(read_all(&store, "shared"), b"shared data");
                })
            })
            .collect();

        for h in handles {
            h.join().expect("thread should not panic");
        }
    }

    #[test]
    fn debug_format() {
        let store = InMemoryObjectStore::new();
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryObjectStore"));
        assert!(debug.contains("object_count"));
    }
}
