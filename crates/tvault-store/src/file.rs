use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};
use tvault_types::ObjectId;

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::handle::{DataFlags, ObjectHandle, ObjectInfo};
use crate::open_table::OpenTable;
use crate::traits::ObjectStore;

const OBJECT_EXT: &str = "obj";

/// Directory-backed object store.
///
/// Each object lives in its own file named after the hex encoding of its id,
/// so arbitrary id bytes never reach the filesystem as path components.
/// Written data is `fsync`ed when a writable handle is closed.
pub struct FileObjectStore {
    root: PathBuf,
    config: StoreConfig,
    /// Bytes currently held by all objects, kept for quota checks.
    used: Mutex<u64>,
    handles: OpenTable,
}

impl FileObjectStore {
    /// Open (or create) a store rooted at `root`.
    pub fn open(root: &Path, config: StoreConfig) -> StoreResult<Self> {
        fs::create_dir_all(root)?;
        let mut used = 0u64;
        for entry in fs::read_dir(root)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some(OBJECT_EXT) {
                used += entry.metadata()?.len();
            }
        }
        debug!(root = %root.display(), used, "file store opened");
        Ok(Self {
            root: root.to_path_buf(),
            config,
            used: Mutex::new(used),
            handles: OpenTable::default(),
        })
    }

    /// Directory holding the object files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Total bytes across all stored objects.
    pub fn total_bytes(&self) -> u64 {
        *self.used.lock().expect("store mutex poisoned")
    }

    fn path_for(&self, id: &ObjectId) -> PathBuf {
        self.root.join(format!("{}.{OBJECT_EXT}", id.to_hex()))
    }

    fn size_of(&self, id: &ObjectId) -> StoreResult<u64> {
        fs::metadata(self.path_for(id))
            .map(|m| m.len())
            .map_err(|e| not_found_or_io(id, e))
    }
}

fn not_found_or_io(id: &ObjectId, e: io::Error) -> StoreError {
    if e.kind() == io::ErrorKind::NotFound {
        StoreError::NotFound(id.clone())
    } else {
        StoreError::Io(e)
    }
}

#[cfg(unix)]
fn is_out_of_space(e: &io::Error) -> bool {
    e.raw_os_error() == Some(libc::ENOSPC)
}

#[cfg(not(unix))]
fn is_out_of_space(_e: &io::Error) -> bool {
    false
}

impl ObjectStore for FileObjectStore {
    fn create(&self, id: &ObjectId, flags: DataFlags) -> StoreResult<ObjectHandle> {
        let lease = self.handles.acquire(id, flags)?;
        let path = self.path_for(id);
        let mut used = self.used.lock().expect("store mutex poisoned");
        let previous = match fs::metadata(&path) {
            Ok(_) if !flags.contains(DataFlags::OVERWRITE) => {
                return Err(StoreError::AlreadyExists(id.clone()));
            }
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => 0,
            Err(e) => return Err(e.into()),
        };
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        *used = used.saturating_sub(previous);
        debug!(%id, truncated = previous, "object created");
        Ok(ObjectHandle::new(lease, flags))
    }

    fn open(&self, id: &ObjectId, flags: DataFlags) -> StoreResult<ObjectHandle> {
        self.size_of(id)?;
        let lease = self.handles.acquire(id, flags)?;
        Ok(ObjectHandle::new(lease, flags))
    }

    fn write(&self, handle: &mut ObjectHandle, data: &[u8]) -> StoreResult<()> {
        handle.require(DataFlags::ACCESS_WRITE, "write access")?;
        let id = handle.id();
        let mut used = self.used.lock().expect("store mutex poisoned");
        let size = self.size_of(id)?;
        self.config.admit_write(id, size, *used, data.len() as u64)?;

        let mut file = OpenOptions::new()
            .append(true)
            .open(self.path_for(id))
            .map_err(|e| not_found_or_io(id, e))?;
        if let Err(e) = file.write_all(data) {
            // Put the object back to its size before this write.
            if let Err(trunc) = file.set_len(size) {
                warn!(%id, error = %trunc, "failed to truncate after short write");
            }
            if is_out_of_space(&e) {
                return Err(StoreError::NoSpace {
                    id: id.clone(),
                    requested: data.len() as u64,
                    available: 0,
                });
            }
            return Err(e.into());
        }
        *used += data.len() as u64;
        Ok(())
    }

    fn read(&self, handle: &mut ObjectHandle, buf: &mut [u8]) -> StoreResult<usize> {
        handle.require(DataFlags::ACCESS_READ, "read access")?;
        let mut file = File::open(self.path_for(handle.id()))
            .map_err(|e| not_found_or_io(handle.id(), e))?;
        file.seek(SeekFrom::Start(handle.position()))?;

        let mut filled = 0;
        while filled < buf.len() {
            match file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        handle.advance(filled as u64);
        Ok(filled)
    }

    fn info(&self, handle: &ObjectHandle) -> StoreResult<ObjectInfo> {
        Ok(ObjectInfo {
            data_size: self.size_of(handle.id())?,
            position: handle.position(),
            flags: handle.flags(),
        })
    }

    fn close(&self, handle: ObjectHandle) -> StoreResult<()> {
        if handle.flags().contains(DataFlags::ACCESS_WRITE) {
            let file = File::open(self.path_for(handle.id()))
                .map_err(|e| not_found_or_io(handle.id(), e))?;
            file.sync_all()?;
        }
        Ok(())
    }

    fn close_and_delete(&self, handle: ObjectHandle) -> StoreResult<()> {
        handle.require(DataFlags::ACCESS_WRITE_META, "write-meta access")?;
        let id = handle.id();
        let mut used = self.used.lock().expect("store mutex poisoned");
        let size = match self.size_of(id) {
            Ok(size) => size,
            Err(StoreError::NotFound(_)) => return Ok(()),
            Err(e) => return Err(e),
        };
        fs::remove_file(self.path_for(id))?;
        *used = used.saturating_sub(size);
        debug!(%id, size, "object deleted");
        Ok(())
    }

    fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        match self.size_of(id) {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

impl std::fmt::Debug for FileObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileObjectStore")
            .field("root", &self.root)
            .field("config", &self.config)
            .finish()
    }
}
