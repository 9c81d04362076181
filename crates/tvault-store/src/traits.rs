use tvault_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::handle::{DataFlags, ObjectHandle, ObjectInfo};

/// Store of named, durable objects.
///
/// All implementations must satisfy these invariants:
/// - `create` with [`DataFlags::OVERWRITE`] truncates an existing object;
///   without it, an existing id is an error.
/// - `write` appends. A write rejected for space leaves the object at its
///   previous size.
/// - `read` returns fewer bytes than requested only at end of data.
/// - Deleting a missing id is not an error; it reports `false`.
/// - `create` and `open` fail with `AccessConflict` while another handle
///   whose flags exclude the request is open on the same id.
/// - All I/O errors are propagated, never silently ignored.
pub trait ObjectStore: Send + Sync {
    /// Create (or truncate) an object and return a handle to it.
    fn create(&self, id: &ObjectId, flags: DataFlags) -> StoreResult<ObjectHandle>;

    /// Open an existing object.
    fn open(&self, id: &ObjectId, flags: DataFlags) -> StoreResult<ObjectHandle>;

    /// Append `data` to the object. Requires `ACCESS_WRITE`.
    fn write(&self, handle: &mut ObjectHandle, data: &[u8]) -> StoreResult<()>;

    /// Read up to `buf.len()` bytes from the handle's position, advancing it.
    /// Requires `ACCESS_READ`.
    fn read(&self, handle: &mut ObjectHandle, buf: &mut [u8]) -> StoreResult<usize>;

    /// Size and position of an open object.
    fn info(&self, handle: &ObjectHandle) -> StoreResult<ObjectInfo>;

    /// Close the handle, making written data durable.
    fn close(&self, handle: ObjectHandle) -> StoreResult<()>;

    /// Close the handle and delete the object. Requires `ACCESS_WRITE_META`.
    fn close_and_delete(&self, handle: ObjectHandle) -> StoreResult<()>;

    /// Check whether an object exists.
    fn exists(&self, id: &ObjectId) -> StoreResult<bool>;

    /// Delete an object by id. Returns `true` if the object existed.
    ///
    /// Default implementation opens the object for metadata writes and
    /// closes-and-deletes it.
    fn delete(&self, id: &ObjectId) -> StoreResult<bool> {
        match self.open(id, DataFlags::ACCESS_READ | DataFlags::ACCESS_WRITE_META) {
            Ok(handle) => {
                self.close_and_delete(handle)?;
                Ok(true)
            }
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
