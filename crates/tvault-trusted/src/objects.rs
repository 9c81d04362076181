//! Single-call object commands: read, delete, and single-shot write.

use std::time::Instant;

use tracing::{debug, info, warn};
use tvault_store::{DataFlags, ObjectStore};
use tvault_protocol::MAX_OBJECT_SIZE;
use tvault_types::{ObjectId, MAX_CHUNK};

use crate::error::{TrustedError, TrustedResult};

/// Rights used whenever the trusted side creates an object.
///
/// No share flags: until the handle is closed, any other open of the id
/// fails with `AccessConflict`, so a partial object is never read.
pub(crate) const WRITE_FLAGS: DataFlags = DataFlags::ACCESS_READ
    .union(DataFlags::ACCESS_WRITE)
    .union(DataFlags::ACCESS_WRITE_META)
    .union(DataFlags::OVERWRITE);

const READ_FLAGS: DataFlags = DataFlags::ACCESS_READ.union(DataFlags::SHARE_READ);

/// Result of a read that did not fail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The whole object.
    Data(Vec<u8>),
    /// The caller's buffer holds fewer than `required` bytes; nothing was read.
    NeedsLargerBuffer { required: u64 },
}

/// Read a whole object into a buffer of `capacity` bytes.
///
/// The object is pulled from the store in `MAX_CHUNK`-sized pieces. A
/// backend that returns less than the size it reported is a fault. An object
/// larger than one `Data` reply can carry is refused before any byte is read.
pub fn read_object(
    store: &dyn ObjectStore,
    id: &ObjectId,
    capacity: u64,
) -> TrustedResult<ReadOutcome> {
    let mut handle = store.open(id, READ_FLAGS)?;
    let size = store.info(&handle)?.data_size;
    if size > MAX_OBJECT_SIZE {
        store.close(handle)?;
        warn!(%id, size, max = MAX_OBJECT_SIZE, "object too large to return");
        return Err(TrustedError::TooLarge {
            size,
            max: MAX_OBJECT_SIZE,
        });
    }
    if capacity < size {
        store.close(handle)?;
        debug!(%id, size, capacity, "read buffer too small");
        return Ok(ReadOutcome::NeedsLargerBuffer { required: size });
    }

    let start = Instant::now();
    let mut data = vec![0u8; size as usize];
    let mut filled = 0usize;
    while filled < data.len() {
        let end = (filled + MAX_CHUNK).min(data.len());
        let n = store.read(&mut handle, &mut data[filled..end])?;
        if n == 0 {
            return Err(TrustedError::ShortRead {
                id: id.clone(),
                got: filled as u64,
                expected: size,
            });
        }
        filled += n;
    }
    store.close(handle)?;
    debug!(%id, size, elapsed_us = start.elapsed().as_micros() as u64, "object read");
    Ok(ReadOutcome::Data(data))
}

/// Delete an object. Returns whether it existed; a missing id is not an error.
pub fn delete_object(store: &dyn ObjectStore, id: &ObjectId) -> TrustedResult<bool> {
    let existed = store.delete(id)?;
    if existed {
        info!(%id, "object deleted");
    } else {
        debug!(%id, "delete of missing object");
    }
    Ok(existed)
}

/// Create an object from one buffer of at most `MAX_CHUNK` bytes.
///
/// A failed write leaves no object behind.
pub fn write_object(store: &dyn ObjectStore, id: &ObjectId, data: &[u8]) -> TrustedResult<()> {
    if data.len() > MAX_CHUNK {
        return Err(TrustedError::TooLarge {
            size: data.len() as u64,
            max: MAX_CHUNK as u64,
        });
    }
    let mut handle = store.create(id, WRITE_FLAGS)?;
    if let Err(e) = store.write(&mut handle, data) {
        warn!(%id, error = %e, "single-shot write failed, deleting object");
        if let Err(cleanup) = store.close_and_delete(handle) {
            warn!(%id, error = %cleanup, "failed to delete object after write error");
        }
        return Err(e.into());
    }
    store.close(handle)?;
    info!(%id, len = data.len(), "object written");
    Ok(())
}
