use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::debug;
use tvault_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::handle::DataFlags;

#[derive(Default)]
struct Registry {
    next_serial: u64,
    open: HashMap<ObjectId, Vec<(u64, DataFlags)>>,
}

/// Handles currently open on each object, with the flags they hold.
///
/// Every backend registers a handle here before touching the object, so two
/// handles whose access and share flags exclude each other never coexist.
#[derive(Clone, Default)]
pub(crate) struct OpenTable {
    inner: Arc<Mutex<Registry>>,
}

impl OpenTable {
    /// Register a handle on `id`, or fail if an open handle excludes `flags`.
    pub(crate) fn acquire(&self, id: &ObjectId, flags: DataFlags) -> StoreResult<Lease> {
        let mut registry = self.inner.lock().expect("open table poisoned");
        if let Some(&(_, held)) = registry
            .open
            .get(id)
            .and_then(|open| open.iter().find(|(_, held)| excludes(*held, flags)))
        {
            debug!(%id, ?held, requested = ?flags, "access conflict");
            return Err(StoreError::AccessConflict {
                id: id.clone(),
                held,
                requested: flags,
            });
        }
        let serial = registry.next_serial;
        registry.next_serial += 1;
        registry
            .open
            .entry(id.clone())
            .or_default()
            .push((serial, flags));
        Ok(Lease {
            table: self.clone(),
            id: id.clone(),
            serial,
        })
    }

    #[cfg(test)]
    pub(crate) fn open_count(&self, id: &ObjectId) -> usize {
        let registry = self.inner.lock().expect("open table poisoned");
        registry.open.get(id).map_or(0, Vec::len)
    }

    fn release(&self, id: &ObjectId, serial: u64) {
        let mut registry = self.inner.lock().expect("open table poisoned");
        if let Some(open) = registry.open.get_mut(id) {
            open.retain(|(s, _)| *s != serial);
            if open.is_empty() {
                registry.open.remove(id);
            }
        }
    }
}

/// Whether a handle holding `held` rules out opening another with `requested`.
///
/// `ACCESS_WRITE_META` is never shared. Otherwise each side must allow, via
/// its share flags, the accesses the other side holds.
fn excludes(held: DataFlags, requested: DataFlags) -> bool {
    if held.contains(DataFlags::ACCESS_WRITE_META)
        || requested.contains(DataFlags::ACCESS_WRITE_META)
    {
        return true;
    }
    let denied = |access: DataFlags, sharer: DataFlags| {
        (access.contains(DataFlags::ACCESS_READ) && !sharer.contains(DataFlags::SHARE_READ))
            || (access.contains(DataFlags::ACCESS_WRITE) && !sharer.contains(DataFlags::SHARE_WRITE))
    };
    denied(requested, held) || denied(held, requested)
}

/// Registration of one open handle. Released when dropped.
pub(crate) struct Lease {
    table: OpenTable,
    id: ObjectId,
    serial: u64,
}

impl Lease {
    pub(crate) fn id(&self) -> &ObjectId {
        &self.id
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.table.release(&self.id, self.serial);
    }
}

impl fmt::Debug for Lease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lease")
            .field("id", &self.id)
            .field("serial", &self.serial)
            .finish()
    }
}
