use std::fmt;
use std::ops::BitOr;

use serde::{Deserialize, Serialize};
use tvault_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::open_table::Lease;

/// Access and sharing flags requested when creating or opening an object.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DataFlags(u32);

impl DataFlags {
    pub const ACCESS_READ: Self = Self(0x0000_0001);
    pub const ACCESS_WRITE: Self = Self(0x0000_0002);
    /// Needed to delete or rename.
    pub const ACCESS_WRITE_META: Self = Self(0x0000_0004);
    pub const SHARE_READ: Self = Self(0x0000_0010);
    pub const SHARE_WRITE: Self = Self(0x0000_0020);
    /// Create truncates an existing object instead of failing.
    pub const OVERWRITE: Self = Self(0x0000_0400);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// `const` form of `|`.
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl BitOr for DataFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for DataFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(DataFlags, &str); 6] = [
            (DataFlags::ACCESS_READ, "READ"),
            (DataFlags::ACCESS_WRITE, "WRITE"),
            (DataFlags::ACCESS_WRITE_META, "WRITE_META"),
            (DataFlags::SHARE_READ, "SHARE_READ"),
            (DataFlags::SHARE_WRITE, "SHARE_WRITE"),
            (DataFlags::OVERWRITE, "OVERWRITE"),
        ];
        let set: Vec<&str> = NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "DataFlags({})", set.join("|"))
    }
}

/// An open object.
///
/// A handle records which object it refers to, the rights it was opened
/// with, and the read position. While it lives, the store refuses other
/// handles its flags exclude. It is consumed by
/// [`ObjectStore::close`](crate::ObjectStore::close) or
/// [`ObjectStore::close_and_delete`](crate::ObjectStore::close_and_delete);
/// dropping it without either releases it the same way.
#[derive(Debug)]
pub struct ObjectHandle {
    lease: Lease,
    flags: DataFlags,
    position: u64,
}

impl ObjectHandle {
    pub(crate) fn new(lease: Lease, flags: DataFlags) -> Self {
        Self {
            lease,
            flags,
            position: 0,
        }
    }

    pub fn id(&self) -> &ObjectId {
        self.lease.id()
    }

    pub fn flags(&self) -> DataFlags {
        self.flags
    }

    /// Offset of the next read.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub(crate) fn advance(&mut self, n: u64) {
        self.position += n;
    }

    pub(crate) fn require(&self, flag: DataFlags, needed: &'static str) -> StoreResult<()> {
        if self.flags.contains(flag) {
            Ok(())
        } else {
            Err(StoreError::AccessDenied {
                id: self.id().clone(),
                needed,
            })
        }
    }
}

/// Metadata of an open object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObjectInfo {
    /// Current size of the object's data stream.
    pub data_size: u64,
    /// Read position of the handle.
    pub position: u64,
    pub flags: DataFlags,
}
