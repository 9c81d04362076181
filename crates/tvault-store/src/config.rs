use serde::{Deserialize, Serialize};

/// Limits applied by a store backend.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Total bytes the store may hold across all objects.
    pub quota: Option<u64>,
    /// Largest size a single object may reach.
    pub max_object_size: Option<u64>,
}

impl StoreConfig {
    /// No limits.
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Limit the total bytes held by the store.
    pub fn with_quota(mut self, quota: u64) -> Self {
        self.quota = Some(quota);
        self
    }

    /// Limit the size of any single object.
    pub fn with_max_object_size(mut self, max: u64) -> Self {
        self.max_object_size = Some(max);
        self
    }
}

impl StoreConfig {
    /// Check that appending `add` bytes to an object of `object_size` bytes,
    /// in a store currently holding `used` bytes, stays within limits.
    pub(crate) fn admit_write(
        &self,
        id: &tvault_types::ObjectId,
        object_size: u64,
        used: u64,
        add: u64,
    ) -> crate::error::StoreResult<()> {
        if let Some(max) = self.max_object_size {
            let size = object_size + add;
            if size > max {
                return Err(crate::error::StoreError::ObjectTooLarge {
                    id: id.clone(),
                    size,
                    max,
                });
            }
        }
        if let Some(quota) = self.quota {
            let available = quota.saturating_sub(used);
            if add > available {
                return Err(crate::error::StoreError::NoSpace {
                    id: id.clone(),
                    requested: add,
                    available,
                });
            }
        }
        Ok(())
    }
}
