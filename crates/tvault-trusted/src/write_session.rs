use tracing::{debug, error, info, warn};
use tvault_store::{ObjectHandle, ObjectStore};
use tvault_types::ObjectId;

use crate::error::{TrustedError, TrustedResult};
use crate::objects::WRITE_FLAGS;

/// Externally visible phase of a [`WriteSession`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WritePhase {
    Idle,
    /// The first chunk created the object.
    Open,
    /// At least one further chunk was appended.
    Writing,
}

#[derive(Debug)]
enum State {
    Idle,
    Open(ObjectHandle),
    Writing(ObjectHandle),
}

/// Multi-chunk write into the object store, one per connection.
///
/// A write either reaches [`finalize`](Self::finalize) or the object is
/// deleted: every failed append, a superseding first chunk, and
/// [`abort`](Self::abort) roll the partial object back.
#[derive(Debug)]
pub struct WriteSession {
    state: State,
}

impl WriteSession {
    pub fn new() -> Self {
        Self { state: State::Idle }
    }

    pub fn phase(&self) -> WritePhase {
        match self.state {
            State::Idle => WritePhase::Idle,
            State::Open(_) => WritePhase::Open,
            State::Writing(_) => WritePhase::Writing,
        }
    }

    pub fn in_progress(&self) -> bool {
        !matches!(self.state, State::Idle)
    }

    /// Id of the object being written, if any.
    pub fn object(&self) -> Option<&ObjectId> {
        match &self.state {
            State::Idle => None,
            State::Open(handle) | State::Writing(handle) => Some(handle.id()),
        }
    }

    /// Handle one `WriteChunk`.
    ///
    /// A first chunk creates (or truncates) `id`; if another write was still
    /// open, that object is rolled back first. Later chunks must name the
    /// object the session opened.
    pub fn write_chunk(
        &mut self,
        store: &dyn ObjectStore,
        id: &ObjectId,
        chunk: &[u8],
        is_first: bool,
    ) -> TrustedResult<()> {
        if is_first {
            if let Some(handle) = self.take_handle() {
                warn!(superseded = %handle.id(), %id, "new write started before finalize");
                roll_back(store, handle);
            }
            let handle = store.create(id, WRITE_FLAGS)?;
            info!(%id, "write session opened");
            self.state = State::Open(handle);
        } else {
            match self.object() {
                None => {
                    return Err(TrustedError::BadState {
                        command: "WriteChunk",
                        reason: "no write in progress",
                    })
                }
                Some(open) if open != id => {
                    return Err(TrustedError::IdMismatch {
                        open: open.clone(),
                        got: id.clone(),
                    })
                }
                Some(_) => {}
            }
        }

        let Some(mut handle) = self.take_handle() else {
            return Err(TrustedError::BadState {
                command: "WriteChunk",
                reason: "no write in progress",
            });
        };
        if let Err(e) = store.write(&mut handle, chunk) {
            warn!(%id, error = %e, "append failed");
            roll_back(store, handle);
            return Err(e.into());
        }
        debug!(%id, len = chunk.len(), is_first, "chunk appended");
        self.state = if is_first {
            State::Open(handle)
        } else {
            State::Writing(handle)
        };
        Ok(())
    }

    /// Close the object, making it durable, and return to idle.
    pub fn finalize(&mut self, store: &dyn ObjectStore) -> TrustedResult<()> {
        let handle = self.take_handle().ok_or(TrustedError::BadState {
            command: "WriteFinalize",
            reason: "no write in progress",
        })?;
        let id = handle.id().clone();
        if let Err(e) = store.close(handle) {
            warn!(%id, error = %e, "close failed, deleting object");
            if let Err(cleanup) = store.delete(&id) {
                error!(%id, error = %cleanup, "rollback failed");
            }
            return Err(e.into());
        }
        info!(%id, "write session finalized");
        Ok(())
    }

    /// Roll back any write in progress.
    pub fn abort(&mut self, store: &dyn ObjectStore) {
        if let Some(handle) = self.take_handle() {
            roll_back(store, handle);
        }
    }

    fn take_handle(&mut self) -> Option<ObjectHandle> {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Idle => None,
            State::Open(handle) | State::Writing(handle) => Some(handle),
        }
    }
}

impl Default for WriteSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Delete a partially written object.
fn roll_back(store: &dyn ObjectStore, handle: ObjectHandle) {
    let id = handle.id().clone();
    match store.close_and_delete(handle) {
        Ok(()) => warn!(%id, "partial object rolled back"),
        Err(e) => error!(%id, error = %e, "rollback failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tvault_store::{InMemoryObjectStore, StoreConfig};
    use tvault_types::StatusCode;

    fn id(name: &str) -> ObjectId {
        ObjectId::try_from(name).unwrap()
    }

    fn contents(store: &InMemoryObjectStore, name: &str) -> Option<Vec<u8>> {
        match crate::objects::read_object(store, &id(name), u64::MAX) {
            Ok(crate::objects::ReadOutcome::Data(data)) => Some(data),
            Ok(other) => panic!("unexpected {other:?}"),
            Err(e) if e.status() == StatusCode::ItemNotFound => None,
            Err(e) => panic!("read failed: {e}"),
        }
    }

    // ---------------------------------------------------------------
    // State transitions
    // ---------------------------------------------------------------

    #[test]
    fn idle_open_writing_closed() {
        let store = InMemoryObjectStore::new();
        let mut session = WriteSession::new();
        assert_eq!(session.phase(), WritePhase::Idle);

        session.write_chunk(&store, &id("a"), b"one", true).unwrap();
        assert_eq!(session.phase(), WritePhase::Open);
        session.write_chunk(&store, &id("a"), b"two", false).unwrap();
        assert_eq!(session.phase(), WritePhase::Writing);

        session.finalize(&store).unwrap();
        assert_eq!(session.phase(), WritePhase::Idle);
        assert_eq!(contents(&store, "a").unwrap(), b"onetwo");
    }

    #[test]
    fn finalize_while_idle_is_bad_state() {
        let store = InMemoryObjectStore::new();
        let mut session = WriteSession::new();
        let err = session.finalize(&store).unwrap_err();
        assert_eq!(err.status(), StatusCode::BadState);
    }

    #[test]
    fn finalize_twice_is_bad_state() {
        let store = InMemoryObjectStore::new();
        let mut session = WriteSession::new();
        session.write_chunk(&store, &id("a"), b"x", true).unwrap();
        session.finalize(&store).unwrap();
        assert_eq!(session.finalize(&store).unwrap_err().status(), StatusCode::BadState);
    }

    #[test]
    fn continuation_without_first_is_bad_state() {
        let store = InMemoryObjectStore::new();
        let mut session = WriteSession::new();
        let err = session.write_chunk(&store, &id("a"), b"x", false).unwrap_err();
        assert_eq!(err.status(), StatusCode::BadState);
        assert!(store.is_empty());
    }

    #[test]
    fn continuation_for_other_id_rejected() {
        let store = InMemoryObjectStore::new();
        let mut session = WriteSession::new();
        session.write_chunk(&store, &id("a"), b"x", true).unwrap();
        let err = session.write_chunk(&store, &id("b"), b"y", false).unwrap_err();
        assert_eq!(err.status(), StatusCode::BadParameters);
        assert_eq!(session.phase(), WritePhase::Open);
        session.finalize(&store).unwrap();
        assert_eq!(contents(&store, "a").unwrap(), b"x");
    }

    #[test]
    fn first_chunk_truncates_existing() {
        let store = InMemoryObjectStore::new();
        let mut session = WriteSession::new();
        session.write_chunk(&store, &id("a"), b"old contents", true).unwrap();
        session.finalize(&store).unwrap();
        session.write_chunk(&store, &id("a"), b"new", true).unwrap();
        session.finalize(&store).unwrap();
        assert_eq!(contents(&store, "a").unwrap(), b"new");
    }

    #[test]
    fn object_unreadable_until_finalized() {
        let store = InMemoryObjectStore::new();
        let mut session = WriteSession::new();
        session.write_chunk(&store, &id("a"), b"first half", true).unwrap();
        let err = crate::objects::read_object(&store, &id("a"), u64::MAX).unwrap_err();
        assert_eq!(err.status(), StatusCode::AccessConflict);

        session.write_chunk(&store, &id("a"), b", second half", false).unwrap();
        session.finalize(&store).unwrap();
        assert_eq!(contents(&store, "a").unwrap(), b"first half, second half");
    }

    #[test]
    fn empty_first_chunk_creates_empty_object() {
        let store = InMemoryObjectStore::new();
        let mut session = WriteSession::new();
        session.write_chunk(&store, &id("a"), b"", true).unwrap();
        session.finalize(&store).unwrap();
        assert_eq!(contents(&store, "a").unwrap(), b"");
    }

    // ---------------------------------------------------------------
    // Rollback
    // ---------------------------------------------------------------

    #[test]
    fn second_first_chunk_supersedes_open_write() {
        let store = InMemoryObjectStore::new();
        let mut session = WriteSession::new();
        session.write_chunk(&store, &id("a"), b"partial", true).unwrap();
        session.write_chunk(&store, &id("b"), b"fresh", true).unwrap();
        assert_eq!(session.object(), Some(&id("b")));
        session.finalize(&store).unwrap();

        assert!(contents(&store, "a").is_none());
        assert_eq!(contents(&store, "b").unwrap(), b"fresh");
    }

    #[test]
    fn failed_append_deletes_object() {
        let store = InMemoryObjectStore::with_config(StoreConfig::unlimited().with_quota(8));
        let mut session = WriteSession::new();
        session.write_chunk(&store, &id("a"), b"12345", true).unwrap();
        let err = session.write_chunk(&store, &id("a"), b"67890", false).unwrap_err();
        assert_eq!(err.status(), StatusCode::StorageNoSpace);
        assert_eq!(session.phase(), WritePhase::Idle);
        assert!(contents(&store, "a").is_none());
        assert_eq!(session.finalize(&store).unwrap_err().status(), StatusCode::BadState);
    }

    #[test]
    fn failed_first_append_deletes_object() {
        let store = InMemoryObjectStore::with_config(StoreConfig::unlimited().with_quota(2));
        let mut session = WriteSession::new();
        session.write_chunk(&store, &id("a"), b"too big", true).unwrap_err();
        assert!(!session.in_progress());
        assert!(store.is_empty());
    }

    #[test]
    fn abort_rolls_back() {
        let store = InMemoryObjectStore::new();
        let mut session = WriteSession::new();
        session.write_chunk(&store, &id("a"), b"half", true).unwrap();
        session.abort(&store);
        assert!(!session.in_progress());
        assert!(store.is_empty());
        session.abort(&store);
    }
}
