use std::sync::Arc;

use crate::DesktopId;
use crate::IdentityStore;

/// Decodes the persisted identity records of an [`IdentityStore`].
pub struct StateReader<S> {
    store: Arc<S>,
}

impl<S: IdentityStore> StateReader<S> {
    pub fn new(store: Arc<S>) -> StateReader<S> {
        StateReader { store }
    }

    /// Current desktop from the global record, `None` unless the value reads
    /// back as exactly one non-nil identifier.
    pub fn global_current(&self) -> Option<DesktopId> {
        decode_single(self.store.current_global()?)
    }

    /// Current desktop from the per-session record.
    pub fn session_current(&self, session_id: u32) -> Option<DesktopId> {
        decode_single(self.store.current_for_session(session_id)?)
    }

    /// All known desktops in store order. Whole 16-byte elements are decoded;
    /// partial trailing bytes are dropped rather than treated as an error.
    pub fn known_ids(&self) -> Option<Vec<DesktopId>> {
        let blob = self.store.known_ids()?;
        Some(
            blob.chunks_exact(DesktopId::LEN)
                .filter_map(DesktopId::from_guid_bytes)
                .collect(),
        )
    }
}

fn decode_single(bytes: Vec<u8>) -> Option<DesktopId> {
    if bytes.len() != DesktopId::LEN {
        return None;
    }
    DesktopId::from_guid_bytes(&bytes).filter(|id| !id.is_nil())
}
