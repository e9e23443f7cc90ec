use crate::CancelSignal;

/// Outcome of a blocking wait on the identity store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreWait {
    /// The identity records changed.
    Changed,
    /// The cancellation signal was raised.
    Cancelled,
    /// The store is unavailable or the change subscription could not be
    /// registered. Fatal to the watcher instance, never retried.
    Lost,
}

/// Read access to the persisted desktop-identity records, plus a blocking
/// change subscription on them.
///
/// Implementations degrade silently: any open or read failure is `None` and
/// any subscription failure is [`StoreWait::Lost`]. Absence of a record is an
/// expected outcome, not an error.
pub trait IdentityStore: Send + Sync {
    /// Raw bytes of the global current-desktop record.
    fn current_global(&self) -> Option<Vec<u8>>;

    /// Raw bytes of the per-session current-desktop record. Written by the
    /// platform only after the first desktop switch of a session.
    fn current_for_session(&self, session_id: u32) -> Option<Vec<u8>>;

    /// Raw known-desktops blob, concatenated 16-byte identifiers in store
    /// order.
    fn known_ids(&self) -> Option<Vec<u8>>;

    /// Blocks until the identity records change or `cancel` is raised. There
    /// is no timeout; cancellation is the only preemptive wake.
    fn wait_change(&self, cancel: &CancelSignal) -> StoreWait;
}
