use std::sync::Arc;

use crate::DesktopId;
use crate::DesktopQuery;
use crate::IdentityStore;
use crate::StateReader;
use crate::WindowHandle;
use crate::resolve_via_windows;

/// Resolves the active virtual desktop through a prioritized source chain.
///
/// No single platform source is reliable on every OS build: the global record
/// exists only on newer builds, the per-session record only after the first
/// desktop switch of a session, and the per-window COM capability may be
/// absent entirely. The resolver consults them in order and the first source
/// with a value wins.
pub struct DesktopResolver<S, Q> {
    reader: StateReader<S>,
    query: Option<Arc<Q>>,
    session_id: Option<u32>,
}

impl<S: IdentityStore, Q: DesktopQuery> DesktopResolver<S, Q> {
    pub fn new(
        store: Arc<S>,
        query: Option<Arc<Q>>,
        session_id: Option<u32>,
    ) -> DesktopResolver<S, Q> {
        DesktopResolver {
            reader: StateReader::new(store),
            query,
            session_id,
        }
    }

    /// The currently active desktop, or `None` when every source is
    /// exhausted. Never returns the nil identifier.
    ///
    /// Source order, first value short-circuits the rest:
    /// 1. global persisted record,
    /// 2. per-session persisted record,
    /// 3. first entry of the known-desktops list (the primary desktop),
    /// 4. scan of top-level windows through the platform capability.
    pub fn current_desktop_id(&self) -> Option<DesktopId> {
        if let Some(id) = self.reader.global_current() {
            return Some(id);
        }

        if let Some(id) = self
            .session_id
            .and_then(|session| self.reader.session_current(session))
        {
            return Some(id);
        }

        // Fresh session, no switch recorded yet: the first stored desktop is
        // the primary one the session started on.
        if let Some(id) = self
            .reader
            .known_ids()
            .and_then(|ids| ids.first().copied())
            .filter(|id| !id.is_nil())
        {
            return Some(id);
        }

        self.query.as_deref().and_then(|q| resolve_via_windows(q))
    }

    /// All known desktops in store order, `None` if the record is absent.
    pub fn known_desktop_ids(&self) -> Option<Vec<DesktopId>> {
        self.reader.known_ids()
    }

    /// Desktop of a single window, straight through the platform capability.
    /// No fallback chain applies here.
    pub fn window_desktop_id(&self, window: WindowHandle) -> Option<DesktopId> {
        self.query
            .as_deref()?
            .desktop_id(window)
            .filter(|id| !id.is_nil())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CancelSignal;
    use crate::StoreWait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeStore {
        global: Mutex<Option<Vec<u8>>>,
        session: Mutex<Option<(u32, Vec<u8>)>>,
        known: Mutex<Option<Vec<u8>>>,
    }

    impl IdentityStore for FakeStore {
        fn current_global(&self) -> Option<Vec<u8>> {
            self.global.lock().unwrap().clone()
        }

        fn current_for_session(&self, session_id: u32) -> Option<Vec<u8>> {
            let session = self.session.lock().unwrap();
            match session.as_ref() {
                Some((id, bytes)) if *id == session_id => Some(bytes.clone()),
                _ => None,
            }
        }

        fn known_ids(&self) -> Option<Vec<u8>> {
            self.known.lock().unwrap().clone()
        }

        fn wait_change(&self, _cancel: &CancelSignal) -> StoreWait {
            StoreWait::Lost
        }
    }

    struct FakeQuery {
        windows: Vec<(WindowHandle, bool, DesktopId)>,
    }

    impl DesktopQuery for FakeQuery {
        fn top_level_windows(&self) -> Vec<WindowHandle> {
            self.windows.iter().map(|(w, _, _)| *w).collect()
        }

        fn is_on_current_desktop(&self, window: WindowHandle) -> Option<bool> {
            self.windows
                .iter()
                .find(|(w, _, _)| *w == window)
                .map(|(_, active, _)| *active)
        }

        fn desktop_id(&self, window: WindowHandle) -> Option<DesktopId> {
            self.windows
                .iter()
                .find(|(w, _, _)| *w == window)
                .map(|(_, _, id)| *id)
        }
    }

    fn id(n: u8) -> DesktopId {
        DesktopId::from_guid_bytes(&[n; 16]).unwrap()
    }

    fn bytes(n: u8) -> Vec<u8> {
        vec![n; 16]
    }

    const SESSION: u32 = 3;

    fn resolver(
        store: FakeStore,
        query: Option<FakeQuery>,
    ) -> DesktopResolver<FakeStore, FakeQuery> {
        DesktopResolver::new(Arc::new(store), query.map(Arc::new), Some(SESSION))
    }

    #[test]
    fn global_record_wins_over_everything() {
        let store = FakeStore::default();
        *store.global.lock().unwrap() = Some(bytes(1));
        *store.session.lock().unwrap() = Some((SESSION, bytes(2)));
        *store.known.lock().unwrap() = Some(bytes(3));

        let resolver = resolver(
            store,
            Some(FakeQuery {
                windows: vec![(WindowHandle(1), true, id(4))],
            }),
        );
        assert_eq!(resolver.current_desktop_id(), Some(id(1)));
    }

    #[test]
    fn session_record_wins_when_global_is_absent() {
        let store = FakeStore::default();
        *store.session.lock().unwrap() = Some((SESSION, bytes(2)));
        *store.known.lock().unwrap() = Some(bytes(3));

        let resolver = resolver(store, None);
        assert_eq!(resolver.current_desktop_id(), Some(id(2)));
    }

    #[test]
    fn primary_desktop_fallback_takes_first_known_id() {
        let store = FakeStore::default();
        let mut blob = bytes(5);
        blob.extend_from_slice(&bytes(6));
        blob.extend_from_slice(&bytes(7));
        *store.known.lock().unwrap() = Some(blob);

        let resolver = resolver(store, None);
        assert_eq!(resolver.current_desktop_id(), Some(id(5)));
    }

    #[test]
    fn nil_primary_desktop_is_not_returned() {
        let store = FakeStore::default();
        *store.known.lock().unwrap() = Some(vec![0u8; 16]);

        let resolver = resolver(store, None);
        assert_eq!(resolver.current_desktop_id(), None);
    }

    #[test]
    fn window_scan_is_the_last_resort() {
        let store = FakeStore::default();
        let resolver = resolver(
            store,
            Some(FakeQuery {
                windows: vec![
                    (WindowHandle(1), false, id(1)),
                    (WindowHandle(2), true, id(2)),
                    (WindowHandle(3), true, DesktopId::nil()),
                ],
            }),
        );
        assert_eq!(resolver.current_desktop_id(), Some(id(2)));
    }

    #[test]
    fn exhausted_sources_yield_none_not_nil() {
        let resolver = resolver(FakeStore::default(), None);
        assert_eq!(resolver.current_desktop_id(), None);
    }

    #[test]
    fn missing_session_id_skips_the_session_source() {
        let store = FakeStore::default();
        *store.session.lock().unwrap() = Some((SESSION, bytes(2)));
        *store.known.lock().unwrap() = Some(bytes(3));

        let resolver = DesktopResolver::<_, FakeQuery>::new(Arc::new(store), None, None);
        assert_eq!(resolver.current_desktop_id(), Some(id(3)));
    }

    #[test]
    fn known_desktop_ids_is_a_passthrough() {
        let store = FakeStore::default();
        let mut blob = bytes(8);
        blob.extend_from_slice(&bytes(9));
        *store.known.lock().unwrap() = Some(blob);

        let resolver = resolver(store, None);
        assert_eq!(resolver.known_desktop_ids(), Some(vec![id(8), id(9)]));
    }

    #[test]
    fn window_desktop_id_needs_the_capability() {
        let no_capability = resolver(FakeStore::default(), None);
        assert_eq!(no_capability.window_desktop_id(WindowHandle(1)), None);

        let with_capability = resolver(
            FakeStore::default(),
            Some(FakeQuery {
                windows: vec![
                    (WindowHandle(1), false, id(6)),
                    (WindowHandle(2), false, DesktopId::nil()),
                ],
            }),
        );
        assert_eq!(
            with_capability.window_desktop_id(WindowHandle(1)),
            Some(id(6))
        );
        assert_eq!(with_capability.window_desktop_id(WindowHandle(2)), None);
        assert_eq!(with_capability.window_desktop_id(WindowHandle(3)), None);
    }
}
