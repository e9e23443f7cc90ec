use std::sync::Arc;

use crate::ChangeWatcher;
use crate::DesktopQuery;
use crate::DesktopResolver;
use crate::IdentityStore;

/// Composition root: owns the shared store handle and the optional platform
/// query capability, wires the caller's callbacks and runs the change
/// watcher.
///
/// `on_init` runs once, synchronously, on the thread calling
/// [`DesktopService::init`]. `on_update` runs on the watcher's background
/// thread each time the identity store changes; both callbacks must outlive
/// the watcher, which holding them by value guarantees.
pub struct DesktopService<S, Q> {
    resolver: DesktopResolver<S, Q>,
    watcher: ChangeWatcher<S>,
    on_init: Box<dyn Fn() + Send + Sync>,
}

impl<S: IdentityStore + 'static, Q: DesktopQuery> DesktopService<S, Q> {
    pub fn new(
        store: Arc<S>,
        query: Option<Arc<Q>>,
        session_id: Option<u32>,
        on_init: impl Fn() + Send + Sync + 'static,
        on_update: impl Fn() + Send + Sync + 'static,
    ) -> DesktopService<S, Q> {
        DesktopService {
            resolver: DesktopResolver::new(store.clone(), query, session_id),
            watcher: ChangeWatcher::new(store, on_update),
            on_init: Box::new(on_init),
        }
    }

    /// Invokes `on_init` on the calling thread, then starts the watcher.
    /// At most one background worker runs per service.
    pub fn init(&self) {
        (self.on_init)();
        self.watcher.start();
    }

    /// Requests watcher shutdown. Idempotent, does not block on the worker.
    pub fn uninit(&self) {
        self.watcher.stop();
    }

    /// Synchronous read operations, safe from any thread concurrently with
    /// the watcher.
    pub fn resolver(&self) -> &DesktopResolver<S, Q> {
        &self.resolver
    }

    pub fn watcher(&self) -> &ChangeWatcher<S> {
        &self.watcher
    }
}
