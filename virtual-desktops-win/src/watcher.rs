use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicU8;
use std::sync::atomic::Ordering;
use std::thread::JoinHandle;

use crate::CancelSignal;
use crate::IdentityStore;
use crate::StoreWait;

/// Lifecycle of the background change watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    /// Not started yet.
    Idle,
    /// Background wait loop is active.
    Running,
    /// The worker exited. Terminal; the watcher is never restarted.
    Stopped,
}

const STATE_IDLE: u8 = 0;
const STATE_RUNNING: u8 = 1;
const STATE_STOPPED: u8 = 2;

/// Watches the identity store and invokes `on_update` on every change.
///
/// Runs at most one background worker. The callback executes on the worker
/// thread, so it must be quick and must hand real work off elsewhere; in
/// particular it must not call [`ChangeWatcher::join`] on its own watcher.
pub struct ChangeWatcher<S> {
    store: Arc<S>,
    on_update: Arc<dyn Fn() + Send + Sync>,
    cancel: Arc<CancelSignal>,
    state: Arc<AtomicU8>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl<S: IdentityStore + 'static> ChangeWatcher<S> {
    pub fn new(store: Arc<S>, on_update: impl Fn() + Send + Sync + 'static) -> ChangeWatcher<S> {
        ChangeWatcher {
            store,
            on_update: Arc::new(on_update),
            cancel: Arc::new(CancelSignal::new()),
            state: Arc::new(AtomicU8::new(STATE_IDLE)),
            worker: Mutex::new(None),
        }
    }

    pub fn state(&self) -> WatcherState {
        match self.state.load(Ordering::SeqCst) {
            STATE_IDLE => WatcherState::Idle,
            STATE_RUNNING => WatcherState::Running,
            _ => WatcherState::Stopped,
        }
    }

    /// Starts the background worker. Only the first call from `Idle` has an
    /// effect; a stopped watcher stays stopped.
    pub fn start(&self) {
        let started = self.state.compare_exchange(
            STATE_IDLE,
            STATE_RUNNING,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        if started.is_err() {
            log::warn!("change watcher already started, ignoring");
            return;
        }

        self.cancel.clear();

        let store = self.store.clone();
        let on_update = self.on_update.clone();
        let cancel = self.cancel.clone();
        let state = self.state.clone();
        let handle = std::thread::spawn(move || {
            run_wait_loop(store.as_ref(), &cancel, on_update.as_ref());
            state.store(STATE_STOPPED, Ordering::SeqCst);
        });
        *self.worker.lock().unwrap() = Some(handle);
    }

    /// Requests shutdown by raising the cancellation signal. Idempotent and
    /// fire-and-forget: does not wait for the worker to exit.
    pub fn stop(&self) {
        self.cancel.raise();
    }

    /// Waits for the worker to exit. Call after [`ChangeWatcher::stop`] for
    /// an orderly teardown; never call from the update callback.
    pub fn join(&self) {
        let handle = self.worker.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

fn run_wait_loop<S: IdentityStore + ?Sized>(
    store: &S,
    cancel: &CancelSignal,
    on_update: &(dyn Fn() + Send + Sync),
) {
    log::debug!("change watcher worker started");
    loop {
        match store.wait_change(cancel) {
            StoreWait::Changed => {
                // A change and a shutdown request can arrive together; the
                // shutdown wins and no further callback runs.
                if cancel.is_raised() {
                    log::debug!("change watcher cancelled");
                    return;
                }
                on_update();
            }
            StoreWait::Cancelled => {
                log::debug!("change watcher cancelled");
                return;
            }
            StoreWait::Lost => {
                // Store unavailable or the change subscription failed. Fatal
                // for this watcher instance; callers needing liveness must
                // treat a stopped watcher as "no further updates".
                log::warn!("identity store change subscription lost, watcher exiting");
                return;
            }
        }
    }
}
