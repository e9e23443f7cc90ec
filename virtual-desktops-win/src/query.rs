use crate::DesktopId;
use crate::WindowHandle;

/// Per-window desktop queries backed by the platform capability, plus
/// top-level window enumeration.
///
/// An absent or failing capability answers `None`; no operation here fails
/// loudly.
pub trait DesktopQuery: Send + Sync {
    /// All top-level windows, in platform-determined order. The order is not
    /// guaranteed to be stable between calls.
    fn top_level_windows(&self) -> Vec<WindowHandle>;

    /// Whether the window is on the currently active desktop.
    fn is_on_current_desktop(&self, window: WindowHandle) -> Option<bool>;

    /// Desktop the window belongs to.
    fn desktop_id(&self, window: WindowHandle) -> Option<DesktopId>;
}

/// Last-resort scan over top-level windows: the first window that is on the
/// current desktop and reports a non-nil identifier decides.
///
/// This is O(number of top-level windows) and the slowest, least
/// deterministic source; the resolver only reaches it once every persisted
/// record has come up empty.
pub fn resolve_via_windows<Q: DesktopQuery + ?Sized>(query: &Q) -> Option<DesktopId> {
    for window in query.top_level_windows() {
        if query.is_on_current_desktop(window) != Some(true) {
            continue;
        }
        if let Some(id) = query.desktop_id(window) {
            if !id.is_nil() {
                return Some(id);
            }
        }
    }
    None
}
