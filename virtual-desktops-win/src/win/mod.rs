//! Windows implementations of the store and query seams: Explorer's registry
//! records and the `IVirtualDesktopManager` shell capability.

use std::sync::Arc;
use std::sync::OnceLock;

use windows::Win32::Foundation::{
    BOOL, CloseHandle, HANDLE, HWND, LPARAM, WAIT_EVENT, WAIT_OBJECT_0,
};
use windows::Win32::System::Com::{
    CLSCTX_ALL, COINIT_APARTMENTTHREADED, CoCreateInstance, CoInitializeEx,
};
use windows::Win32::System::Registry::{
    HKEY, HKEY_CURRENT_USER, KEY_NOTIFY, KEY_READ, REG_NOTIFY_CHANGE_LAST_SET, RegCloseKey,
    RegNotifyChangeKeyValue, RegOpenKeyExW, RegQueryValueExW,
};
use windows::Win32::System::RemoteDesktop::ProcessIdToSessionId;
use windows::Win32::System::Threading::{
    CreateEventW, GetCurrentProcessId, INFINITE, WaitForMultipleObjects,
};
use windows::Win32::UI::Shell::{IVirtualDesktopManager, VirtualDesktopManager};
use windows::Win32::UI::WindowsAndMessaging::EnumWindows;
use windows::core::{GUID, PCWSTR};

use crate::CancelSignal;
use crate::DesktopId;
use crate::DesktopQuery;
use crate::DesktopService;
use crate::IdentityStore;
use crate::StoreWait;
use crate::WindowHandle;

const VIRTUAL_DESKTOPS_KEY: &str =
    r"Software\Microsoft\Windows\CurrentVersion\Explorer\VirtualDesktops";
const CURRENT_VIRTUAL_DESKTOP: &str = "CurrentVirtualDesktop";
const VIRTUAL_DESKTOP_IDS: &str = "VirtualDesktopIDs";

fn session_key_path(session_id: u32) -> String {
    format!(
        r"Software\Microsoft\Windows\CurrentVersion\Explorer\SessionInfo\{session_id}\VirtualDesktops"
    )
}

fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

fn open_subkey(path: &str) -> Option<HKEY> {
    let path = wide(path);
    let mut key = HKEY::default();
    let status = unsafe {
        RegOpenKeyExW(
            HKEY_CURRENT_USER,
            PCWSTR::from_raw(path.as_ptr()),
            0,
            KEY_READ | KEY_NOTIFY,
            &mut key,
        )
    };
    if status.is_ok() { Some(key) } else { None }
}

/// Shared handle to the global identity subtree, opened lazily once per
/// process. A failed open is cached as permanently absent and never retried;
/// the handle is released only at process teardown.
fn virtual_desktops_key() -> Option<HKEY> {
    static KEY: OnceLock<Option<isize>> = OnceLock::new();
    KEY.get_or_init(|| {
        let key = open_subkey(VIRTUAL_DESKTOPS_KEY);
        if key.is_none() {
            log::warn!("virtual desktops registry key is not available");
        }
        key.map(|k| k.0)
    })
    .map(HKEY)
}

/// Query-length-then-read against a registry value. `None` on any failure.
fn read_value(key: HKEY, name: &str) -> Option<Vec<u8>> {
    let name = wide(name);
    let name = PCWSTR::from_raw(name.as_ptr());

    let mut len = 0u32;
    let status = unsafe { RegQueryValueExW(key, name, None, None, None, Some(&mut len)) };
    if !status.is_ok() {
        return None;
    }

    let mut buffer = vec![0u8; len as usize];
    let mut written = len;
    let status = unsafe {
        RegQueryValueExW(
            key,
            name,
            None,
            None,
            Some(buffer.as_mut_ptr()),
            Some(&mut written),
        )
    };
    if !status.is_ok() {
        return None;
    }
    buffer.truncate(written as usize);
    Some(buffer)
}

/// Identity store over Explorer's registry records under `HKCU`.
#[derive(Debug, Default)]
pub struct RegistryStore;

impl RegistryStore {
    pub fn new() -> RegistryStore {
        RegistryStore
    }
}

impl IdentityStore for RegistryStore {
    fn current_global(&self) -> Option<Vec<u8>> {
        read_value(virtual_desktops_key()?, CURRENT_VIRTUAL_DESKTOP)
    }

    fn current_for_session(&self, session_id: u32) -> Option<Vec<u8>> {
        // Explorer writes this record only after the first desktop switch of
        // the session, so an absent key is the common case.
        let key = open_subkey(&session_key_path(session_id))?;
        let value = read_value(key, CURRENT_VIRTUAL_DESKTOP);
        unsafe {
            let _ = RegCloseKey(key);
        }
        value
    }

    fn known_ids(&self) -> Option<Vec<u8>> {
        read_value(virtual_desktops_key()?, VIRTUAL_DESKTOP_IDS)
    }

    fn wait_change(&self, cancel: &CancelSignal) -> StoreWait {
        let Some(key) = virtual_desktops_key() else {
            return StoreWait::Lost;
        };
        let Some(cancel_event) = cancel.raw_handle() else {
            return StoreWait::Lost;
        };
        let Ok(change_event) = (unsafe { CreateEventW(None, false, false, None) }) else {
            return StoreWait::Lost;
        };

        let outcome = wait_on_key(key, change_event, cancel_event);
        unsafe {
            let _ = CloseHandle(change_event);
        }
        outcome
    }
}

fn wait_on_key(key: HKEY, change_event: HANDLE, cancel_event: HANDLE) -> StoreWait {
    // One-shot registration, re-armed by the watcher on every iteration.
    let status = unsafe {
        RegNotifyChangeKeyValue(key, true, REG_NOTIFY_CHANGE_LAST_SET, change_event, true)
    };
    if !status.is_ok() {
        return StoreWait::Lost;
    }

    let signaled =
        unsafe { WaitForMultipleObjects(&[change_event, cancel_event], false, INFINITE) };
    if signaled == WAIT_OBJECT_0 {
        StoreWait::Changed
    } else if signaled == WAIT_EVENT(WAIT_OBJECT_0.0 + 1) {
        StoreWait::Cancelled
    } else {
        StoreWait::Lost
    }
}

/// Per-window desktop queries through the shell's `IVirtualDesktopManager`.
pub struct ShellDesktopQuery {
    manager: IVirtualDesktopManager,
}

// The desktop manager lives in the shell process; the proxy marshals calls
// from whichever thread makes them.
unsafe impl Send for ShellDesktopQuery {}
unsafe impl Sync for ShellDesktopQuery {}

impl ShellDesktopQuery {
    /// `None` when the shell capability cannot be created; every dependent
    /// operation then degrades to "no value".
    pub fn connect() -> Option<ShellDesktopQuery> {
        unsafe {
            // Harmless when COM is already initialized on this thread.
            let _ = CoInitializeEx(None, COINIT_APARTMENTTHREADED);
        }
        match unsafe { CoCreateInstance(&VirtualDesktopManager, None, CLSCTX_ALL) } {
            Ok(manager) => Some(ShellDesktopQuery { manager }),
            Err(err) => {
                log::warn!("virtual desktop manager is unavailable: {err}");
                None
            }
        }
    }
}

impl DesktopQuery for ShellDesktopQuery {
    fn top_level_windows(&self) -> Vec<WindowHandle> {
        unsafe extern "system" fn push_window(hwnd: HWND, lparam: LPARAM) -> BOOL {
            unsafe {
                let windows = &mut *(lparam.0 as *mut Vec<WindowHandle>);
                windows.push(WindowHandle(hwnd.0));
            }
            BOOL(1)
        }

        let mut windows: Vec<WindowHandle> = Vec::new();
        let result = unsafe {
            EnumWindows(
                Some(push_window),
                LPARAM(&mut windows as *mut Vec<WindowHandle> as isize),
            )
        };
        if result.is_err() {
            return Vec::new();
        }
        windows
    }

    fn is_on_current_desktop(&self, window: WindowHandle) -> Option<bool> {
        unsafe { self.manager.IsWindowOnCurrentVirtualDesktop(HWND(window.0)) }
            .ok()
            .map(|on_desktop| on_desktop.as_bool())
    }

    fn desktop_id(&self, window: WindowHandle) -> Option<DesktopId> {
        unsafe { self.manager.GetWindowDesktopId(HWND(window.0)) }
            .ok()
            .map(guid_to_desktop_id)
    }
}

fn guid_to_desktop_id(guid: GUID) -> DesktopId {
    DesktopId::from(uuid::Uuid::from_fields(
        guid.data1, guid.data2, guid.data3, &guid.data4,
    ))
}

/// Session of the calling process, `None` if the lookup fails.
pub fn current_session_id() -> Option<u32> {
    let mut session = 0u32;
    unsafe { ProcessIdToSessionId(GetCurrentProcessId(), &mut session) }.ok()?;
    Some(session)
}

impl DesktopService<RegistryStore, ShellDesktopQuery> {
    /// Wires the registry store, the shell query capability (absent when it
    /// cannot be created) and the caller's session id into a service that is
    /// ready for [`DesktopService::init`].
    pub fn connect(
        on_init: impl Fn() + Send + Sync + 'static,
        on_update: impl Fn() + Send + Sync + 'static,
    ) -> DesktopService<RegistryStore, ShellDesktopQuery> {
        DesktopService::new(
            Arc::new(RegistryStore::new()),
            ShellDesktopQuery::connect().map(Arc::new),
            current_session_id(),
            on_init,
            on_update,
        )
    }
}
