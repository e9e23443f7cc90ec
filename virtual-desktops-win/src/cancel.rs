/// Single-shot, manually resettable cancellation signal.
///
/// Once raised it stays observably signaled until [`CancelSignal::clear`] is
/// called, so a blocked waiter cannot miss it. On Windows it is backed by a
/// manual-reset event whose handle participates directly in the store's
/// multi-object wait; elsewhere by a mutex flag.
pub struct CancelSignal(imp::Signal);

impl CancelSignal {
    pub fn new() -> CancelSignal {
        CancelSignal(imp::Signal::new())
    }

    pub fn raise(&self) {
        self.0.raise();
    }

    pub fn clear(&self) {
        self.0.clear();
    }

    pub fn is_raised(&self) -> bool {
        self.0.is_raised()
    }

    /// Raw event handle for `WaitForMultipleObjects`, `None` if event
    /// creation failed at construction.
    #[cfg(windows)]
    pub(crate) fn raw_handle(&self) -> Option<windows::Win32::Foundation::HANDLE> {
        self.0.raw_handle()
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        CancelSignal::new()
    }
}

#[cfg(windows)]
mod imp {
    use windows::Win32::Foundation::{CloseHandle, HANDLE, WAIT_OBJECT_0};
    use windows::Win32::System::Threading::{
        CreateEventW, ResetEvent, SetEvent, WaitForSingleObject,
    };

    pub struct Signal {
        event: Option<HANDLE>,
    }

    // Event handles are process-global kernel objects, safe to signal and
    // poll from any thread.
    unsafe impl Send for Signal {}
    unsafe impl Sync for Signal {}

    impl Signal {
        pub fn new() -> Signal {
            // Manual reset so the signal stays raised until cleared.
            let event = unsafe { CreateEventW(None, true, false, None) }.ok();
            if event.is_none() {
                log::warn!("cancel event creation failed, signal is permanently raised");
            }
            Signal { event }
        }

        pub fn raise(&self) {
            if let Some(event) = self.event {
                unsafe {
                    let _ = SetEvent(event);
                }
            }
        }

        pub fn clear(&self) {
            if let Some(event) = self.event {
                unsafe {
                    let _ = ResetEvent(event);
                }
            }
        }

        pub fn is_raised(&self) -> bool {
            match self.event {
                Some(event) => (unsafe { WaitForSingleObject(event, 0) }) == WAIT_OBJECT_0,
                // Without an event a wait could never be woken; report the
                // signal as raised so waiters exit instead.
                None => true,
            }
        }

        pub fn raw_handle(&self) -> Option<HANDLE> {
            self.event
        }
    }

    impl Drop for Signal {
        fn drop(&mut self) {
            if let Some(event) = self.event {
                unsafe {
                    let _ = CloseHandle(event);
                }
            }
        }
    }
}

#[cfg(not(windows))]
mod imp {
    use std::sync::Mutex;

    pub struct Signal {
        raised: Mutex<bool>,
    }

    impl Signal {
        pub fn new() -> Signal {
            Signal {
                raised: Mutex::new(false),
            }
        }

        pub fn raise(&self) {
            *self.raised.lock().unwrap() = true;
        }

        pub fn clear(&self) {
            *self.raised.lock().unwrap() = false;
        }

        pub fn is_raised(&self) -> bool {
            *self.raised.lock().unwrap()
        }
    }
}
