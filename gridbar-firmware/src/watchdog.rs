//! Task watchdog registration for the long-running threads.
//!
//! Each loop registers a named TWDT user and feeds it once per iteration; a
//! thread stuck for longer than the watchdog timeout resets the device.

use std::ffi::CStr;

use esp_idf_svc::sys::{
    esp, esp_task_wdt_add_user, esp_task_wdt_delete_user, esp_task_wdt_reset_user,
    esp_task_wdt_user_handle_t, EspError,
};
use log::{debug, error};

/// A registered watchdog user. Unregisters on drop.
pub struct WatchdogHandle {
    handle: esp_task_wdt_user_handle_t,
    name: &'static CStr,
}

impl WatchdogHandle {
    /// Register a watchdog user named after the thread (e.g. `c"sampler"`).
    pub fn register(name: &'static CStr) -> Result<Self, EspError> {
        let mut handle: esp_task_wdt_user_handle_t = std::ptr::null_mut();
        esp!(unsafe { esp_task_wdt_add_user(name.as_ptr(), &mut handle) })?;
        debug!("Watchdog: registered {name:?}");
        Ok(Self { handle, name })
    }

    pub fn feed(&self) {
        let result = unsafe { esp_task_wdt_reset_user(self.handle) };
        if result != 0 {
            error!("Watchdog: failed to feed {:?}: error code {result}", self.name);
        }
    }
}

impl Drop for WatchdogHandle {
    fn drop(&mut self) {
        debug!("Watchdog: unregistering {:?}", self.name);
        let result = unsafe { esp_task_wdt_delete_user(self.handle) };
        if result != 0 {
            error!(
                "Watchdog: failed to unregister {:?}: error code {result}",
                self.name
            );
        }
    }
}
