//! Spawning threads with FreeRTOS task names
//!
//! `std::thread::Builder::name()` only renames the pthread after the FreeRTOS
//! task already exists, so the task list would show the default name. The
//! name (and optional core pinning) has to go through
//! `ThreadSpawnConfiguration` before the spawn instead.

use std::ffi::CStr;
use std::thread::JoinHandle;

use esp_idf_hal::cpu::Core;
use esp_idf_hal::task::thread::ThreadSpawnConfiguration;
use log::error;

/// Spawn a thread with a FreeRTOS task name (at most 15 characters).
pub fn spawn_named<F, T>(name: &'static CStr, f: F) -> JoinHandle<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    spawn_configured(name, None, f)
}

/// Spawn a named thread pinned to `core`.
///
/// Keeps timing-sensitive work such as LED output off core 0, where the
/// Wi-Fi stack runs.
pub fn spawn_named_on_core<F, T>(name: &'static CStr, core: Core, f: F) -> JoinHandle<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    spawn_configured(name, Some(core), f)
}

fn spawn_configured<F, T>(name: &'static CStr, core: Option<Core>, f: F) -> JoinHandle<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let prev_conf = ThreadSpawnConfiguration::get();

    let conf = ThreadSpawnConfiguration {
        name: Some(name.to_bytes_with_nul()),
        pin_to_core: core,
        ..Default::default()
    };
    // A rejected configuration still spawns, just with the default name
    if let Err(e) = conf.set() {
        error!("Thread config for {name:?} rejected: {e:?}");
    }

    let handle = std::thread::spawn(f);

    if let Some(prev) = prev_conf {
        if let Err(e) = prev.set() {
            error!("Failed to restore thread spawn configuration: {e:?}");
        }
    }

    handle
}
