use std::env;
use std::process::Command;

/// Build-time settings read by `src/config.rs` through `option_env!`
const CONFIG_VARS: [&str; 5] = [
    "GRIDBAR_WIFI_SSID",
    "GRIDBAR_WIFI_PASS",
    "GRIDBAR_INVERTER_HOST",
    "GRIDBAR_LED_GPIO",
    "GRIDBAR_LOG_LEVEL",
];

fn main() {
    embuild::espidf::sysenv::output();

    // Expose full git version (e.g. "v0.1.0" or "v0.1.0-3-gabcdef")
    let git_version = Command::new("git")
        .args(["describe", "--tags", "--always"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .unwrap_or_else(|| env::var("CARGO_PKG_VERSION").unwrap());
    println!("cargo:rustc-env=GIT_VERSION={}", git_version.trim());
    // Rebuild when HEAD moves or tags change
    println!("cargo:rerun-if-changed=../.git/HEAD");
    println!("cargo:rerun-if-changed=../.git/refs/tags");

    // Credentials and wiring are baked into the image
    for var in CONFIG_VARS {
        println!("cargo:rerun-if-env-changed={var}");
    }
}
