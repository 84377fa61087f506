//! Platform abstraction layer
//!
//! Handles browser/native differences for wall-clock time and network
//! reachability. Input, visibility and storage live with their users.

/// Milliseconds since the Unix epoch
#[cfg(target_arch = "wasm32")]
pub fn now_ms() -> f64 {
    js_sys::Date::now()
}

/// Milliseconds since the Unix epoch
#[cfg(not(target_arch = "wasm32"))]
pub fn now_ms() -> f64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}

/// Whether the browser reports a network connection
#[cfg(target_arch = "wasm32")]
pub fn is_online() -> bool {
    web_sys::window()
        .map(|w| w.navigator().on_line())
        .unwrap_or(true)
}

/// Native builds assume the network is reachable
#[cfg(not(target_arch = "wasm32"))]
pub fn is_online() -> bool {
    true
}
