// Platform-specific paths for the history aggregator.
//
// Uses `cfg(target_os)` to select the implementation at compile time.

use std::path::PathBuf;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "macos")]
mod macos;

#[cfg(target_os = "windows")]
mod windows;

/// Directory name used under the platform's config root.
pub const APP_DIR_NAME: &str = "history-aggregator";

/// Returns the platform-specific configuration directory.
///
/// - **Linux**: `$XDG_CONFIG_HOME/history-aggregator` or `~/.config/history-aggregator`
/// - **macOS**: `~/Library/Application Support/history-aggregator`
/// - **Windows**: `%APPDATA%/history-aggregator`
pub fn get_config_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        linux::config_root().join(APP_DIR_NAME)
    }
    #[cfg(target_os = "macos")]
    {
        macos::config_root().join(APP_DIR_NAME)
    }
    #[cfg(target_os = "windows")]
    {
        windows::config_root().join(APP_DIR_NAME)
    }
}
