// Linux config root: $XDG_CONFIG_HOME, falling back to ~/.config.

use std::env;
use std::path::PathBuf;

pub fn config_root() -> PathBuf {
    match env::var("XDG_CONFIG_HOME") {
        Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg),
        _ => {
            let home = env::var("HOME").unwrap_or_else(|_| String::from("/tmp"));
            PathBuf::from(home).join(".config")
        }
    }
}
