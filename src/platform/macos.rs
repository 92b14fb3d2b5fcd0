// macOS config root: ~/Library/Application Support.

use std::env;
use std::path::PathBuf;

pub fn config_root() -> PathBuf {
    PathBuf::from(env::var("HOME").unwrap_or_else(|_| String::from("/tmp")))
        .join("Library")
        .join("Application Support")
}
