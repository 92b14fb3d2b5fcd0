// Windows config root: %APPDATA%.

use std::env;
use std::path::PathBuf;

pub fn config_root() -> PathBuf {
    PathBuf::from(
        env::var("APPDATA")
            .unwrap_or_else(|_| String::from("C:\\Users\\Default\\AppData\\Roaming")),
    )
}
