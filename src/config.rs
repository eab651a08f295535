//! Runtime flags, read once and passed explicitly.
//!
//! Nothing in kiroku looks at the process environment on its own. Build a
//! [`Config`] at startup (usually with [`Config::from_env`]) and hand it to a
//! [`Recorder`](crate::Recorder).
//!
//! | Variable | Effect |
//! |---|---|
//! | `NODE_ENV` | `development` discloses stacks and details to clients |
//! | `LOG` | `false` turns off both log files |
//! | `KIROKU_UTC_OFFSET` | minutes east of UTC for log timestamps (default 330) |
//! | `KIROKU_LOG_DIR` | log directory, relative to the working directory (default `logs`) |

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::timestamp::DEFAULT_OFFSET_MINUTES;

/// Offsets beyond ±24h are rejected.
const MAX_OFFSET_MINUTES: i32 = 24 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    development: bool,
    log_enabled: bool,
    utc_offset_minutes: i32,
    log_dir: PathBuf,
}

impl Config {
    /// Production defaults: no disclosure, logging on, UTC+05:30, `./logs`.
    pub fn new() -> Self {
        Self {
            development: false,
            log_enabled: true,
            utc_offset_minutes: DEFAULT_OFFSET_MINUTES,
            log_dir: PathBuf::from("logs"),
        }
    }

    /// Reads the variables listed in the module docs.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Config::from_env) with a custom source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::new()
            .development(lookup("NODE_ENV").as_deref() == Some("development"))
            .log_enabled(lookup("LOG").as_deref() != Some("false"));

        if let Some(raw) = lookup("KIROKU_UTC_OFFSET") {
            match raw.trim().parse::<i32>() {
                Ok(minutes) if minutes.abs() <= MAX_OFFSET_MINUTES => {
                    config = config.utc_offset_minutes(minutes);
                }
                _ => warn!(value = %raw, "ignoring invalid KIROKU_UTC_OFFSET"),
            }
        }
        if let Some(dir) = lookup("KIROKU_LOG_DIR").filter(|d| !d.is_empty()) {
            config = config.log_dir(dir);
        }
        config
    }

    pub fn development(mut self, on: bool) -> Self {
        self.development = on;
        self
    }

    pub fn log_enabled(mut self, on: bool) -> Self {
        self.log_enabled = on;
        self
    }

    pub fn utc_offset_minutes(mut self, minutes: i32) -> Self {
        self.utc_offset_minutes = minutes;
        self
    }

    /// Relative paths resolve against the working directory at write time.
    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    pub fn is_development(&self) -> bool { self.development }
    pub fn is_log_enabled(&self) -> bool { self.log_enabled }
    pub fn offset_minutes(&self) -> i32 { self.utc_offset_minutes }
    pub fn log_path(&self) -> &Path { &self.log_dir }
}

impl Default for Config {
    fn default() -> Self { Self::new() }
}
