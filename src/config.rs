//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::persistence::DEFAULT_BUFFER_SIZE;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Eviction sweep interval in milliseconds, 0 disables the sweep
    pub eviction_interval_ms: u64,
    /// Idle seconds before a payload is unloaded, 0 disables unloading
    pub unload_after_secs: u64,
    /// Primary persistence directory, None keeps the store in memory only
    pub data_dir: Option<PathBuf>,
    /// Optional secondary persistence directory receiving write-through
    pub backup_dir: Option<PathBuf>,
    /// Queue capacity of each write buffer
    pub write_buffer_size: usize,
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `EVICTION_INTERVAL_MS` - Eviction sweep interval (default: 1000)
    /// - `UNLOAD_AFTER_SECS` - Idle time before unloading (default: 300)
    /// - `DATA_DIR` - Primary persistence directory (default: unset)
    /// - `BACKUP_DIR` - Secondary persistence directory (default: unset)
    /// - `WRITE_BUFFER_SIZE` - Write buffer queue capacity (default: 64)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            eviction_interval_ms: parse_var("EVICTION_INTERVAL_MS")
                .unwrap_or(defaults.eviction_interval_ms),
            unload_after_secs: parse_var("UNLOAD_AFTER_SECS").unwrap_or(defaults.unload_after_secs),
            data_dir: env::var_os("DATA_DIR").map(PathBuf::from),
            backup_dir: env::var_os("BACKUP_DIR").map(PathBuf::from),
            write_buffer_size: parse_var("WRITE_BUFFER_SIZE")
                .unwrap_or(defaults.write_buffer_size),
        }
    }

    pub fn eviction_interval(&self) -> Duration {
        Duration::from_millis(self.eviction_interval_ms)
    }

    pub fn unload_after(&self) -> Duration {
        Duration::from_secs(self.unload_after_secs)
    }

    /// Persistence directories in write-through order.
    pub fn persistence_dirs(&self) -> impl Iterator<Item = &PathBuf> {
        self.data_dir.iter().chain(self.backup_dir.iter())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            eviction_interval_ms: 1000,
            unload_after_secs: 300,
            data_dir: None,
            backup_dir: None,
            write_buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}
