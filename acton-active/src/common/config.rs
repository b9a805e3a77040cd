/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

use std::path::{Path, PathBuf};
use std::time::Duration;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::remote::RemoteConfig;

/// Configuration for the Acton Active framework.
///
/// Loaded from `$XDG_CONFIG_HOME/acton-active/config.toml`. Every section is optional;
/// missing keys take their default values.
///
/// ```toml
/// [timeouts]
/// call_timeout_ms = 5000
///
/// [limits]
/// mailbox_capacity = 255
///
/// [remote.timeouts]
/// request_timeout_ms = 2000
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ActiveConfig {
    /// Timeout configuration
    pub timeouts: TimeoutConfig,
    /// Limits and capacity configuration
    pub limits: LimitsConfig,
    /// Default values configuration
    pub defaults: DefaultsConfig,
    /// Path configuration for log and data directories
    pub paths: PathsConfig,
    /// Remote dispatch configuration
    pub remote: RemoteConfig,
}

/// Timeout-related configuration values, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for a synchronous call to a local actor
    pub call_timeout_ms: u64,
    /// Time an actor gets to drain its mailbox when stopped
    pub actor_shutdown_timeout_ms: u64,
    /// Time the whole runtime gets to stop every actor
    pub system_shutdown_timeout_ms: u64,
}

/// Limits and capacity configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Capacity of each actor's mailbox channel
    pub mailbox_capacity: usize,
    /// Capacity of the runtime failure channel
    pub failure_channel_capacity: usize,
}

/// Default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Actor name used when none is provided
    pub actor_name: String,
}

/// Path configuration for various directories
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory for log files
    pub log_directory: String,
    /// Directory where file-backed durable logs are kept
    pub data_directory: String,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: 5_000,
            actor_shutdown_timeout_ms: 10_000,
            system_shutdown_timeout_ms: 30_000,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 255,
            failure_channel_capacity: 64,
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            actor_name: "active".to_string(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            log_directory: "~/.local/share/acton-active/logs".to_string(),
            data_directory: "~/.local/share/acton-active/data".to_string(),
        }
    }
}

impl ActiveConfig {
    /// Deadline for synchronous local calls.
    #[must_use]
    pub const fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.call_timeout_ms)
    }

    /// Time a single actor gets to finish its in-flight work when stopped.
    #[must_use]
    pub const fn actor_shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.actor_shutdown_timeout_ms)
    }

    /// Convert system shutdown timeout to Duration
    #[must_use]
    pub const fn system_shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.system_shutdown_timeout_ms)
    }

    /// Resolves the data directory, expanding a leading `~` against `$HOME`.
    #[must_use]
    pub fn data_directory(&self) -> PathBuf {
        expand_home(&self.paths.data_directory)
    }

    /// Load configuration from XDG-compliant locations
    ///
    /// Looks for `acton-active/config.toml` under `$XDG_CONFIG_HOME` (falling back to
    /// `~/.config`). If no configuration file is found, returns the default configuration.
    /// If a configuration file exists but is malformed, logs an error and uses defaults.
    pub fn load() -> Self {
        let xdg_dirs = match xdg::BaseDirectories::with_prefix("acton-active") {
            Ok(dirs) => dirs,
            Err(e) => {
                error!("Failed to initialize XDG directories: {}", e);
                return Self::default();
            }
        };

        if let Some(path) = xdg_dirs.find_config_file("config.toml") {
            Self::load_from(&path)
        } else {
            info!("No configuration file found, using defaults");
            Self::default()
        }
    }

    /// Load configuration from an explicit file, falling back to defaults on any error.
    pub fn load_from(path: &Path) -> Self {
        info!("Loading configuration from: {}", path.display());
        match std::fs::read_to_string(path) {
            Ok(config_str) => match toml::from_str::<Self>(&config_str) {
                Ok(config) => {
                    info!("Successfully loaded configuration");
                    config
                }
                Err(e) => {
                    error!("Failed to parse configuration file {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                error!("Failed to read configuration file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), std::env::var_os("HOME")) {
        (Some(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => PathBuf::from(path),
    }
}

lazy_static! {
    /// Process-wide configuration loaded from XDG-compliant locations.
    ///
    /// Each runtime takes its own copy at launch, so tests may build runtimes with
    /// other values through [`ActiveApp::launch_async_with_config`](crate::common::ActiveApp::launch_async_with_config).
    pub static ref CONFIG: ActiveConfig = ActiveConfig::load();
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = ActiveConfig::default();
        assert_eq!(config.call_timeout(), Duration::from_millis(5_000));
        assert_eq!(config.limits.mailbox_capacity, 255);
        assert_eq!(config.defaults.actor_name, "active");
        assert_eq!(config.remote.limits.max_connections, 100);
    }

    #[test]
    fn partial_files_keep_defaults_for_missing_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[timeouts]\ncall_timeout_ms = 250\n\n[remote.timeouts]\nrequest_timeout_ms = 2000"
        )
        .unwrap();

        let config = ActiveConfig::load_from(file.path());
        assert_eq!(config.timeouts.call_timeout_ms, 250);
        assert_eq!(config.timeouts.system_shutdown_timeout_ms, 30_000);
        assert_eq!(config.remote.request_timeout(), Duration::from_millis(2_000));
    }

    #[test]
    fn malformed_files_fall_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[timeouts\ncall_timeout_ms = ").unwrap();

        let config = ActiveConfig::load_from(file.path());
        assert_eq!(config.timeouts.call_timeout_ms, 5_000);
    }

    #[test]
    fn home_prefix_is_expanded() {
        let mut config = ActiveConfig::default();
        config.paths.data_directory = "/var/lib/active".to_string();
        assert_eq!(config.data_directory(), PathBuf::from("/var/lib/active"));
    }
}
