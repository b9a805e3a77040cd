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

//! Configuration for remote dispatch, carried as the `[remote]` section of the
//! framework configuration file.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for remote listeners and connections.
///
/// # Example Configuration
///
/// ```toml
/// [remote.limits]
/// max_connections = 100
/// max_frame_size = 1048576  # 1 MiB
///
/// [remote.timeouts]
/// request_timeout_ms = 2000
/// connect_timeout_ms = 1000
/// heartbeat_interval_ms = 15000
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Connection and frame limits.
    pub limits: RemoteLimitsConfig,
    /// Timeout configuration.
    pub timeouts: RemoteTimeoutsConfig,
}

/// Limits for remote operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteLimitsConfig {
    /// Maximum concurrent inbound connections per listener.
    pub max_connections: usize,

    /// Maximum frame payload size in bytes.
    pub max_frame_size: usize,

    /// Capacity of each connection's outbound frame queue.
    pub outbound_queue: usize,
}

/// Timeout configuration for remote operations.
///
/// All values are in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteTimeoutsConfig {
    /// Deadline for a remote call's reply.
    #[serde(rename = "request_timeout_ms")]
    pub request: u64,

    /// Deadline for establishing a connection.
    #[serde(rename = "connect_timeout_ms")]
    pub connect: u64,

    /// Interval between heartbeat frames sent by a listener on an idle connection.
    #[serde(rename = "heartbeat_interval_ms")]
    pub heartbeat: u64,
}

impl Default for RemoteLimitsConfig {
    fn default() -> Self {
        Self {
            max_connections: 100,
            max_frame_size: 1_048_576, // 1 MiB
            outbound_queue: 256,
        }
    }
}

impl Default for RemoteTimeoutsConfig {
    fn default() -> Self {
        Self {
            request: 5_000,
            connect: 1_000,
            heartbeat: 15_000,
        }
    }
}

impl RemoteConfig {
    /// Get the request timeout as a `Duration`.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.request)
    }

    /// Get the connect timeout as a `Duration`.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.connect)
    }

    /// Get the heartbeat interval as a `Duration`.
    #[must_use]
    pub const fn heartbeat_interval(&self) -> Duration {
        // tokio intervals need a non-zero period
        if self.timeouts.heartbeat == 0 {
            return Duration::from_millis(1);
        }
        Duration::from_millis(self.timeouts.heartbeat)
    }

    /// Returns a copy with a different request deadline.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.request = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }
}
