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

use std::sync::Arc;

use futures::future::join_all;
use tracing::{error, trace};

use crate::common::active_inner::ActiveInner;
use crate::common::{ActiveConfig, ActiveRuntime};

/// Represents the entry point for initializing the active object runtime.
///
/// This struct serves as a marker type to start the system. Use
/// [`ActiveApp::launch`] from synchronous code or [`ActiveApp::launch_async`] inside a
/// Tokio runtime; both read the configuration from the XDG config directory.
/// Actors are spawned onto the ambient Tokio runtime when they start, so either way
/// starting them requires one.
#[derive(Default, Debug, Clone)]
pub struct ActiveApp;

impl ActiveApp {
    /// Initializes the runtime from within an async context.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use acton_active::prelude::*;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let runtime = ActiveApp::launch_async().await;
    ///     // Use runtime...
    ///     runtime.shutdown_all().await.unwrap();
    /// }
    /// ```
    pub async fn launch_async() -> ActiveRuntime {
        Self::launch_async_with_config(crate::common::CONFIG.clone()).await
    }

    /// Initializes the runtime with an explicit configuration instead of the one loaded
    /// from disk.
    pub async fn launch_async_with_config(config: ActiveConfig) -> ActiveRuntime {
        Self::launch_with_config(config)
    }

    /// Initializes the runtime from synchronous code.
    #[must_use]
    pub fn launch() -> ActiveRuntime {
        Self::launch_with_config(crate::common::CONFIG.clone())
    }

    /// Synchronous counterpart of [`ActiveApp::launch_async_with_config`].
    #[must_use]
    pub fn launch_with_config(config: ActiveConfig) -> ActiveRuntime {
        trace!("Configuration loaded: {:?}", config);
        ActiveRuntime(Arc::new(ActiveInner::new(config)))
    }
}

impl ActiveRuntime {
    /// Stops every running actor, waiting at most the configured system shutdown timeout.
    ///
    /// Each actor finishes the invocation it is processing and answers the rest of its
    /// queue with [`ActiveError::ActorStopped`](crate::common::ActiveError::ActorStopped).
    ///
    /// # Errors
    ///
    /// The first failure reported by an actor's [`stop`](crate::common::ActorHandle::stop),
    /// or [`ActiveError::CallTimeout`](crate::common::ActiveError::CallTimeout) if the
    /// system timeout expired, in which case all remaining tasks are cancelled.
    pub async fn shutdown_all(&self) -> Result<(), crate::common::ActiveError> {
        let handles: Vec<_> = self.0.roots.iter().map(|item| item.value().clone()).collect();
        trace!(count = handles.len(), "Sending Terminate signal to all actors.");
        let stops = handles.iter().map(|handle| async move {
            let result = handle.stop().await;
            if let Err(e) = &result {
                error!("Error stopping actor {}: {:?}", handle.id(), e);
            }
            result
        });

        let timeout = self.0.config.system_shutdown_timeout();
        match tokio::time::timeout(timeout, join_all(stops)).await {
            Ok(results) => {
                trace!("All actors completed gracefully.");
                self.0.roots.clear();
                results.into_iter().collect()
            }
            Err(_) => {
                let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
                error!(
                    "System-wide shutdown timeout expired after {} ms. Forcefully cancelling remaining tasks.",
                    timeout_ms
                );
                self.0.cancellation_token.cancel();
                self.0.roots.clear();
                Err(crate::common::ActiveError::CallTimeout {
                    method: "shutdown_all".to_string(),
                    timeout_ms,
                })
            }
        }
    }
}
