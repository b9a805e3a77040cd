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

use acton_ern::Ern;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::common::{ActiveConfig, ActorHandle};
use crate::message::FailureReport;

/// Internal state shared by every clone of an [`ActiveRuntime`](crate::common::ActiveRuntime).
#[derive(Debug)]
pub struct ActiveInner {
    /// Registry of running actors, keyed by their ERN.
    pub(crate) roots: DashMap<Ern, ActorHandle>,

    /// Token for coordinating forced shutdown across all actors.
    pub(crate) cancellation_token: CancellationToken,

    /// Runtime configuration.
    pub(crate) config: ActiveConfig,

    /// Failures of one-way calls and of calls whose caller went away.
    pub(crate) failures: broadcast::Sender<FailureReport>,
}

impl ActiveInner {
    pub(crate) fn new(config: ActiveConfig) -> Self {
        let (failures, _) = broadcast::channel(config.limits.failure_channel_capacity.max(1));
        Self {
            roots: DashMap::new(),
            cancellation_token: CancellationToken::new(),
            config,
            failures,
        }
    }
}
