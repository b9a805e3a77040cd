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

/// Represents system-level signals used to manage actor lifecycles.
///
/// Signals travel through the same mailbox as invocations, so everything enqueued
/// before a signal is seen before it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SystemSignal {
    /// Instructs an actor to initiate a graceful shutdown.
    ///
    /// Upon receiving `Terminate`, the actor leaves its message loop, answers anything
    /// still queued with [`ActiveError::ActorStopped`](crate::common::ActiveError::ActorStopped),
    /// runs its stop hooks and marks its mailbox stopped.
    Terminate,
}
