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

//! Defines common type aliases used within `acton-active`.

use acton_ern::Ern;
use serde_json::Value;
use tokio::sync::mpsc::Sender;

use crate::common::ActiveError;
use crate::message::MailboxItem;

/// The outcome of one invocation: the method's JSON-encoded return value or a failure.
pub type CallResult = Result<Value, ActiveError>;

/// Crate-internal: sending half of an actor's mailbox.
pub(crate) type ActorSender = Sender<MailboxItem>;

/// Crate-internal: a lifecycle hook, called with the actor's id and its state.
pub(crate) type LifecycleHook<State> = Box<dyn Fn(&Ern, &State) + Send + Sync + 'static>;
