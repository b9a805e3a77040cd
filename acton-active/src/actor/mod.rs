//! Defines the actor machinery behind every active object.
//!
//! *   [`ManagedActor`]: owns one piece of transactional state, its dispatch table and
//!     its mailbox, and runs the message loop.
//! *   [`Idle`]: A type-state marker indicating that a `ManagedActor` has been created
//!     but has not yet started its main processing loop.
//! *   [`Started`]: A type-state marker indicating that a `ManagedActor` is actively
//!     running and processing messages.
//! *   [`MailboxStatus`]: the observable state of an actor's loop.

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

pub use mailbox::MailboxStatus;
pub(crate) use mailbox::MailboxMonitor;
pub use managed_actor::started::Started;
pub use managed_actor::Idle;
pub use managed_actor::ManagedActor;

/// Contains the `ManagedActor` struct and its state-specific implementations (`Idle`, `Started`).
mod managed_actor;

mod mailbox;
