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

use std::fmt;
use std::fmt::Debug;
use std::fmt::Formatter;
use std::marker::PhantomData;

use acton_ern::Ern;
use tokio::sync::mpsc::Receiver;

pub use idle::Idle;

use crate::common::{ActiveRuntime, ActorHandle, LifecycleHook};
use crate::message::MailboxItem;
use crate::proxy::DispatchTable;
use crate::state::Transactional;

mod idle;
/// Contains the `Started` type-state marker and associated implementations for running actors.
pub mod started;

/// An actor that owns one piece of transactional state and serves an interface.
///
/// `ManagedActor` uses a type-state pattern via the `ActorState` parameter ([`Idle`],
/// [`started::Started`]). While idle, the actor can be given lifecycle hooks and more
/// methods; [`ManagedActor::start`] recovers its state and spawns the message loop, after
/// which the actor is reached only through its [`ActorHandle`].
///
/// # Type Parameters
///
/// *   `ActorState`: A marker type indicating the current lifecycle state of the actor.
/// *   `State`: The actor's state. Every mutating method runs inside one transaction on it.
pub struct ManagedActor<ActorState, State: Transactional> {
    /// Handle for external interaction with this actor.
    pub(crate) handle: ActorHandle,

    /// The actor's unique identifier.
    pub(crate) id: Ern,

    /// Reference to the runtime this actor belongs to.
    pub(crate) runtime: ActiveRuntime,

    /// The state owned by this actor.
    pub(crate) state: State,

    /// Methods this actor answers.
    pub(crate) table: DispatchTable<State>,

    /// MPSC receiver for incoming invocations and signals.
    pub(crate) inbox: Receiver<MailboxItem>,

    /// Hook executed before the message loop is spawned.
    pub(crate) before_start: LifecycleHook<State>,
    /// Hook executed as the message loop begins.
    pub(crate) after_start: LifecycleHook<State>,
    /// Hook executed when the loop begins shutting down.
    pub(crate) before_stop: LifecycleHook<State>,
    /// Hook executed after the mailbox is drained and stopped.
    pub(crate) after_stop: LifecycleHook<State>,

    _actor_state: PhantomData<ActorState>,
}

impl<ActorState, State: Transactional> ManagedActor<ActorState, State> {
    /// Returns a reference to the actor's unique identifier (`Ern`).
    #[inline]
    pub const fn id(&self) -> &Ern {
        &self.id
    }

    /// Returns the name the actor was created with.
    #[inline]
    pub fn name(&self) -> &str {
        self.handle.name()
    }

    /// Returns a reference to the actor's [`ActorHandle`].
    #[inline]
    pub const fn handle(&self) -> &ActorHandle {
        &self.handle
    }

    /// Returns a reference to the [`ActiveRuntime`] this actor belongs to.
    #[inline]
    pub const fn runtime(&self) -> &ActiveRuntime {
        &self.runtime
    }

    /// Returns the actor's state.
    #[inline]
    pub const fn state(&self) -> &State {
        &self.state
    }

    fn transition<Next>(self) -> ManagedActor<Next, State> {
        ManagedActor {
            handle: self.handle,
            id: self.id,
            runtime: self.runtime,
            state: self.state,
            table: self.table,
            inbox: self.inbox,
            before_start: self.before_start,
            after_start: self.after_start,
            before_stop: self.before_stop,
            after_stop: self.after_stop,
            _actor_state: PhantomData,
        }
    }
}

impl<ActorState, State: Transactional> Debug for ManagedActor<ActorState, State> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedActor")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}
