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

use std::marker::PhantomData;

use acton_ern::Ern;
use tokio::sync::mpsc::channel;
use tracing::{debug, error, instrument, trace};

use crate::actor::{ManagedActor, Started};
use crate::common::{ActiveError, ActiveRuntime, ActorHandle};
use crate::proxy::DispatchTable;
use crate::state::Transactional;

/// Type-state marker for a [`ManagedActor`] that has been configured but not yet started.
///
/// While `Idle`, an actor can be given lifecycle hooks (e.g., [`ManagedActor::before_start`],
/// [`ManagedActor::after_stop`]) and further methods through [`ManagedActor::table_mut`].
/// [`ManagedActor::start`] moves it to the [`Started`] state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Idle;

impl<State: Transactional> ManagedActor<Idle, State> {
    pub(crate) fn new(
        runtime: &ActiveRuntime,
        name: &str,
        state: State,
        table: DispatchTable<State>,
    ) -> Result<Self, ActiveError> {
        let id = Ern::with_root(name).map_err(|e| ActiveError::Configuration(e.to_string()))?;
        let config = runtime.config();
        let (outbox, inbox) = channel(config.limits.mailbox_capacity.max(1));
        let handle = ActorHandle::new(
            id.clone(),
            name,
            table.interface_id(),
            outbox,
            runtime.0.cancellation_token.child_token(),
            config,
        );
        Ok(Self {
            handle,
            id,
            runtime: runtime.clone(),
            state,
            table,
            inbox,
            before_start: Box::new(|_, _| {}),
            after_start: Box::new(|_, _| {}),
            before_stop: Box::new(|_, _| {}),
            after_stop: Box::new(|_, _| {}),
            _actor_state: PhantomData,
        })
    }

    /// Mutable access to the state before the actor starts.
    #[inline]
    pub fn state_mut(&mut self) -> &mut State {
        &mut self.state
    }

    /// Mutable access to the dispatch table, to register further methods.
    #[inline]
    pub fn table_mut(&mut self) -> &mut DispatchTable<State> {
        &mut self.table
    }

    /// Registers a hook run after recovery, just before the message loop is spawned.
    pub fn before_start<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&Ern, &State) + Send + Sync + 'static,
    {
        self.before_start = Box::new(f);
        self
    }

    /// Registers a hook run by the message loop before it takes its first message.
    pub fn after_start<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&Ern, &State) + Send + Sync + 'static,
    {
        self.after_start = Box::new(f);
        self
    }

    /// Registers a hook run when the loop begins shutting down, before queued messages
    /// are answered.
    pub fn before_stop<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&Ern, &State) + Send + Sync + 'static,
    {
        self.before_stop = Box::new(f);
        self
    }

    /// Registers a hook run once the mailbox is drained and marked stopped.
    pub fn after_stop<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&Ern, &State) + Send + Sync + 'static,
    {
        self.after_stop = Box::new(f);
        self
    }

    /// Recovers the actor's state and spawns its message loop.
    ///
    /// # Errors
    ///
    /// Whatever [`Transactional::recover`] reports; the actor is not started in that case.
    #[instrument(skip(self), fields(actor = %self.handle.name))]
    pub async fn start(mut self) -> Result<ActorHandle, ActiveError> {
        trace!("Starting actor: {}", self.id());
        if let Err(err) = self.state.recover() {
            error!("state recovery failed: {err}");
            self.runtime.forget(&self.id);
            return Err(err);
        }
        debug!(version = self.state.version(), "state recovered");

        (self.before_start)(&self.id, &self.state);

        let handle = self.handle.clone();
        let actor: ManagedActor<Started, State> = self.transition();
        handle.tracker().spawn(actor.wake());
        handle.tracker().close();

        trace!("Actor {} started successfully.", handle.name());
        Ok(handle)
    }
}
