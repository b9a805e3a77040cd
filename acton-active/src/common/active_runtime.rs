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

use acton_ern::Ern;
use tokio::sync::broadcast;
use tracing::trace;

use crate::actor::{Idle, ManagedActor};
use crate::common::active_inner::ActiveInner;
use crate::common::{ActiveConfig, ActiveError, ActorHandle};
use crate::message::FailureReport;
use crate::proxy::DispatchTable;
use crate::state::Transactional;

/// Represents the initialized and active runtime.
///
/// Obtained from [`ActiveApp::launch`](crate::common::ActiveApp::launch). It creates
/// actors, keeps a registry of the running ones, publishes failures nobody else can
/// receive, and stops everything in [`ActiveRuntime::shutdown_all`]. It is cheap to clone.
#[derive(Debug, Clone)]
pub struct ActiveRuntime(pub(crate) Arc<ActiveInner>);

impl ActiveRuntime {
    /// Creates an idle actor named after its table's interface id.
    ///
    /// # Errors
    ///
    /// [`ActiveError::Configuration`] if the interface id is not a valid actor name.
    pub fn new_actor<State: Transactional>(
        &self,
        state: State,
        table: DispatchTable<State>,
    ) -> Result<ManagedActor<Idle, State>, ActiveError> {
        let name = table.interface_id().to_string();
        self.new_actor_with_name(&name, state, table)
    }

    /// Creates an idle actor with an explicit name.
    ///
    /// The actor is registered with the runtime right away, so
    /// [`ActiveRuntime::shutdown_all`] covers it once started.
    ///
    /// # Errors
    ///
    /// [`ActiveError::Configuration`] if `name` is not a valid actor name.
    pub fn new_actor_with_name<State: Transactional>(
        &self,
        name: &str,
        state: State,
        table: DispatchTable<State>,
    ) -> Result<ManagedActor<Idle, State>, ActiveError> {
        let actor = ManagedActor::new(self, name, state, table)?;
        trace!("Registering new actor: {}", actor.id());
        self.0.roots.insert(actor.id().clone(), actor.handle().clone());
        Ok(actor)
    }

    /// Creates and starts an actor in one step.
    ///
    /// # Errors
    ///
    /// Anything [`ActiveRuntime::new_actor`] or [`ManagedActor::start`] reports.
    pub async fn spawn_actor<State: Transactional>(
        &self,
        state: State,
        table: DispatchTable<State>,
    ) -> Result<ActorHandle, ActiveError> {
        self.new_actor(state, table)?.start().await
    }

    /// Number of actors currently registered.
    #[inline]
    #[must_use]
    pub fn actor_count(&self) -> usize {
        self.0.roots.len()
    }

    /// The configuration the runtime was launched with.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ActiveConfig {
        &self.0.config
    }

    /// Subscribes to failures of one-way calls and of calls whose caller went away.
    #[must_use]
    pub fn subscribe_failures(&self) -> broadcast::Receiver<FailureReport> {
        self.0.failures.subscribe()
    }

    pub(crate) fn report_failure(&self, report: FailureReport) {
        if self.0.failures.send(report).is_err() {
            trace!("no failure subscribers");
        }
    }

    pub(crate) fn forget(&self, id: &Ern) {
        self.0.roots.remove(id);
    }
}
