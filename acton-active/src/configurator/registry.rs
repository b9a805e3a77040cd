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

use std::collections::HashMap;
use std::net::SocketAddr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::common::{ActiveError, ActiveRuntime};
use crate::proxy::{ActiveProxy, ActorLocation, ActorRef, DispatchTable, ProxyBinding, RemoteActorRef};
use crate::remote::{ExposedActors, RemoteConnection, RemoteListener, RemoteListenerHandle};
use crate::state::{StateDescriptor, Transactional};

/// Everything needed to run an interface locally: its state, its dispatch table and
/// how the actor is published.
#[derive(Debug)]
pub struct LocalRegistration<State: Transactional> {
    state: State,
    table: DispatchTable<State>,
    name: Option<String>,
    exposed: bool,
}

impl<State: Transactional> LocalRegistration<State> {
    /// Serves `table`'s interface with an actor owning `state`.
    pub fn new(state: State, table: DispatchTable<State>) -> Self {
        Self {
            state,
            table,
            name: None,
            exposed: false,
        }
    }

    /// Names the actor; by default it is named after the interface id.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Makes the actor reachable through this configurator's remote listeners.
    #[must_use]
    pub const fn exposed(mut self) -> Self {
        self.exposed = true;
        self
    }
}

/// A snapshot of one binding, as reported by [`ActiveObjectConfigurator::bindings`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingInfo {
    /// The bound interface.
    pub interface_id: String,
    /// Where the serving actor runs.
    pub location: ActorLocation,
    /// Shape of the actor's state; unknown for remote bindings.
    pub state: Option<StateDescriptor>,
    /// Whether the actor is reachable through remote listeners.
    pub exposed: bool,
}

/// Builds proxies for declared interfaces and wires them to local or remote actors.
///
/// The configurator is an ordinary value: create one per application (or per test),
/// register every interface once, and hand out proxies. Each interface id may be bound
/// once; bindings live as long as the configurator.
///
/// ```rust,ignore
/// let runtime = ActiveApp::launch_async().await;
/// let mut configurator = ActiveObjectConfigurator::new(&runtime);
/// let counter = configurator
///     .register_local(LocalRegistration::new(StateCell::new(0_i64), counter_table()))
///     .await?;
/// let value: i64 = counter.call("increment", 1).await?;
/// ```
#[derive(Debug)]
pub struct ActiveObjectConfigurator {
    runtime: ActiveRuntime,
    bindings: HashMap<String, ActiveProxy>,
    exposed: ExposedActors,
    connections: HashMap<String, RemoteConnection>,
    listeners: Vec<RemoteListenerHandle>,
}

impl ActiveObjectConfigurator {
    /// Creates a configurator whose local actors run on `runtime`.
    #[must_use]
    pub fn new(runtime: &ActiveRuntime) -> Self {
        Self {
            runtime: runtime.clone(),
            bindings: HashMap::new(),
            exposed: ExposedActors::default(),
            connections: HashMap::new(),
            listeners: Vec::new(),
        }
    }

    /// The runtime local actors are started on.
    #[must_use]
    pub const fn runtime(&self) -> &ActiveRuntime {
        &self.runtime
    }

    /// Starts an actor for the registration's interface and returns a proxy to it.
    ///
    /// # Errors
    ///
    /// [`ActiveError::BindingConflict`] if the interface is already bound, or whatever
    /// starting the actor reports, such as a failed state recovery.
    #[instrument(skip(self, registration), fields(interface = %registration.table.interface_id()))]
    pub async fn register_local<State: Transactional>(
        &mut self,
        registration: LocalRegistration<State>,
    ) -> Result<ActiveProxy, ActiveError> {
        let LocalRegistration {
            state,
            table,
            name,
            exposed,
        } = registration;
        let interface_id = table.interface_id().to_string();
        self.ensure_unbound(&interface_id)?;

        let name = name.unwrap_or_else(|| interface_id.clone());
        let descriptor = state.descriptor();
        let actor = self.runtime.new_actor_with_name(&name, state, table)?;
        let handle = actor.start().await?;
        if exposed {
            self.exposed.insert(interface_id.clone(), handle.clone());
        }

        let binding = ProxyBinding::new(interface_id.clone(), ActorRef::Local(handle), Some(descriptor));
        info!(actor = %name, exposed, "bound local interface");
        Ok(self.bind(interface_id, binding))
    }

    /// Binds `interface_id` to the actor exposed under that id by the listener at
    /// `address`. Connections are shared between bindings to the same address.
    ///
    /// # Errors
    ///
    /// [`ActiveError::BindingConflict`] if the interface is already bound, or
    /// [`ActiveError::Transport`] if the listener cannot be reached.
    #[instrument(skip(self))]
    pub async fn register_remote(
        &mut self,
        interface_id: &str,
        address: &str,
    ) -> Result<ActiveProxy, ActiveError> {
        self.ensure_unbound(interface_id)?;
        let connection = self.connection(address).await?;
        let binding = ProxyBinding::new(
            interface_id.to_string(),
            ActorRef::Remote(RemoteActorRef::new(interface_id, connection)),
            None,
        );
        info!("bound remote interface");
        Ok(self.bind(interface_id.to_string(), binding))
    }

    /// The proxy bound to `interface_id`.
    ///
    /// # Errors
    ///
    /// [`ActiveError::UnknownInterface`] if nothing is bound to it.
    pub fn proxy(&self, interface_id: &str) -> Result<ActiveProxy, ActiveError> {
        self.bindings
            .get(interface_id)
            .cloned()
            .ok_or_else(|| ActiveError::UnknownInterface(interface_id.to_string()))
    }

    /// All bindings, sorted by interface id.
    #[must_use]
    pub fn bindings(&self) -> Vec<BindingInfo> {
        let mut infos: Vec<BindingInfo> = self
            .bindings
            .iter()
            .map(|(interface_id, proxy)| BindingInfo {
                interface_id: interface_id.clone(),
                location: proxy.location(),
                state: proxy.binding().state().cloned(),
                exposed: self.exposed.contains_key(interface_id),
            })
            .collect();
        infos.sort_by(|a, b| a.interface_id.cmp(&b.interface_id));
        infos
    }

    /// Makes an already bound local interface reachable through remote listeners.
    ///
    /// # Errors
    ///
    /// [`ActiveError::UnknownInterface`] if nothing is bound to it, or
    /// [`ActiveError::Configuration`] if it is bound to a remote actor.
    pub fn expose(&self, interface_id: &str) -> Result<(), ActiveError> {
        let proxy = self.proxy(interface_id)?;
        match proxy.binding().actor_ref() {
            ActorRef::Local(handle) => {
                self.exposed.insert(interface_id.to_string(), handle.clone());
                debug!(interface = interface_id, "exposed");
                Ok(())
            }
            ActorRef::Remote(_) => Err(ActiveError::Configuration(format!(
                "{interface_id} is bound to a remote actor and cannot be re-exposed"
            ))),
        }
    }

    /// Starts a listener on `address` serving every exposed interface, including ones
    /// exposed later.
    ///
    /// # Errors
    ///
    /// [`ActiveError::Transport`] if the address cannot be bound.
    #[instrument(skip(self))]
    pub async fn serve(&mut self, address: &str) -> Result<SocketAddr, ActiveError> {
        let listener =
            RemoteListener::bind(address, self.runtime.config().remote.clone(), self.exposed.clone())
                .await?;
        let handle = listener.spawn(self.runtime.0.cancellation_token.child_token())?;
        let local_addr = handle.local_addr();
        self.listeners.push(handle);
        Ok(local_addr)
    }

    /// Listeners started by [`ActiveObjectConfigurator::serve`].
    #[must_use]
    pub fn listeners(&self) -> &[RemoteListenerHandle] {
        &self.listeners
    }

    /// Stops listeners, closes connections and stops every actor on the runtime.
    ///
    /// # Errors
    ///
    /// Whatever [`ActiveRuntime::shutdown_all`] reports.
    pub async fn shutdown(&mut self) -> Result<(), ActiveError> {
        for listener in self.listeners.drain(..) {
            listener.shutdown().await;
        }
        for (address, connection) in self.connections.drain() {
            debug!(%address, "closing connection");
            connection.close();
        }
        self.exposed.clear();
        self.bindings.clear();
        self.runtime.shutdown_all().await
    }

    fn ensure_unbound(&self, interface_id: &str) -> Result<(), ActiveError> {
        if self.bindings.contains_key(interface_id) {
            warn!(interface = interface_id, "interface already bound");
            return Err(ActiveError::BindingConflict(interface_id.to_string()));
        }
        Ok(())
    }

    async fn connection(&mut self, address: &str) -> Result<RemoteConnection, ActiveError> {
        if let Some(connection) = self.connections.get(address) {
            if !connection.is_closed() {
                return Ok(connection.clone());
            }
        }
        let connection = RemoteConnection::connect(address, &self.runtime.config().remote).await?;
        self.connections.insert(address.to_string(), connection.clone());
        Ok(connection)
    }

    fn bind(&mut self, interface_id: String, binding: ProxyBinding) -> ActiveProxy {
        let proxy = ActiveProxy::new(binding);
        self.bindings.insert(interface_id, proxy.clone());
        proxy
    }
}
