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

use std::fmt::Debug;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::common::{ActiveError, ActorHandle, CallResult};
use crate::message::Invocation;
use crate::remote::RemoteConnection;

/// Delivers invocations to an actor, wherever it runs.
///
/// Implemented by [`ActorHandle`] for actors in this process, by [`RemoteActorRef`] for
/// actors behind a remote connection, and by [`ActorRef`], which is the only place that
/// chooses between the two.
#[async_trait]
pub trait Invoker: Debug + Send + Sync {
    /// Sends `invocation` and waits for its result.
    async fn invoke(&self, invocation: Invocation) -> CallResult;

    /// Sends `invocation` without waiting for a result.
    async fn invoke_one_way(&self, invocation: Invocation) -> Result<(), ActiveError>;
}

#[async_trait]
impl Invoker for ActorHandle {
    async fn invoke(&self, invocation: Invocation) -> CallResult {
        self.call(invocation).await
    }

    async fn invoke_one_way(&self, invocation: Invocation) -> Result<(), ActiveError> {
        self.tell(invocation).await
    }
}

/// An actor exposed by another process, addressed by its interface id over a
/// [`RemoteConnection`].
#[derive(Debug, Clone)]
pub struct RemoteActorRef {
    interface_id: String,
    connection: RemoteConnection,
}

impl RemoteActorRef {
    /// Addresses the actor exposing `interface_id` at the other end of `connection`.
    pub fn new(interface_id: impl Into<String>, connection: RemoteConnection) -> Self {
        Self {
            interface_id: interface_id.into(),
            connection,
        }
    }

    /// The remote interface id.
    #[must_use]
    pub fn interface_id(&self) -> &str {
        &self.interface_id
    }

    /// The connection calls travel over.
    #[must_use]
    pub const fn connection(&self) -> &RemoteConnection {
        &self.connection
    }
}

#[async_trait]
impl Invoker for RemoteActorRef {
    async fn invoke(&self, invocation: Invocation) -> CallResult {
        self.connection.call(&self.interface_id, invocation).await
    }

    async fn invoke_one_way(&self, invocation: Invocation) -> Result<(), ActiveError> {
        self.connection.tell(&self.interface_id, invocation).await
    }
}

/// Where a binding's actor runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActorLocation {
    /// In this process, under the given actor name.
    Local {
        /// Actor name.
        actor: String,
    },
    /// Behind a remote listener at the given address.
    Remote {
        /// Listener address.
        address: String,
    },
}

/// A reference to an actor that is either local or remote.
#[derive(Debug, Clone)]
pub enum ActorRef {
    /// An actor in this process.
    Local(ActorHandle),
    /// An actor in another process.
    Remote(RemoteActorRef),
}

impl ActorRef {
    /// Where the referenced actor runs.
    #[must_use]
    pub fn location(&self) -> ActorLocation {
        match self {
            Self::Local(handle) => ActorLocation::Local {
                actor: handle.name().to_string(),
            },
            Self::Remote(remote) => ActorLocation::Remote {
                address: remote.connection().address().to_string(),
            },
        }
    }

    fn invoker(&self) -> &dyn Invoker {
        match self {
            Self::Local(handle) => handle,
            Self::Remote(remote) => remote,
        }
    }
}

#[async_trait]
impl Invoker for ActorRef {
    async fn invoke(&self, invocation: Invocation) -> CallResult {
        self.invoker().invoke(invocation).await
    }

    async fn invoke_one_way(&self, invocation: Invocation) -> Result<(), ActiveError> {
        self.invoker().invoke_one_way(invocation).await
    }
}
