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

use derive_new::new;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use static_assertions::assert_impl_all;
use tracing::{instrument, trace};

use crate::common::{ActiveError, CallResult};
use crate::message::Invocation;
use crate::proxy::{encode_arguments, ActorLocation, ActorRef, Invoker};
use crate::state::StateDescriptor;

/// The immutable association between an interface id and the actor serving it,
/// created once at configuration time.
#[derive(new, Debug)]
pub struct ProxyBinding {
    interface_id: String,
    actor_ref: ActorRef,
    state: Option<StateDescriptor>,
}

impl ProxyBinding {
    /// The bound interface.
    #[must_use]
    pub fn interface_id(&self) -> &str {
        &self.interface_id
    }

    /// The actor serving the interface.
    #[must_use]
    pub const fn actor_ref(&self) -> &ActorRef {
        &self.actor_ref
    }

    /// Shape of the actor's state, when it is known locally.
    #[must_use]
    pub const fn state(&self) -> Option<&StateDescriptor> {
        self.state.as_ref()
    }
}

/// Turns method calls on an interface into invocations of the actor bound to it.
///
/// The proxy holds no mutable state. Cloning it is cheap and every clone talks to
/// the same actor, local or remote. Typed wrappers are thin:
///
/// ```rust,ignore
/// #[derive(Clone)]
/// struct Counter(ActiveProxy);
///
/// impl Counter {
///     async fn increment(&self, by: i64) -> Result<i64, ActiveError> {
///         self.0.call("increment", by).await
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ActiveProxy {
    binding: Arc<ProxyBinding>,
}

assert_impl_all!(ActiveProxy: Send, Sync, Clone);

impl ActiveProxy {
    /// Wraps a binding.
    #[must_use]
    pub fn new(binding: ProxyBinding) -> Self {
        Self {
            binding: Arc::new(binding),
        }
    }

    /// The bound interface.
    #[must_use]
    pub fn interface_id(&self) -> &str {
        self.binding.interface_id()
    }

    /// The binding behind this proxy.
    #[must_use]
    pub fn binding(&self) -> &ProxyBinding {
        &self.binding
    }

    /// Where the bound actor runs.
    #[must_use]
    pub fn location(&self) -> ActorLocation {
        self.binding.actor_ref().location()
    }

    /// Calls `method` with `args` and waits for its decoded result.
    ///
    /// Pass `()` for no arguments, a single value for one, or a tuple for several.
    ///
    /// # Errors
    ///
    /// The method's failure, a timeout, or [`ActiveError::Serialization`] if the
    /// result does not decode into `Output`.
    #[instrument(skip(self, args), fields(interface = %self.interface_id()))]
    pub async fn call<Args, Output>(&self, method: &str, args: Args) -> Result<Output, ActiveError>
    where
        Args: Serialize + Send,
        Output: DeserializeOwned,
    {
        let value = self.call_raw(method, encode_arguments(&args)?).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Calls `method` with pre-encoded arguments and returns the raw JSON result.
    ///
    /// # Errors
    ///
    /// The method's failure or a timeout.
    pub async fn call_raw(&self, method: &str, arguments: Vec<Value>) -> CallResult {
        let invocation = Invocation::new(method, arguments);
        trace!(invocation = invocation.invocation_id, method, "proxy call");
        self.binding.actor_ref().invoke(invocation).await
    }

    /// Calls `method` without waiting for it to run.
    ///
    /// Failures while the method runs are published on the serving runtime's failure
    /// channel rather than returned.
    ///
    /// # Errors
    ///
    /// Failures to deliver the invocation, such as [`ActiveError::ActorStopped`].
    #[instrument(skip(self, args), fields(interface = %self.interface_id()))]
    pub async fn tell<Args>(&self, method: &str, args: Args) -> Result<(), ActiveError>
    where
        Args: Serialize + Send,
    {
        let invocation = Invocation::new(method, encode_arguments(&args)?);
        self.binding.actor_ref().invoke_one_way(invocation).await
    }
}
