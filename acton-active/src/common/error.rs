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

//! The error taxonomy shared by state cells, actors, proxies and the remote protocol.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Every failure an active object can surface to its caller.
///
/// Errors are serializable so that a caller going through a remote proxy observes
/// exactly the same value a local caller would.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail")]
#[non_exhaustive]
pub enum ActiveError {
    /// `begin` was called while a transaction was already open.
    #[error("a transaction is already open")]
    AlreadyInTransaction,

    /// `write` or `commit` was called outside a transaction.
    #[error("no transaction is open")]
    NoActiveTransaction,

    /// The durable log refused an append or could not be read.
    #[error("persistence failure for entity '{entity_id}': {reason}")]
    PersistenceFailure {
        /// Entity whose log failed.
        entity_id: String,
        /// Description reported by the log.
        reason: String,
    },

    /// A nested commit failed after some children had already committed.
    ///
    /// The committed children have been compensated by the time this is returned.
    #[error("nested commit failed after {committed} of {total} children committed: {cause}")]
    PartialCommitFailure {
        /// Number of children that committed before the failure.
        committed: usize,
        /// Total number of children in the composer.
        total: usize,
        /// Failure of the child that could not commit.
        cause: Box<ActiveError>,
    },

    /// No reply arrived from a remote actor before the deadline.
    #[error("remote invocation {invocation_id} timed out after {timeout_ms} ms")]
    RemoteTimeout {
        /// Correlation id of the abandoned call.
        invocation_id: u64,
        /// Deadline that elapsed.
        timeout_ms: u64,
    },

    /// No binding or exposed actor exists for the interface id.
    #[error("unknown interface '{0}'")]
    UnknownInterface(String),

    /// The interface id is already bound.
    #[error("interface '{0}' is already bound")]
    BindingConflict(String),

    /// The interface has no method with this name.
    #[error("interface '{interface_id}' has no method '{method}'")]
    UnknownMethod {
        /// Interface the call was addressed to.
        interface_id: String,
        /// Requested method name.
        method: String,
    },

    /// The call arguments could not be decoded into the method's parameter type.
    #[error("invalid arguments for '{method}': {reason}")]
    InvalidArguments {
        /// Method being invoked.
        method: String,
        /// Decoder message.
        reason: String,
    },

    /// A value could not be converted to or from JSON.
    #[error("serialization failure: {0}")]
    Serialization(String),

    /// A local call did not complete before the configured call timeout.
    #[error("call to '{method}' timed out after {timeout_ms} ms")]
    CallTimeout {
        /// Method being invoked.
        method: String,
        /// Deadline that elapsed.
        timeout_ms: u64,
    },

    /// The target actor is stopping or has stopped.
    #[error("actor '{0}' is stopped")]
    ActorStopped(String),

    /// Business logic panicked while handling the call.
    #[error("method '{method}' panicked: {reason}")]
    ActorFailure {
        /// Method whose handler panicked.
        method: String,
        /// Panic payload, when it was a string.
        reason: String,
    },

    /// A business error returned by a method handler.
    #[error("{0}")]
    Application(String),

    /// The connection to a remote endpoint failed or was closed.
    #[error("transport failure: {0}")]
    Transport(String),

    /// A peer sent a frame or payload that violates the wire protocol.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// A nested state key does not address a child of the expected type.
    #[error("state key {0} does not address a child of the requested type")]
    InvalidStateKey(usize),

    /// The framework was configured inconsistently.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ActiveError {
    /// Builds an [`ActiveError::Application`] from any displayable business error.
    pub fn application(reason: impl std::fmt::Display) -> Self {
        Self::Application(reason.to_string())
    }

    /// Returns `true` for errors raised by the transport rather than by the actor.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Protocol(_) | Self::RemoteTimeout { .. }
        )
    }
}

impl From<serde_json::Error> for ActiveError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
