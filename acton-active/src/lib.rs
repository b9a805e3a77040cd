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

#![forbid(unsafe_code)]
#![forbid(missing_docs)] // Keep this to enforce coverage

//! # Acton Active
//!
//! Transactional active objects on top of a Tokio actor runtime.
//!
//! ## Key Concepts
//!
//! - **State (`Transactional`)**: every piece of actor state opens, commits and rolls back
//!   transactions. [`StateCell`](prelude::StateCell) keeps a value in memory,
//!   [`PersistentCell`](prelude::PersistentCell) appends each commit to a durable log
//!   before acknowledging it, and [`NestedState`](prelude::NestedState) commits several
//!   children as one unit.
//! - **Actors (`ManagedActor`)**: each actor owns one state and drains its mailbox one
//!   invocation at a time. A mutating method runs inside a transaction that is committed
//!   on success and rolled back on an error or a panic.
//! - **Dispatch (`DispatchTable`)**: maps method names to closures that decode the JSON
//!   arguments, run the business logic and encode the result.
//! - **Proxies (`ActiveProxy`)**: turn method calls into invocations, for an actor in
//!   this process or one behind a [`remote`] listener.
//! - **Configurator (`ActiveObjectConfigurator`)**: binds each interface id once and
//!   hands out proxies.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use acton_active::prelude::*;
//!
//! let runtime = ActiveApp::launch_async().await;
//! let mut table = DispatchTable::new("counter");
//! table.mutate_on("increment", |cell: &mut StateCell<i64>, by: i64| {
//!     cell.update(|value| {
//!         *value += by;
//!         *value
//!     })
//! });
//!
//! let mut configurator = ActiveObjectConfigurator::new(&runtime);
//! let counter = configurator
//!     .register_local(LocalRegistration::new(StateCell::new(0_i64), table))
//!     .await?;
//! let value: i64 = counter.call("increment", 5).await?;
//! ```

/// Internal utilities and structures used throughout the framework.
pub(crate) mod common;

/// Defines the actor that owns a state and runs its message loop.
pub(crate) mod actor;

/// Defines invocations, envelopes and reply targets.
pub(crate) mod message;

/// Defines transactional state: cells and nested composers.
pub(crate) mod state;

/// Defines durable logs and state backed by them.
pub(crate) mod persistence;

/// Defines dispatch tables, actor references and proxies.
pub(crate) mod proxy;

/// Defines the configurator that binds interfaces to actors.
pub(crate) mod configurator;

/// Remote dispatch over TCP.
///
/// Listeners, connections, wire payloads and the frame protocol. Most applications
/// only need [`ActiveObjectConfigurator::serve`](prelude::ActiveObjectConfigurator::serve)
/// and [`register_remote`](prelude::ActiveObjectConfigurator::register_remote); the
/// items here are for tooling and tests that speak the protocol directly.
pub mod remote;

/// A prelude module for conveniently importing the most commonly used items.
///
/// # Re-exports
///
/// ## Macros (from `acton-active-macro`)
/// *   `active_state`: Attribute macro for state value types.
/// *   `active_message`: Attribute macro for argument and result types.
/// *   `active_main`: Attribute macro for an application's async entry point.
///
/// ## External Crates
/// *   [`acton_ern::*`](https://docs.rs/acton-ern): All items from the `acton-ern` crate for unique resource naming.
/// *   [`async_trait::async_trait`](https://docs.rs/async-trait/latest/async_trait/attr.async_trait.html): The macro for defining async functions in traits.
/// *   `serde` and `tokio`, used by the code the macros generate.
pub mod prelude {
    // Macros from acton-active-macro
    pub use acton_active_macro::*;

    // External crate re-exports
    pub use acton_ern::*;
    pub use async_trait::async_trait;
    pub use serde;
    pub use tokio;

    // Core types
    pub use crate::actor::{Idle, MailboxStatus, ManagedActor, Started};
    pub use crate::common::config::{
        ActiveConfig, DefaultsConfig, LimitsConfig, PathsConfig, TimeoutConfig, CONFIG,
    };
    pub use crate::common::{ActiveApp, ActiveError, ActiveRuntime, ActorHandle, CallResult};
    pub use crate::configurator::{ActiveObjectConfigurator, BindingInfo, LocalRegistration};
    pub use crate::message::{Envelope, FailureReport, Invocation, ReplyTarget, SystemSignal};
    pub use crate::persistence::{
        replay, BackedCell, DurableLog, EntryKind, FileLog, InMemoryLog, LogEntry, LogError,
        PersistentCell, StateBackend,
    };
    pub use crate::proxy::{
        decode_arguments, encode_arguments, ActiveProxy, ActorLocation, ActorRef, DispatchTable,
        Invoker, ProxyBinding, RemoteActorRef,
    };
    pub use crate::remote::{RemoteConfig, RemoteConnection, RemoteListenerHandle};
    pub use crate::state::{
        BackendKind, NestedState, StateCell, StateDescriptor, StateKey, Transactional,
    };
}
