//! Provides common types, utilities, and core runtime components for active objects.
//!
//! # Key Re-exported Components:
//!
//! *   [`ActiveApp`]: The entry point for initializing the runtime.
//! *   [`ActiveRuntime`]: Creates actors, publishes failures and shuts everything down.
//! *   [`ActorHandle`]: The interface for interacting with one running actor.
//! *   [`ActiveConfig`]: Configuration loaded from XDG-compliant locations.
//! *   [`ActiveError`]: The single error type returned across the crate.

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

// --- Public Re-exports ---
pub use active_app::ActiveApp;
pub use active_runtime::ActiveRuntime;
pub use actor_handle::ActorHandle;
pub use config::{ActiveConfig, DefaultsConfig, LimitsConfig, PathsConfig, TimeoutConfig, CONFIG};
pub use error::ActiveError;

// --- Crate-Internal Re-exports ---
pub use types::CallResult;
pub(crate) use types::{ActorSender, LifecycleHook};

// --- Submodules ---

/// Defines common internal type aliases.
mod types;

/// Defines the `ActiveApp` entry point for system initialization.
mod active_app;
/// Defines the internal state (`ActiveInner`) of the runtime.
mod active_inner;
/// Defines the `ActiveRuntime` for managing the system.
mod active_runtime;
/// Defines the `ActorHandle` for actor interaction.
mod actor_handle;
/// Defines the configuration system.
pub mod config;
/// Defines the crate's error type.
mod error;
