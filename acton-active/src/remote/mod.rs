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

//! Remote dispatch: invocations and results carried across a process boundary.
//!
//! A [`RemoteListener`] serves exposed actors over TCP; a [`RemoteConnection`] is the
//! calling side. Both speak the length-prefixed frame protocol in [`protocol`].

pub use client::{RemoteClientStats, RemoteConnection};
pub use config::{RemoteConfig, RemoteLimitsConfig, RemoteTimeoutsConfig};
pub use listener::{ExposedActors, RemoteListener, RemoteListenerHandle, RemoteListenerStats};
pub use types::{WireRequest, WireResponse, WireStatus, REQUEST_SCHEMA, RESPONSE_SCHEMA};

mod client;
mod config;
mod listener;
pub mod protocol;
mod types;
