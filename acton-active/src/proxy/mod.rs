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

//! The proxy layer: dispatch tables on the actor side, proxies on the caller side, and
//! the [`ActorRef`] seam between them.

pub use active_proxy::{ActiveProxy, ProxyBinding};
pub use actor_ref::{ActorLocation, ActorRef, Invoker, RemoteActorRef};
pub use arguments::{decode_arguments, encode_arguments};
pub use dispatch_table::DispatchTable;
pub(crate) use dispatch_table::MethodEntry;

mod active_proxy;
mod arguments;
mod actor_ref;
mod dispatch_table;
