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
use std::fmt;
use std::fmt::{Debug, Formatter};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{trace, warn};

use crate::common::{ActiveError, CallResult};
use crate::proxy::decode_arguments;

/// Crate-internal: a mutating method, run inside a transaction.
pub(crate) type MutatingHandler<State> =
    dyn Fn(&mut State, &[Value]) -> CallResult + Send + Sync + 'static;

/// Crate-internal: a read-only method, run without a transaction.
pub(crate) type ReadOnlyHandler<State> = dyn Fn(&State, &[Value]) -> CallResult + Send + Sync + 'static;

/// Crate-internal: one registered method.
pub(crate) enum MethodEntry<State> {
    Mutating(Box<MutatingHandler<State>>),
    ReadOnly(Box<ReadOnlyHandler<State>>),
}

/// Maps the method names of one interface to the code that runs them.
///
/// Each entry decodes the invocation's JSON arguments into the method's parameter type,
/// calls the business logic on the actor's state and encodes the return value. Handlers
/// registered with [`DispatchTable::mutate_on`] run inside a transaction;
/// [`DispatchTable::act_on`] handlers only read the state.
///
/// # Example
///
/// ```rust
/// use acton_active::prelude::*;
///
/// let mut table = DispatchTable::<StateCell<i64>>::new("counter");
/// table
///     .mutate_on("increment", |cell: &mut StateCell<i64>, by: i64| {
///         cell.update(|value| {
///             *value += by;
///             *value
///         })
///     })
///     .act_on("read", |cell: &StateCell<i64>, (): ()| Ok(*cell.read()));
/// assert!(table.contains("increment"));
/// ```
pub struct DispatchTable<State> {
    interface_id: String,
    methods: HashMap<String, MethodEntry<State>>,
}

impl<State: 'static> DispatchTable<State> {
    /// Creates an empty table for `interface_id`.
    pub fn new(interface_id: impl Into<String>) -> Self {
        Self {
            interface_id: interface_id.into(),
            methods: HashMap::new(),
        }
    }

    /// Registers a method that changes state.
    ///
    /// The handler receives the state with a transaction already open. Returning `Err`
    /// rolls the transaction back.
    pub fn mutate_on<Args, Output, F>(&mut self, method: &str, handler: F) -> &mut Self
    where
        Args: DeserializeOwned,
        Output: Serialize,
        F: Fn(&mut State, Args) -> Result<Output, ActiveError> + Send + Sync + 'static,
    {
        let name = method.to_string();
        let entry = MethodEntry::Mutating(Box::new(move |state: &mut State, arguments: &[Value]| -> CallResult {
            let args = decode_arguments::<Args>(&name, arguments)?;
            let output = handler(state, args)?;
            Ok(serde_json::to_value(output)?)
        }));
        self.insert(method, entry);
        self
    }

    /// Registers a method that only reads state. It runs without a transaction.
    pub fn act_on<Args, Output, F>(&mut self, method: &str, handler: F) -> &mut Self
    where
        Args: DeserializeOwned,
        Output: Serialize,
        F: Fn(&State, Args) -> Result<Output, ActiveError> + Send + Sync + 'static,
    {
        let name = method.to_string();
        let entry = MethodEntry::ReadOnly(Box::new(move |state: &State, arguments: &[Value]| -> CallResult {
            let args = decode_arguments::<Args>(&name, arguments)?;
            let output = handler(state, args)?;
            Ok(serde_json::to_value(output)?)
        }));
        self.insert(method, entry);
        self
    }

    fn insert(&mut self, method: &str, entry: MethodEntry<State>) {
        trace!(interface = %self.interface_id, method, "registering method");
        if self.methods.insert(method.to_string(), entry).is_some() {
            warn!(interface = %self.interface_id, method, "method registered twice, keeping the last handler");
        }
    }
}

impl<State> DispatchTable<State> {
    /// The interface this table implements.
    #[inline]
    #[must_use]
    pub fn interface_id(&self) -> &str {
        &self.interface_id
    }

    /// Whether `method` is registered.
    #[must_use]
    pub fn contains(&self, method: &str) -> bool {
        self.methods.contains_key(method)
    }

    /// Whether `method` is registered as read-only.
    #[must_use]
    pub fn is_read_only(&self, method: &str) -> bool {
        matches!(self.methods.get(method), Some(MethodEntry::ReadOnly(_)))
    }

    /// Registered method names, sorted.
    #[must_use]
    pub fn methods(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub(crate) fn entry(&self, method: &str) -> Option<&MethodEntry<State>> {
        self.methods.get(method)
    }
}

impl<State> Debug for DispatchTable<State> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchTable")
            .field("interface_id", &self.interface_id)
            .field("methods", &self.methods())
            .finish()
    }
}
