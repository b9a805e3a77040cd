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

use std::any::Any;
use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::common::ActiveError;

/// The transaction protocol every piece of actor state speaks.
///
/// The dispatcher opens a transaction before a mutating method runs, commits it when
/// the method returns successfully and rolls it back otherwise. Implementations are
/// owned by exactly one actor task and are never shared, so none of these methods
/// take locks.
///
/// The trait is object safe; [`NestedState`](crate::state::NestedState) stores its
/// children as `Box<dyn Transactional>`.
pub trait Transactional: Debug + Send + 'static {
    /// Opens a transaction.
    ///
    /// # Errors
    ///
    /// [`ActiveError::AlreadyInTransaction`] if one is already open.
    fn begin(&mut self) -> Result<(), ActiveError>;

    /// Makes the writes of the open transaction the new committed value.
    ///
    /// # Errors
    ///
    /// [`ActiveError::NoActiveTransaction`] if none is open, or a backend failure. On a
    /// backend failure the committed value and version are left as they were.
    fn commit(&mut self) -> Result<(), ActiveError>;

    /// Discards the writes of the open transaction. Never fails.
    fn rollback(&mut self);

    /// Undoes the most recent successful commit.
    ///
    /// Used by a nested composer when a later sibling fails to commit.
    ///
    /// # Errors
    ///
    /// A backend failure while recording the compensation.
    fn compensate(&mut self) -> Result<(), ActiveError>;

    /// Rebuilds the committed value from durable storage. Volatile state has nothing to do.
    ///
    /// # Errors
    ///
    /// [`ActiveError::PersistenceFailure`] if the backing log cannot be replayed.
    fn recover(&mut self) -> Result<(), ActiveError> {
        Ok(())
    }

    /// Number of successful commits, net of compensations.
    fn version(&self) -> u64;

    /// Whether a transaction is currently open.
    fn in_transaction(&self) -> bool;

    /// Describes the backend and shape of this state.
    fn descriptor(&self) -> StateDescriptor;

    /// Upcast used to resolve typed keys into nested children.
    fn as_any(&self) -> &dyn Any;

    /// Mutable counterpart of [`Transactional::as_any`].
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// The storage backend a piece of state uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    /// Volatile, lost when the actor stops.
    InMemory,
    /// Every commit is appended to a durable log before it is acknowledged.
    Persistent,
    /// A composer whose children carry their own backends.
    Nested,
}

/// A description of a state tree, recorded by the configurator for each binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDescriptor {
    /// Backend of this node.
    pub backend: BackendKind,
    /// Durable entity id, for persistent state.
    pub entity_id: Option<String>,
    /// Rust type name of the value held.
    pub value_type: String,
    /// Child descriptors, in registration order, for nested state.
    pub children: Vec<StateDescriptor>,
}

impl StateDescriptor {
    /// A descriptor for a leaf with no children.
    #[must_use]
    pub fn leaf(backend: BackendKind, entity_id: Option<String>, value_type: &str) -> Self {
        Self {
            backend,
            entity_id,
            value_type: value_type.to_string(),
            children: Vec::new(),
        }
    }

    /// Every persistent entity id in this tree, depth first.
    #[must_use]
    pub fn entity_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.entity_id.as_deref().into_iter().collect();
        for child in &self.children {
            ids.extend(child.entity_ids());
        }
        ids
    }
}
