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
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::common::ActiveError;
use crate::persistence::{DurableLog, PersistentCell};
use crate::state::{BackendKind, StateCell, StateDescriptor, Transactional};

/// Selects where a state value lives.
///
/// The same business logic can run over either backend: build its state through
/// [`StateBackend::cell`] and write handlers against [`BackedCell`].
#[derive(Debug, Clone)]
pub enum StateBackend {
    /// Volatile state.
    InMemory,
    /// State appended to the given log on every commit.
    Persistent(Arc<dyn DurableLog>),
}

impl StateBackend {
    /// Creates a cell for `entity_id` on this backend. In-memory cells ignore the id.
    pub fn cell<T>(&self, entity_id: impl Into<String>, initial: T) -> BackedCell<T>
    where
        T: Clone + Debug + Send + Serialize + DeserializeOwned + 'static,
    {
        match self {
            Self::InMemory => BackedCell::InMemory(StateCell::new(initial)),
            Self::Persistent(log) => {
                BackedCell::Persistent(PersistentCell::new(entity_id, initial, log.clone()))
            }
        }
    }

    /// The kind of backend this is.
    #[must_use]
    pub const fn kind(&self) -> BackendKind {
        match self {
            Self::InMemory => BackendKind::InMemory,
            Self::Persistent(_) => BackendKind::Persistent,
        }
    }
}

/// A state cell on either backend.
#[derive(Debug)]
pub enum BackedCell<T> {
    /// Volatile cell.
    InMemory(StateCell<T>),
    /// Log-backed cell.
    Persistent(PersistentCell<T>),
}

impl<T> BackedCell<T>
where
    T: Clone + Debug + Send + Serialize + DeserializeOwned + 'static,
{
    /// The working value.
    pub const fn read(&self) -> &T {
        match self {
            Self::InMemory(cell) => cell.read(),
            Self::Persistent(cell) => cell.read(),
        }
    }

    /// The last committed value.
    pub const fn committed(&self) -> &T {
        match self {
            Self::InMemory(cell) => cell.committed(),
            Self::Persistent(cell) => cell.committed(),
        }
    }

    /// Replaces the working value.
    ///
    /// # Errors
    ///
    /// [`ActiveError::NoActiveTransaction`] outside a transaction.
    pub fn write(&mut self, value: T) -> Result<(), ActiveError> {
        match self {
            Self::InMemory(cell) => cell.write(value),
            Self::Persistent(cell) => cell.write(value),
        }
    }

    /// Mutates the working value in place.
    ///
    /// # Errors
    ///
    /// [`ActiveError::NoActiveTransaction`] outside a transaction.
    pub fn update<R>(&mut self, f: impl FnOnce(&mut T) -> R) -> Result<R, ActiveError> {
        match self {
            Self::InMemory(cell) => cell.update(f),
            Self::Persistent(cell) => cell.update(f),
        }
    }

    fn inner(&self) -> &dyn Transactional {
        match self {
            Self::InMemory(cell) => cell,
            Self::Persistent(cell) => cell,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Transactional {
        match self {
            Self::InMemory(cell) => cell,
            Self::Persistent(cell) => cell,
        }
    }
}

impl<T> Transactional for BackedCell<T>
where
    T: Clone + Debug + Send + Serialize + DeserializeOwned + 'static,
{
    fn begin(&mut self) -> Result<(), ActiveError> {
        self.inner_mut().begin()
    }

    fn commit(&mut self) -> Result<(), ActiveError> {
        self.inner_mut().commit()
    }

    fn rollback(&mut self) {
        self.inner_mut().rollback();
    }

    fn compensate(&mut self) -> Result<(), ActiveError> {
        self.inner_mut().compensate()
    }

    fn recover(&mut self) -> Result<(), ActiveError> {
        self.inner_mut().recover()
    }

    fn version(&self) -> u64 {
        self.inner().version()
    }

    fn in_transaction(&self) -> bool {
        self.inner().in_transaction()
    }

    fn descriptor(&self) -> StateDescriptor {
        self.inner().descriptor()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
