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
use std::fmt;
use std::fmt::Debug;
use std::marker::PhantomData;

use tracing::{debug, error, trace};

use crate::common::ActiveError;
use crate::state::{BackendKind, StateDescriptor, Transactional};

/// A typed handle to a child registered with a [`NestedState`].
///
/// Keys are plain indices; the type parameter lets [`NestedState::get`] hand back the
/// concrete child type without the caller downcasting.
pub struct StateKey<T> {
    index: usize,
    _child: PhantomData<fn() -> T>,
}

impl<T> StateKey<T> {
    /// Position of the child in registration order.
    #[inline]
    pub const fn index(&self) -> usize {
        self.index
    }
}

impl<T> Clone for StateKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for StateKey<T> {}

impl<T> Debug for StateKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StateKey").field(&self.index).finish()
    }
}

/// Composes several transactional states into one all-or-nothing unit.
///
/// Children are owned by the composer and may be any [`Transactional`] state, including
/// persistent cells and other composers. Backends may be mixed freely.
///
/// `commit` commits children in registration order. If a child fails after earlier ones
/// have committed, those earlier children are compensated in reverse order and the
/// commit fails with [`ActiveError::PartialCommitFailure`]; if the first child fails, its
/// own error is returned.
#[derive(Debug, Default)]
pub struct NestedState {
    children: Vec<Box<dyn Transactional>>,
    version: u64,
    in_transaction: bool,
}

impl NestedState {
    /// Creates an empty composer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a child and returns the key that addresses it.
    pub fn register<C: Transactional>(&mut self, child: C) -> StateKey<C> {
        let index = self.children.len();
        self.children.push(Box::new(child));
        StateKey {
            index,
            _child: PhantomData,
        }
    }

    /// Borrows the child addressed by `key`.
    ///
    /// # Errors
    ///
    /// [`ActiveError::InvalidStateKey`] if the key belongs to another composer.
    pub fn get<C: Transactional>(&self, key: StateKey<C>) -> Result<&C, ActiveError> {
        self.children
            .get(key.index)
            .and_then(|child| child.as_any().downcast_ref::<C>())
            .ok_or(ActiveError::InvalidStateKey(key.index))
    }

    /// Mutably borrows the child addressed by `key`.
    ///
    /// # Errors
    ///
    /// [`ActiveError::InvalidStateKey`] if the key belongs to another composer.
    pub fn get_mut<C: Transactional>(&mut self, key: StateKey<C>) -> Result<&mut C, ActiveError> {
        self.children
            .get_mut(key.index)
            .and_then(|child| child.as_any_mut().downcast_mut::<C>())
            .ok_or(ActiveError::InvalidStateKey(key.index))
    }

    /// Number of registered children.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Whether no children are registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    fn compensate_committed(&mut self, committed: usize) {
        for child in self.children[..committed].iter_mut().rev() {
            if let Err(err) = child.compensate() {
                error!(child = ?child.descriptor(), "failed to compensate nested child: {err}");
            }
        }
    }
}

impl Transactional for NestedState {
    fn begin(&mut self) -> Result<(), ActiveError> {
        if self.in_transaction {
            return Err(ActiveError::AlreadyInTransaction);
        }
        for index in 0..self.children.len() {
            if let Err(err) = self.children[index].begin() {
                debug!(index, "nested begin failed, rolling back begun children");
                for begun in &mut self.children[..index] {
                    begun.rollback();
                }
                return Err(err);
            }
        }
        self.in_transaction = true;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), ActiveError> {
        if !self.in_transaction {
            return Err(ActiveError::NoActiveTransaction);
        }
        let total = self.children.len();
        for index in 0..total {
            if let Err(cause) = self.children[index].commit() {
                for pending in &mut self.children[index..] {
                    pending.rollback();
                }
                self.in_transaction = false;
                if index == 0 {
                    return Err(cause);
                }
                debug!(committed = index, total, "nested commit failed, compensating");
                self.compensate_committed(index);
                return Err(ActiveError::PartialCommitFailure {
                    committed: index,
                    total,
                    cause: Box::new(cause),
                });
            }
        }
        self.version += 1;
        self.in_transaction = false;
        trace!(version = self.version, children = total, "nested state committed");
        Ok(())
    }

    fn rollback(&mut self) {
        for child in &mut self.children {
            child.rollback();
        }
        self.in_transaction = false;
    }

    fn compensate(&mut self) -> Result<(), ActiveError> {
        let mut first_failure = None;
        for child in self.children.iter_mut().rev() {
            if let Err(err) = child.compensate() {
                error!(child = ?child.descriptor(), "failed to compensate nested child: {err}");
                first_failure.get_or_insert(err);
            }
        }
        self.version = self.version.saturating_sub(1);
        first_failure.map_or(Ok(()), Err)
    }

    fn recover(&mut self) -> Result<(), ActiveError> {
        for child in &mut self.children {
            child.recover()?;
        }
        Ok(())
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    fn descriptor(&self) -> StateDescriptor {
        StateDescriptor {
            backend: BackendKind::Nested,
            entity_id: None,
            value_type: std::any::type_name::<Self>().to_string(),
            children: self.children.iter().map(|child| child.descriptor()).collect(),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateCell;

    /// A child whose commit can be told to fail.
    #[derive(Debug)]
    struct Refusing {
        cell: StateCell<i32>,
        refuse_commit: bool,
    }

    impl Transactional for Refusing {
        fn begin(&mut self) -> Result<(), ActiveError> {
            self.cell.begin()
        }
        fn commit(&mut self) -> Result<(), ActiveError> {
            if self.refuse_commit {
                self.cell.rollback();
                return Err(ActiveError::application("refused"));
            }
            self.cell.commit()
        }
        fn rollback(&mut self) {
            self.cell.rollback();
        }
        fn compensate(&mut self) -> Result<(), ActiveError> {
            self.cell.compensate()
        }
        fn version(&self) -> u64 {
            self.cell.version()
        }
        fn in_transaction(&self) -> bool {
            self.cell.in_transaction()
        }
        fn descriptor(&self) -> StateDescriptor {
            self.cell.descriptor()
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn keys_resolve_to_their_children() {
        let mut nested = NestedState::new();
        let name = nested.register(StateCell::new("n".to_string()));
        let count = nested.register(StateCell::new(7_u8));

        assert_eq!(nested.get(name).unwrap().read(), "n");
        assert_eq!(*nested.get(count).unwrap().read(), 7);
        assert_eq!(nested.len(), 2);
    }

    #[test]
    fn keys_from_another_composer_are_rejected() {
        let mut other = NestedState::new();
        let _ = other.register(StateCell::new(1_u8));
        let foreign = other.register(StateCell::new(1_u8));

        let mut nested = NestedState::new();
        nested.register(StateCell::new(String::new()));
        assert_eq!(nested.get(foreign).unwrap_err(), ActiveError::InvalidStateKey(1));
    }

    #[test]
    fn commit_is_all_or_nothing() {
        let mut nested = NestedState::new();
        let a = nested.register(StateCell::new(0_i32));
        let b = nested.register(StateCell::new(0_i32));
        let c = nested.register(Refusing {
            cell: StateCell::new(0),
            refuse_commit: true,
        });

        nested.begin().unwrap();
        nested.get_mut(a).unwrap().write(1).unwrap();
        nested.get_mut(b).unwrap().write(2).unwrap();
        nested.get_mut(c).unwrap().cell.write(3).unwrap();

        let err = nested.commit().unwrap_err();
        assert!(matches!(
            err,
            ActiveError::PartialCommitFailure {
                committed: 2,
                total: 3,
                ..
            }
        ));
        assert_eq!(*nested.get(a).unwrap().committed(), 0);
        assert_eq!(*nested.get(b).unwrap().committed(), 0);
        assert_eq!(*nested.get(c).unwrap().cell.committed(), 0);
        assert_eq!(nested.version(), 0);
        assert!(!nested.in_transaction());
    }

    #[test]
    fn first_child_failure_is_returned_unchanged() {
        let mut nested = NestedState::new();
        nested.register(Refusing {
            cell: StateCell::new(0),
            refuse_commit: true,
        });
        nested.register(StateCell::new(0_i32));

        nested.begin().unwrap();
        assert_eq!(nested.commit(), Err(ActiveError::application("refused")));
    }

    #[test]
    fn rollback_reaches_every_child() {
        let mut nested = NestedState::new();
        let a = nested.register(StateCell::new(5_i32));
        let inner_key = nested.register(NestedState::new());
        let deep = nested.get_mut(inner_key).unwrap().register(StateCell::new(9_i32));

        nested.begin().unwrap();
        nested.get_mut(a).unwrap().write(6).unwrap();
        nested
            .get_mut(inner_key)
            .unwrap()
            .get_mut(deep)
            .unwrap()
            .write(10)
            .unwrap();
        nested.rollback();

        assert_eq!(*nested.get(a).unwrap().read(), 5);
        let inner = nested.get(inner_key).unwrap();
        assert_eq!(*inner.get(deep).unwrap().read(), 9);
        assert!(!inner.in_transaction());
    }

    #[test]
    fn failing_begin_rolls_back_begun_children() {
        let mut nested = NestedState::new();
        let a = nested.register(StateCell::new(0_i32));
        let b = nested.register(StateCell::new(0_i32));
        nested.get_mut(b).unwrap().begin().unwrap();

        assert_eq!(nested.begin(), Err(ActiveError::AlreadyInTransaction));
        assert!(!nested.get(a).unwrap().in_transaction());
        assert!(!nested.in_transaction());
    }

    #[test]
    fn descriptor_lists_children_in_order() {
        let mut nested = NestedState::new();
        nested.register(StateCell::new(0_i32));
        nested.register(NestedState::new());

        let descriptor = nested.descriptor();
        assert_eq!(descriptor.backend, BackendKind::Nested);
        assert_eq!(descriptor.children[0].backend, BackendKind::InMemory);
        assert_eq!(descriptor.children[1].backend, BackendKind::Nested);
    }
}
