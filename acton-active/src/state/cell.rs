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

use tracing::trace;

use crate::common::ActiveError;
use crate::state::{BackendKind, StateDescriptor, Transactional};

/// A versioned value with begin/commit/rollback semantics.
///
/// Outside a transaction `current` always equals `committed`. Inside one, writes go to
/// `current` until the transaction is committed or rolled back. The previously committed
/// value is kept so that the last commit can be compensated.
///
/// # Example
///
/// ```rust
/// use acton_active::prelude::*;
///
/// let mut cell = StateCell::new(0_i64);
/// cell.begin().unwrap();
/// cell.write(5).unwrap();
/// cell.commit().unwrap();
/// assert_eq!(*cell.read(), 5);
/// assert_eq!(cell.version(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct StateCell<T> {
    current: T,
    committed: T,
    previous: Option<T>,
    version: u64,
    in_transaction: bool,
}

impl<T: Clone + Debug + Send + 'static> StateCell<T> {
    /// Creates a cell holding `initial` at version 0.
    pub fn new(initial: T) -> Self {
        Self {
            current: initial.clone(),
            committed: initial,
            previous: None,
            version: 0,
            in_transaction: false,
        }
    }

    /// The working value: the transaction's writes if one is open, else the committed value.
    #[inline]
    pub const fn read(&self) -> &T {
        &self.current
    }

    /// The last committed value, ignoring any open transaction.
    #[inline]
    pub const fn committed(&self) -> &T {
        &self.committed
    }

    /// Replaces the working value.
    ///
    /// # Errors
    ///
    /// [`ActiveError::NoActiveTransaction`] outside a transaction.
    pub fn write(&mut self, value: T) -> Result<(), ActiveError> {
        if !self.in_transaction {
            return Err(ActiveError::NoActiveTransaction);
        }
        self.current = value;
        Ok(())
    }

    /// Mutates the working value in place and returns whatever `f` returns.
    ///
    /// # Errors
    ///
    /// [`ActiveError::NoActiveTransaction`] outside a transaction.
    pub fn update<R>(&mut self, f: impl FnOnce(&mut T) -> R) -> Result<R, ActiveError> {
        if !self.in_transaction {
            return Err(ActiveError::NoActiveTransaction);
        }
        Ok(f(&mut self.current))
    }

    /// Reverts the last commit: the previous committed value comes back and the version
    /// drops by one. Returns `false` if there is no commit to revert.
    pub(crate) fn revert_commit(&mut self) -> bool {
        match self.previous.take() {
            Some(previous) => {
                self.committed = previous;
                self.current = self.committed.clone();
                self.version = self.version.saturating_sub(1);
                self.in_transaction = false;
                true
            }
            None => false,
        }
    }

    /// Replaces the committed value wholesale, as recovery does.
    pub(crate) fn restore(&mut self, value: T, version: u64) {
        self.current = value.clone();
        self.committed = value;
        self.previous = None;
        self.version = version;
        self.in_transaction = false;
    }
}

impl<T: Clone + Debug + Send + 'static> Transactional for StateCell<T> {
    fn begin(&mut self) -> Result<(), ActiveError> {
        if self.in_transaction {
            return Err(ActiveError::AlreadyInTransaction);
        }
        self.current = self.committed.clone();
        self.in_transaction = true;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), ActiveError> {
        if !self.in_transaction {
            return Err(ActiveError::NoActiveTransaction);
        }
        let previous = std::mem::replace(&mut self.committed, self.current.clone());
        self.previous = Some(previous);
        self.version += 1;
        self.in_transaction = false;
        trace!(version = self.version, "state cell committed");
        Ok(())
    }

    fn rollback(&mut self) {
        self.current = self.committed.clone();
        self.in_transaction = false;
    }

    fn compensate(&mut self) -> Result<(), ActiveError> {
        if !self.revert_commit() {
            trace!("nothing to compensate");
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
        StateDescriptor::leaf(BackendKind::InMemory, None, std::any::type_name::<T>())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl<T: Clone + Debug + Send + Default + 'static> Default for StateCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_twice_fails() {
        let mut cell = StateCell::new(1_u32);
        cell.begin().unwrap();
        assert_eq!(cell.begin(), Err(ActiveError::AlreadyInTransaction));
    }

    #[test]
    fn write_and_commit_require_a_transaction() {
        let mut cell = StateCell::new(1_u32);
        assert_eq!(cell.write(2), Err(ActiveError::NoActiveTransaction));
        assert_eq!(cell.commit(), Err(ActiveError::NoActiveTransaction));
        assert_eq!(*cell.read(), 1);
        assert_eq!(cell.version(), 0);
    }

    #[test]
    fn rollback_restores_committed_value() {
        let mut cell = StateCell::new(String::from("a"));
        cell.begin().unwrap();
        cell.write("b".to_string()).unwrap();
        cell.write("c".to_string()).unwrap();
        assert_eq!(cell.read(), "c");
        assert_eq!(cell.committed(), "a");

        cell.rollback();
        assert_eq!(cell.read(), "a");
        assert_eq!(cell.version(), 0);
        assert!(!cell.in_transaction());
    }

    #[test]
    fn rollback_outside_a_transaction_is_harmless() {
        let mut cell = StateCell::new(3_i32);
        cell.rollback();
        assert_eq!(*cell.read(), 3);
    }

    #[test]
    fn each_commit_bumps_version_once() {
        let mut cell = StateCell::new(0_i64);
        for n in 1..=4 {
            cell.begin().unwrap();
            cell.update(|v| *v += 10).unwrap();
            cell.commit().unwrap();
            assert_eq!(cell.version(), n);
            assert_eq!(*cell.read(), 10 * n as i64);
        }
    }

    #[test]
    fn compensation_reverts_exactly_one_commit() {
        let mut cell = StateCell::new(0_i64);
        for value in [1, 2] {
            cell.begin().unwrap();
            cell.write(value).unwrap();
            cell.commit().unwrap();
        }
        cell.compensate().unwrap();
        assert_eq!(*cell.committed(), 1);
        assert_eq!(cell.version(), 1);

        // a second compensation has no history left
        cell.compensate().unwrap();
        assert_eq!(*cell.committed(), 1);
        assert_eq!(cell.version(), 1);
    }
}
