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
use tracing::{debug, error, instrument, trace};

use crate::common::ActiveError;
use crate::persistence::{DurableLog, EntryKind, LogEntry, LogError};
use crate::state::{BackendKind, StateCell, StateDescriptor, Transactional};

/// A [`StateCell`] whose commits are appended to a [`DurableLog`].
///
/// A commit is acknowledged only after its log entry is durable. If the append fails,
/// the cell goes back to its prior committed value and version and the commit fails
/// with [`ActiveError::PersistenceFailure`].
///
/// The cell's `version` counts commits net of compensations; the log sequence
/// ([`PersistentCell::sequence`]) counts every entry ever appended.
#[derive(Debug)]
pub struct PersistentCell<T> {
    cell: StateCell<T>,
    initial: T,
    entity_id: String,
    sequence: u64,
    log: Arc<dyn DurableLog>,
}

impl<T> PersistentCell<T>
where
    T: Clone + Debug + Send + Serialize + DeserializeOwned + 'static,
{
    /// Creates a cell for `entity_id` starting from `initial`.
    ///
    /// Nothing is read from the log until [`Transactional::recover`] runs, which the
    /// actor does before it processes its first message.
    pub fn new(entity_id: impl Into<String>, initial: T, log: Arc<dyn DurableLog>) -> Self {
        Self {
            cell: StateCell::new(initial.clone()),
            initial,
            entity_id: entity_id.into(),
            sequence: 0,
            log,
        }
    }

    /// Creates a cell and immediately recovers it from the log.
    ///
    /// # Errors
    ///
    /// [`ActiveError::PersistenceFailure`] if the log cannot be replayed.
    pub fn recovered(
        entity_id: impl Into<String>,
        initial: T,
        log: Arc<dyn DurableLog>,
    ) -> Result<Self, ActiveError> {
        let mut cell = Self::new(entity_id, initial, log);
        cell.recover()?;
        Ok(cell)
    }

    /// See [`StateCell::read`].
    #[inline]
    pub const fn read(&self) -> &T {
        self.cell.read()
    }

    /// See [`StateCell::committed`].
    #[inline]
    pub const fn committed(&self) -> &T {
        self.cell.committed()
    }

    /// See [`StateCell::write`].
    ///
    /// # Errors
    ///
    /// [`ActiveError::NoActiveTransaction`] outside a transaction.
    pub fn write(&mut self, value: T) -> Result<(), ActiveError> {
        self.cell.write(value)
    }

    /// See [`StateCell::update`].
    ///
    /// # Errors
    ///
    /// [`ActiveError::NoActiveTransaction`] outside a transaction.
    pub fn update<R>(&mut self, f: impl FnOnce(&mut T) -> R) -> Result<R, ActiveError> {
        self.cell.update(f)
    }

    /// Durable entity id.
    #[must_use]
    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    /// Version of the last entry this cell appended or replayed.
    #[must_use]
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    fn persistence_failure(&self, err: &LogError) -> ActiveError {
        ActiveError::PersistenceFailure {
            entity_id: self.entity_id.clone(),
            reason: err.to_string(),
        }
    }
}

/// Folds an entity's log into the value and logical version it describes.
///
/// `Commit` entries set the value and add one to the version; `Compensation` entries set
/// the value and subtract one. Entries must be numbered `1..=n` without gaps. Replaying
/// the same entries always produces the same result.
///
/// # Errors
///
/// [`ActiveError::PersistenceFailure`] on a sequence gap, [`ActiveError::Serialization`]
/// if a payload does not decode into `T`.
pub fn replay<T: DeserializeOwned>(
    entity_id: &str,
    initial: T,
    entries: &[LogEntry],
) -> Result<(T, u64), ActiveError> {
    let mut value = initial;
    let mut version = 0_u64;
    for (expected, entry) in (1_u64..).zip(entries) {
        if entry.version != expected {
            return Err(ActiveError::PersistenceFailure {
                entity_id: entity_id.to_string(),
                reason: format!("log gap: expected entry {expected}, found {}", entry.version),
            });
        }
        value = serde_json::from_value(entry.payload.clone())?;
        version = match entry.kind {
            EntryKind::Commit => version + 1,
            EntryKind::Compensation => version.saturating_sub(1),
        };
    }
    Ok((value, version))
}

impl<T> Transactional for PersistentCell<T>
where
    T: Clone + Debug + Send + Serialize + DeserializeOwned + 'static,
{
    fn begin(&mut self) -> Result<(), ActiveError> {
        self.cell.begin()
    }

    fn commit(&mut self) -> Result<(), ActiveError> {
        if !self.cell.in_transaction() {
            return Err(ActiveError::NoActiveTransaction);
        }
        let payload = match serde_json::to_value(self.cell.read()) {
            Ok(payload) => payload,
            Err(err) => {
                self.cell.rollback();
                return Err(err.into());
            }
        };
        self.cell.commit()?;

        let next = self.sequence + 1;
        if let Err(err) = self.log.append(LogEntry::commit(&self.entity_id, next, payload)) {
            error!(entity = %self.entity_id, "append failed, reverting commit: {err}");
            self.cell.revert_commit();
            return Err(self.persistence_failure(&err));
        }
        self.sequence = next;
        trace!(entity = %self.entity_id, sequence = next, "persistent commit");
        Ok(())
    }

    fn rollback(&mut self) {
        self.cell.rollback();
    }

    fn compensate(&mut self) -> Result<(), ActiveError> {
        if !self.cell.revert_commit() {
            trace!(entity = %self.entity_id, "nothing to compensate");
            return Ok(());
        }
        let payload = serde_json::to_value(self.cell.committed())?;
        let next = self.sequence + 1;
        if let Err(err) = self.log.append(LogEntry::compensation(&self.entity_id, next, payload)) {
            error!(entity = %self.entity_id, "failed to record compensation: {err}");
            return Err(self.persistence_failure(&err));
        }
        self.sequence = next;
        debug!(entity = %self.entity_id, sequence = next, "compensation recorded");
        Ok(())
    }

    #[instrument(skip(self), fields(entity = %self.entity_id))]
    fn recover(&mut self) -> Result<(), ActiveError> {
        let entries = self
            .log
            .read_all(&self.entity_id)
            .map_err(|err| self.persistence_failure(&err))?;
        let (value, version) = replay(&self.entity_id, self.initial.clone(), &entries)?;
        self.cell.restore(value, version);
        self.sequence = entries.len() as u64;
        debug!(entries = entries.len(), version, "recovered from log");
        Ok(())
    }

    fn version(&self) -> u64 {
        self.cell.version()
    }

    fn in_transaction(&self) -> bool {
        self.cell.in_transaction()
    }

    fn descriptor(&self) -> StateDescriptor {
        StateDescriptor::leaf(
            BackendKind::Persistent,
            Some(self.entity_id.clone()),
            std::any::type_name::<T>(),
        )
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
    use serde_json::json;

    use super::*;
    use crate::persistence::InMemoryLog;

    #[derive(Debug)]
    struct ClosedLog;

    impl DurableLog for ClosedLog {
        fn append(&self, _entry: LogEntry) -> Result<(), LogError> {
            Err(LogError::Unavailable("closed".to_string()))
        }
        fn read_all(&self, _entity_id: &str) -> Result<Vec<LogEntry>, LogError> {
            Ok(Vec::new())
        }
    }

    fn commit_value(cell: &mut PersistentCell<i64>, value: i64) -> Result<(), ActiveError> {
        cell.begin()?;
        cell.write(value)?;
        cell.commit()
    }

    #[test]
    fn commits_are_appended_in_sequence() {
        let log = Arc::new(InMemoryLog::new());
        let mut cell = PersistentCell::new("n", 0_i64, log.clone());
        commit_value(&mut cell, 4).unwrap();
        commit_value(&mut cell, 9).unwrap();

        let entries = log.read_all("n").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].payload, json!(9));
        assert_eq!(cell.sequence(), 2);
        assert_eq!(cell.version(), 2);
    }

    #[test]
    fn failed_append_restores_prior_commit() {
        let mut cell = PersistentCell::new("n", 1_i64, Arc::new(ClosedLog));
        let err = commit_value(&mut cell, 2).unwrap_err();

        assert!(matches!(err, ActiveError::PersistenceFailure { .. }));
        assert_eq!(*cell.committed(), 1);
        assert_eq!(*cell.read(), 1);
        assert_eq!(cell.version(), 0);
        assert!(!cell.in_transaction());
    }

    #[test]
    fn recovery_replays_any_number_of_commits() {
        for commits in 0..6_i64 {
            let log: Arc<dyn DurableLog> = Arc::new(InMemoryLog::new());
            let mut cell = PersistentCell::new("r", 0_i64, log.clone());
            for n in 1..=commits {
                commit_value(&mut cell, n * 3).unwrap();
            }

            let recovered = PersistentCell::recovered("r", 0_i64, log).unwrap();
            assert_eq!(*recovered.read(), commits * 3);
            assert_eq!(recovered.version(), commits as u64);
        }
    }

    #[test]
    fn compensation_is_logged_and_replayed() {
        let log: Arc<dyn DurableLog> = Arc::new(InMemoryLog::new());
        let mut cell = PersistentCell::new("c", 0_i64, log.clone());
        commit_value(&mut cell, 1).unwrap();
        commit_value(&mut cell, 2).unwrap();
        cell.compensate().unwrap();

        assert_eq!(*cell.committed(), 1);
        assert_eq!(cell.version(), 1);
        assert_eq!(cell.sequence(), 3);

        let recovered = PersistentCell::recovered("c", 0_i64, log.clone()).unwrap();
        assert_eq!(*recovered.read(), 1);
        assert_eq!(recovered.version(), 1);
        assert_eq!(recovered.sequence(), 3);

        let entries = log.read_all("c").unwrap();
        assert_eq!(
            replay("c", 0_i64, &entries).unwrap(),
            replay("c", 0_i64, &entries).unwrap()
        );
    }

    #[test]
    fn replay_rejects_gaps() {
        let entries = vec![LogEntry::commit("g", 1, json!(1)), LogEntry::commit("g", 3, json!(3))];
        assert!(matches!(
            replay("g", 0_i64, &entries),
            Err(ActiveError::PersistenceFailure { .. })
        ));
    }
}
