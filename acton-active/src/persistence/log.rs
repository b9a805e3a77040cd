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

//! The append-only durable log contract consumed by persistent state.

use std::fmt::Debug;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Whether an entry records a commit or the compensation of one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// The payload is the newly committed value.
    Commit,
    /// The payload is the value restored by undoing the previous commit.
    Compensation,
}

/// One immutable record in an entity's log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Entity this entry belongs to.
    pub entity_id: String,
    /// Position in the entity's log, starting at 1 with no gaps.
    pub version: u64,
    /// JSON snapshot of the state value.
    pub payload: Value,
    /// When the entry was created.
    pub timestamp: DateTime<Utc>,
    /// Commit or compensation.
    pub kind: EntryKind,
}

impl LogEntry {
    /// A commit entry stamped with the current time.
    pub fn commit(entity_id: impl Into<String>, version: u64, payload: Value) -> Self {
        Self::with_kind(entity_id, version, payload, EntryKind::Commit)
    }

    /// A compensation entry stamped with the current time.
    pub fn compensation(entity_id: impl Into<String>, version: u64, payload: Value) -> Self {
        Self::with_kind(entity_id, version, payload, EntryKind::Compensation)
    }

    fn with_kind(entity_id: impl Into<String>, version: u64, payload: Value, kind: EntryKind) -> Self {
        Self {
            entity_id: entity_id.into(),
            version,
            payload,
            timestamp: Utc::now(),
            kind,
        }
    }
}

/// Failures reported by a [`DurableLog`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogError {
    /// The appended entry's version is not the next one in the entity's log.
    #[error("version conflict for '{entity_id}': expected {expected}, got {actual}")]
    VersionConflict {
        /// Entity being appended to.
        entity_id: String,
        /// The version the log would have accepted.
        expected: u64,
        /// The version that was offered.
        actual: u64,
    },
    /// The storage medium failed.
    #[error("log I/O failure: {0}")]
    Io(String),
    /// A stored entry could not be decoded.
    #[error("corrupt entry in log of '{entity_id}' at line {line}: {reason}")]
    Corrupt {
        /// Entity whose log is damaged.
        entity_id: String,
        /// One-based line of the damaged entry.
        line: usize,
        /// Decoder message.
        reason: String,
    },
    /// The log refuses service, for example because it was closed.
    #[error("log unavailable: {0}")]
    Unavailable(String),
}

impl From<std::io::Error> for LogError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// An append-only, per-entity log.
///
/// Entries for one entity must be appended with versions `1, 2, 3, ...`; anything else
/// is a [`LogError::VersionConflict`]. Reads may happen from any thread; appends for an
/// entity come only from the persistent cell that owns it.
pub trait DurableLog: Debug + Send + Sync + 'static {
    /// Appends `entry` to its entity's log. The entry is durable once this returns `Ok`.
    ///
    /// # Errors
    ///
    /// [`LogError::VersionConflict`] on a gap or duplicate, or a storage failure.
    fn append(&self, entry: LogEntry) -> Result<(), LogError>;

    /// Every entry of `entity_id`, ordered by version. Unknown entities have empty logs.
    ///
    /// # Errors
    ///
    /// A storage failure or a corrupt entry.
    fn read_all(&self, entity_id: &str) -> Result<Vec<LogEntry>, LogError>;

    /// Highest version recorded for `entity_id`, or 0 for an empty log.
    ///
    /// # Errors
    ///
    /// Whatever [`DurableLog::read_all`] reports.
    fn last_version(&self, entity_id: &str) -> Result<u64, LogError> {
        Ok(self
            .read_all(entity_id)?
            .last()
            .map_or(0, |entry| entry.version))
    }
}

pub(crate) fn check_next_version(entry: &LogEntry, last: u64) -> Result<(), LogError> {
    let expected = last + 1;
    if entry.version == expected {
        Ok(())
    } else {
        Err(LogError::VersionConflict {
            entity_id: entry.entity_id.clone(),
            expected,
            actual: entry.version,
        })
    }
}
