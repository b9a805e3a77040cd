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

use dashmap::DashMap;
use tracing::trace;

use crate::persistence::log::check_next_version;
use crate::persistence::{DurableLog, LogEntry, LogError};

/// A [`DurableLog`] kept in process memory.
///
/// Survives actor restarts within one process, which is enough for tests and for
/// state that only needs to outlive an actor.
#[derive(Debug, Default)]
pub struct InMemoryLog {
    entries: DashMap<String, Vec<LogEntry>>,
}

impl InMemoryLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries recorded for `entity_id`.
    #[must_use]
    pub fn entry_count(&self, entity_id: &str) -> usize {
        self.entries.get(entity_id).map_or(0, |log| log.len())
    }

    /// Ids of every entity with at least one entry, sorted.
    #[must_use]
    pub fn entities(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.iter().map(|log| log.key().clone()).collect();
        ids.sort();
        ids
    }
}

impl DurableLog for InMemoryLog {
    fn append(&self, entry: LogEntry) -> Result<(), LogError> {
        let mut log = self.entries.entry(entry.entity_id.clone()).or_default();
        let last = log.last().map_or(0, |last| last.version);
        check_next_version(&entry, last)?;
        trace!(entity = %entry.entity_id, version = entry.version, kind = ?entry.kind, "appended");
        log.push(entry);
        Ok(())
    }

    fn read_all(&self, entity_id: &str) -> Result<Vec<LogEntry>, LogError> {
        Ok(self
            .entries
            .get(entity_id)
            .map(|log| log.clone())
            .unwrap_or_default())
    }
}
