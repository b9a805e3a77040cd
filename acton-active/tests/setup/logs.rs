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
use std::collections::HashSet;
use std::sync::Arc;

use acton_active::prelude::*;
use parking_lot::Mutex;

/// An in-memory log that refuses appends for chosen entities.
#[derive(Debug, Default)]
pub struct FailingLog {
    inner: InMemoryLog,
    refused: Mutex<HashSet<String>>,
}

impl FailingLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every further append for `entity_id` fails until [`FailingLog::heal`] is called.
    pub fn refuse(&self, entity_id: &str) {
        self.refused.lock().insert(entity_id.to_string());
    }

    pub fn heal(&self, entity_id: &str) {
        self.refused.lock().remove(entity_id);
    }

    pub fn entries(&self, entity_id: &str) -> Vec<LogEntry> {
        self.inner.read_all(entity_id).unwrap()
    }
}

impl DurableLog for FailingLog {
    fn append(&self, entry: LogEntry) -> Result<(), LogError> {
        if self.refused.lock().contains(&entry.entity_id) {
            return Err(LogError::Unavailable(format!("{} is refused", entry.entity_id)));
        }
        self.inner.append(entry)
    }

    fn read_all(&self, entity_id: &str) -> Result<Vec<LogEntry>, LogError> {
        self.inner.read_all(entity_id)
    }
}
