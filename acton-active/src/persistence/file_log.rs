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
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, error, trace};

use crate::persistence::log::check_next_version;
use crate::persistence::{DurableLog, LogEntry, LogError};

/// A [`DurableLog`] storing one JSON-lines file per entity under a directory.
///
/// Every append is flushed with `sync_data` before it returns. The last version of
/// each entity is cached after the first access so appends do not rescan the file.
#[derive(Debug)]
pub struct FileLog {
    directory: PathBuf,
    last_versions: Mutex<HashMap<String, u64>>,
}

impl FileLog {
    /// Opens (creating if needed) a log rooted at `directory`.
    ///
    /// # Errors
    ///
    /// [`LogError::Io`] if the directory cannot be created.
    pub fn open(directory: impl Into<PathBuf>) -> Result<Self, LogError> {
        let directory = directory.into();
        fs::create_dir_all(&directory)?;
        debug!(directory = %directory.display(), "opened file log");
        Ok(Self {
            directory,
            last_versions: Mutex::new(HashMap::new()),
        })
    }

    /// Directory holding the entity files.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn path_for(&self, entity_id: &str) -> PathBuf {
        let file_name: String = entity_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.directory.join(format!("{file_name}.jsonl"))
    }

    fn read_file(&self, entity_id: &str) -> Result<Vec<LogEntry>, LogError> {
        let path = self.path_for(entity_id);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut entries = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: LogEntry = serde_json::from_str(&line).map_err(|err| LogError::Corrupt {
                entity_id: entity_id.to_string(),
                line: index + 1,
                reason: err.to_string(),
            })?;
            entries.push(entry);
        }
        Ok(entries)
    }
}

impl DurableLog for FileLog {
    fn append(&self, entry: LogEntry) -> Result<(), LogError> {
        let mut last_versions = self.last_versions.lock();
        let last = match last_versions.get(&entry.entity_id) {
            Some(last) => *last,
            None => self
                .read_file(&entry.entity_id)?
                .last()
                .map_or(0, |last| last.version),
        };
        check_next_version(&entry, last)?;

        let mut line = serde_json::to_string(&entry).map_err(|err| LogError::Io(err.to_string()))?;
        line.push('\n');
        let path = self.path_for(&entry.entity_id);
        let write = || -> std::io::Result<()> {
            let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
            file.write_all(line.as_bytes())?;
            file.sync_data()
        };
        if let Err(err) = write() {
            error!(path = %path.display(), "failed to append log entry: {err}");
            // the line may have landed; rescan the file on the next append
            last_versions.remove(&entry.entity_id);
            return Err(err.into());
        }

        trace!(entity = %entry.entity_id, version = entry.version, "appended to file log");
        last_versions.insert(entry.entity_id, entry.version);
        Ok(())
    }

    fn read_all(&self, entity_id: &str) -> Result<Vec<LogEntry>, LogError> {
        self.read_file(entity_id)
    }
}
