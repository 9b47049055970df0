/*
 * Copyright 2025 by Block Harvester Contributors
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! The append-only record log.
//!
//! One [`BlockRecord`] per line, newline-delimited JSON. Appends are
//! incremental; earlier records are never rewritten. Reads skip lines that
//! do not parse (a truncated trailing line from a crash mid-append, or any
//! other corruption), so a damaged log stays usable.

use crate::types::{BlockNumber, BlockRecord};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("record log i/o failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("record serialization failure: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A sequential writer over the persisted sequence of block records.
pub struct RecordLog {
    path: PathBuf,
    file: File,
}

impl RecordLog {
    /// Open the log at `path` for appending, creating it if absent.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        // a crash mid-append can leave the final line unterminated; start a
        // fresh line so the next record does not glue onto it
        if file.metadata()?.len() > 0 && !ends_with_newline(&path)? {
            file.write_all(b"\n")?;
        }
        Ok(RecordLog { path, file })
    }

    /// The file the log writes to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize one record to a single JSON line and append it.
    pub fn append(&mut self, record: &BlockRecord) -> Result<(), StoreError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        self.file.write_all(line.as_bytes())?;
        self.file.flush()?;
        Ok(())
    }

    /// All parseable records, in file (append) order.
    ///
    /// Unreadable lines are logged and skipped, never fatal. A missing
    /// file reads as empty.
    pub fn read_all(&self) -> Result<Vec<BlockRecord>, StoreError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(error.into()),
        };
        let reader = BufReader::new(file);
        let mut records = Vec::new();
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<BlockRecord>(&line) {
                Ok(record) => records.push(record),
                Err(error) => {
                    warn!(line = lineno + 1, %error, "skipping unreadable record log line");
                }
            }
        }
        Ok(records)
    }

    /// The highest block number recorded in the log, if any.
    ///
    /// Read on startup to resume harvesting past already-captured blocks
    /// instead of restarting from genesis.
    pub fn last_height(&self) -> Result<Option<BlockNumber>, StoreError> {
        Ok(self
            .read_all()?
            .iter()
            .map(|record| record.block_number)
            .max())
    }
}

fn ends_with_newline(path: &Path) -> Result<bool, std::io::Error> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::End(-1))?;
    let mut byte = [0u8; 1];
    file.read_exact(&mut byte)?;
    Ok(byte[0] == b'\n')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BlockRecord;
    use std::fs;

    fn record(block_number: BlockNumber) -> BlockRecord {
        BlockRecord {
            block_number,
            block_hash: format!("0x{block_number:064x}"),
            extrinsics: Vec::new(),
        }
    }

    fn temp_log() -> (tempfile::TempDir, RecordLog) {
        let dir = tempfile::tempdir().unwrap();
        let log = RecordLog::open(dir.path().join("extrinsics.jsonl")).unwrap();
        (dir, log)
    }

    #[test]
    fn round_trips_records_in_append_order() {
        let (_dir, mut log) = temp_log();
        for height in [5, 3, 9] {
            log.append(&record(height)).unwrap();
        }

        let records = log.read_all().unwrap();
        assert_eq!(records.len(), 3);
        let heights: Vec<_> = records.iter().map(|r| r.block_number).collect();
        assert_eq!(heights, vec![5, 3, 9]);
    }

    #[test]
    fn missing_log_reads_as_empty_after_open() {
        let (_dir, log) = temp_log();
        assert!(log.read_all().unwrap().is_empty());
        assert_eq!(log.last_height().unwrap(), None);
    }

    #[test]
    fn skips_corrupt_lines_and_keeps_appending() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extrinsics.jsonl");
        fs::write(&path, "this is not json\n{\"truncated\": \n").unwrap();

        let mut log = RecordLog::open(&path).unwrap();
        assert!(log.read_all().unwrap().is_empty());

        log.append(&record(42)).unwrap();
        let records = log.read_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].block_number, 42);
    }

    #[test]
    fn corruption_does_not_lose_surrounding_records() {
        let (_dir, mut log) = temp_log();
        log.append(&record(1)).unwrap();
        log.append(&record(2)).unwrap();

        // simulate a crash mid-append
        let mut contents = fs::read_to_string(log.path()).unwrap();
        contents.push_str("{\"blockNumber\": 3, \"blockHa");
        fs::write(log.path(), contents).unwrap();

        let mut log = RecordLog::open(log.path().to_path_buf()).unwrap();
        assert_eq!(log.read_all().unwrap().len(), 2);

        log.append(&record(4)).unwrap();
        let heights: Vec<_> = log
            .read_all()
            .unwrap()
            .iter()
            .map(|r| r.block_number)
            .collect();
        assert_eq!(heights, vec![1, 2, 4]);
    }

    #[test]
    fn last_height_is_the_maximum_recorded() {
        let (_dir, mut log) = temp_log();
        for height in [10, 25, 17] {
            log.append(&record(height)).unwrap();
        }
        assert_eq!(log.last_height().unwrap(), Some(25));
    }
}
